//! Exact cosine search over chunks held in process memory.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// A [`VectorStore`] that scores every stored chunk on each search.
///
/// Chunks keep their insertion order, and equal scores are returned in that
/// order, so for a folder indexed front to back ties resolve by file, then
/// page, then position on the page. Nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    entries: Vec<Entry>,
    by_id: HashMap<String, usize>,
}

#[derive(Debug)]
struct Entry {
    chunk: Chunk,
    norm: f32,
}

impl Collection {
    fn new(dimensions: usize) -> Self {
        Self { dimensions, entries: Vec::new(), by_id: HashMap::new() }
    }

    fn put(&mut self, chunk: Chunk) {
        let entry = Entry { norm: l2_norm(&chunk.embedding), chunk };
        match self.by_id.get(&entry.chunk.id) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.by_id.insert(entry.chunk.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity given both norms; zero when either vector is zero.
fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

fn no_such_collection(name: &str) -> RagError {
    RagError::Index(format!("no collection named '{name}'"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        match collections.get(name) {
            Some(existing) if existing.dimensions != dimensions => Err(RagError::Index(format!(
                "collection '{name}' already exists with {} dimensions, not {dimensions}",
                existing.dimensions
            ))),
            Some(_) => Ok(()),
            None => {
                collections.insert(name.to_string(), Collection::new(dimensions));
                Ok(())
            }
        }
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target = collections.get_mut(collection).ok_or_else(|| no_such_collection(collection))?;

        // Check the whole batch first so a bad chunk leaves the collection untouched.
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != target.dimensions) {
            return Err(RagError::Index(format!(
                "chunk '{}' has a {}-dimensional embedding; '{collection}' holds {}",
                bad.id,
                bad.embedding.len(),
                target.dimensions
            )));
        }

        for chunk in chunks {
            target.put(chunk.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let source = collections.get(collection).ok_or_else(|| no_such_collection(collection))?;
        if embedding.len() != source.dimensions {
            return Err(RagError::Index(format!(
                "query has {} dimensions; '{collection}' holds {}",
                embedding.len(),
                source.dimensions
            )));
        }

        let query_norm = l2_norm(embedding);
        let mut ranked: Vec<(usize, f32)> = source
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine(&e.chunk.embedding, e.norm, embedding, query_norm)))
            .collect();
        // Stable sort keeps insertion order among equal scores.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(i, score)| SearchResult { chunk: source.entries[i].chunk.clone(), score })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.entries.len())
            .ok_or_else(|| no_such_collection(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            embedding,
            metadata: HashMap::new(),
            document_id: "q3.pdf#0".to_string(),
        }
    }

    async fn store_with(dimensions: usize, chunks: &[Chunk]) -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store.create_collection("filings", dimensions).await.unwrap();
        store.upsert("filings", chunks).await.unwrap();
        store
    }

    #[test]
    fn zero_vectors_score_zero() {
        assert_eq!(cosine(&[0.0, 0.0], 0.0, &[1.0, 0.0], 1.0), 0.0);
        assert!((cosine(&[3.0, 4.0], 5.0, &[3.0, 4.0], 5.0) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn nearest_chunks_come_first() {
        let store = store_with(
            2,
            &[chunk("east", vec![1.0, 0.0]), chunk("north", vec![0.0, 1.0]), chunk("ne", vec![1.0, 1.0])],
        )
        .await;

        let results = store.search("filings", &[1.0, 0.1], 2).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "ne"]);
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let store = store_with(1, &[chunk("p2", vec![2.0]), chunk("p1", vec![1.0])]).await;
        let ids: Vec<_> =
            store.search("filings", &[1.0], 2).await.unwrap().into_iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
    }

    #[tokio::test]
    async fn reinserting_an_id_replaces_in_place() {
        let store = store_with(1, &[chunk("a", vec![1.0]), chunk("b", vec![1.0])]).await;
        store.upsert("filings", &[chunk("a", vec![-1.0])]).await.unwrap();
        assert_eq!(store.count("filings").await.unwrap(), 2);
        let top = store.search("filings", &[1.0], 1).await.unwrap();
        assert_eq!(top[0].chunk.id, "b");
    }

    #[tokio::test]
    async fn wrong_dimensions_are_rejected_whole() {
        let store = store_with(3, &[]).await;
        let batch = [chunk("ok", vec![1.0, 0.0, 0.0]), chunk("short", vec![1.0])];
        assert!(matches!(store.upsert("filings", &batch).await, Err(RagError::Index(_))));
        assert_eq!(store.count("filings").await.unwrap(), 0);
        assert!(store.search("filings", &[1.0], 1).await.is_err());
    }

    #[tokio::test]
    async fn recreating_with_other_dimensions_fails() {
        let store = store_with(3, &[]).await;
        assert!(store.create_collection("filings", 3).await.is_ok());
        assert!(store.create_collection("filings", 4).await.is_err());
    }

    #[tokio::test]
    async fn unknown_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("missing", &[1.0], 1).await.is_err());
        assert!(store.count("missing").await.is_err());
    }
}

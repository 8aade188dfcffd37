//! Cutting page text into overlapping chunks.
//!
//! [`FixedSizeChunker`] is the default character window.
//! [`RecursiveChunker`] prefers paragraph and line boundaries.

use std::collections::VecDeque;

use crate::document::{CHUNK_INDEX_KEY, Chunk, Document};

/// Turns one page into the chunks that get embedded.
pub trait Chunker: Send + Sync {
    /// Chunks of `document` in reading order, embeddings still empty.
    /// A page without text gives none.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Wrap raw chunk texts into [`Chunk`]s that inherit the document's metadata.
fn into_chunks(document: &Document, texts: Vec<String>) -> Vec<Chunk> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = document.metadata.clone();
            metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());
            Chunk {
                id: format!("{}_{i}", document.id),
                text,
                embedding: Vec::new(),
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

/// A window of `chunk_size` characters.
///
/// The window advances by `chunk_size - chunk_overlap` characters and stops at
/// the first chunk that reaches the end of the text, so a text of `L`
/// characters yields `ceil((L - overlap) / (size - overlap))` chunks, or a
/// single chunk when `L <= size`.
///
/// Chunk `i` of page `report.pdf#3` gets id `report.pdf#3_i` and the page's
/// metadata plus `chunk_index = i`.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// `chunk_overlap` characters of each chunk repeat at the start of the
    /// next one. An overlap of `chunk_size` or more is cut to
    /// `chunk_size - 1` so the window always advances.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let (chunk_size, chunk_overlap) = usable_window(chunk_size, chunk_overlap);
        Self { chunk_size, chunk_overlap }
    }
}

/// A usable window: at least one character wide, overlap strictly smaller.
fn usable_window(chunk_size: usize, chunk_overlap: usize) -> (usize, usize) {
    let chunk_size = chunk_size.max(1);
    (chunk_size, chunk_overlap.min(chunk_size - 1))
}

/// Character-window splitting over `text`. Offsets are char positions, so
/// multi-byte text is never cut inside a code point.
fn split_by_window(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    // Byte offset of every char boundary, including the end of the text.
    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = boundaries.len() - 1;
    let step = chunk_size.saturating_sub(chunk_overlap);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_count || step == 0 {
            break;
        }
        start += step;
    }

    chunks
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let texts = split_by_window(&document.text, self.chunk_size, self.chunk_overlap);
        into_chunks(document, texts)
    }
}

/// Splits on the coarsest boundary present: blank lines, then newlines, then
/// spaces, then single characters.
///
/// The first separator present in the text is used to split it. Pieces
/// shorter than `chunk_size` are merged back together (joined by that
/// separator) until the next piece would overflow; the following chunk then
/// starts with as many trailing pieces as fit in `chunk_overlap`. Pieces that
/// are still too long are split again with the next separator.
///
/// ```rust,ignore
/// let chunks = RecursiveChunker::new(1000, 200).chunk(&page);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Separators tried in order. The empty separator splits into characters.
    const SEPARATORS: [&'static str; 4] = ["\n\n", "\n", " ", ""];

    /// Same window rules as [`FixedSizeChunker::new`].
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let (chunk_size, chunk_overlap) = usable_window(chunk_size, chunk_overlap);
        Self { chunk_size, chunk_overlap }
    }

    fn split_text(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let Some(&separator) = separators.get(position) else {
            return split_by_window(text, self.chunk_size, self.chunk_overlap);
        };
        let remaining = &separators[position + 1..];

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.extend(split_by_window(piece, self.chunk_size, self.chunk_overlap));
            } else {
                chunks.extend(self.split_text(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }

        chunks
    }

    /// Merge small pieces into chunks no longer than `chunk_size`, keeping up
    /// to `chunk_overlap` characters of trailing pieces between chunks.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            let joined_len = |window: &VecDeque<&str>, total: usize| {
                total + len + if window.is_empty() { 0 } else { separator_len }
            };

            if joined_len(&window, total) > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window, separator);

                while total > self.chunk_overlap
                    || (joined_len(&window, total) > self.chunk_size && total > 0)
                {
                    let Some(front) = window.pop_front() else { break };
                    total -= char_len(front) + if window.is_empty() { 0 } else { separator_len };
                }
            }

            total = joined_len(&window, total);
            window.push_back(piece);
        }

        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() || self.chunk_size == 0 {
            return Vec::new();
        }

        let texts = self.split_text(&document.text, &Self::SEPARATORS);
        into_chunks(document, texts)
    }
}

//! PDF folder loading.
//!
//! [`PdfFolderLoader`] enumerates the `.pdf` files directly inside a folder
//! and turns every page into a [`Document`]. Text extraction sits behind the
//! [`PageExtractor`] trait; [`LopdfExtractor`] is the default.
//!
//! A file that cannot be parsed is logged and recorded in
//! [`LoadReport::failures`] without stopping the rest of the batch.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Extracts the text of each page of a document file.
pub trait PageExtractor: Send + Sync {
    /// Return one string per page, in page order.
    ///
    /// A page without extractable text yields an empty string, not an error.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// [`PageExtractor`] backed by the `lopdf` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl PageExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let pdf = lopdf::Document::load(path)
            .map_err(|e| RagError::Load { path: path.to_path_buf(), message: e.to_string() })?;

        let pages = pdf.get_pages();
        let mut texts = Vec::with_capacity(pages.len());
        for page_number in pages.keys() {
            let text = match pdf.extract_text(&[*page_number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), page = page_number, error = %e, "no text extracted from page");
                    String::new()
                }
            };
            texts.push(text);
        }
        Ok(texts)
    }
}

/// A file that was skipped during loading.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    /// The file that failed.
    pub path: PathBuf,
    /// Why it failed.
    pub message: String,
}

/// The outcome of loading a folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Page-level documents, in file order then page order.
    pub documents: Vec<Document>,
    /// Files that could not be read or parsed.
    pub failures: Vec<LoadFailure>,
}

/// Loads every PDF directly inside a folder as page-level documents.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::PdfFolderLoader;
///
/// let report = PdfFolderLoader::new().load("10k_pdf")?;
/// println!("{} pages", report.documents.len());
/// ```
pub struct PdfFolderLoader {
    extractor: Box<dyn PageExtractor>,
}

impl Default for PdfFolderLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfFolderLoader {
    /// Create a loader using [`LopdfExtractor`].
    pub fn new() -> Self {
        Self::with_extractor(LopdfExtractor)
    }

    /// Create a loader with a custom page extractor.
    pub fn with_extractor(extractor: impl PageExtractor + 'static) -> Self {
        Self { extractor: Box::new(extractor) }
    }

    /// Load all PDFs in `folder`.
    ///
    /// A missing folder yields an empty report. Files are visited in sorted
    /// path order; subdirectories are not entered.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Load`] if `folder` exists but is not a directory
    /// or cannot be listed.
    pub fn load(&self, folder: impl AsRef<Path>) -> Result<LoadReport> {
        let folder = folder.as_ref();
        let files = discover_pdf_files(folder)?;

        let mut report = LoadReport::default();
        for path in files {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            info!(file = %name, "parsing PDF");

            match self.extractor.extract_pages(&path) {
                Ok(pages) => {
                    let source = path.to_string_lossy().into_owned();
                    report.documents.extend(
                        pages.into_iter().enumerate().map(|(page, text)| Document::page(&source, page, text)),
                    );
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping unreadable PDF");
                    report.failures.push(LoadFailure { path, message: e.to_string() });
                }
            }
        }

        info!(
            documents = report.documents.len(),
            failed_files = report.failures.len(),
            "total documents loaded"
        );
        Ok(report)
    }
}

/// List the `.pdf` files (extension matched case-insensitively) directly
/// inside `folder`, sorted by path.
pub fn discover_pdf_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        warn!(folder = %folder.display(), "PDF folder does not exist");
        return Ok(Vec::new());
    }
    if !folder.is_dir() {
        return Err(RagError::Load {
            path: folder.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let entries = std::fs::read_dir(folder)
        .map_err(|e| RagError::Load { path: folder.to_path_buf(), message: e.to_string() })?;

    let mut files = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf")))
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}

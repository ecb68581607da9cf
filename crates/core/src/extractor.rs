use crate::cleaner::{clean_bytes, clean_text};
use crate::error::IngestError;
use crate::models::PageMap;
use lopdf::Document;
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<PageMap, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<PageMap, IngestError> {
        // The parsed document owns no OS handle past `load`; it is dropped on every return path.
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = PageMap::new();
        for page_no in document.get_pages().into_keys() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(format!("page {page_no}: {error}")))?;

            pages.insert(page_no, clean_text(&text));
        }

        Ok(pages)
    }
}

/// Extension of `path`, lower-cased, if it is one the extractor accepts.
pub fn supported_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reads a whole text file as page 1, dropping bytes that are not valid UTF-8.
pub fn extract_plain_text(path: &Path) -> Result<PageMap, IngestError> {
    let bytes = std::fs::read(path)?;
    Ok(PageMap::from([(1, clean_bytes(&bytes))]))
}

pub fn extract_document(path: &Path) -> Result<PageMap, IngestError> {
    match supported_extension(path).as_deref() {
        Some("pdf") => LopdfExtractor.extract_pages(path),
        Some(_) => extract_plain_text(path),
        None => Err(IngestError::UnsupportedFile(path.display().to_string())),
    }
}

use crate::chunking::{chunk_pages, ChunkingConfig};
use crate::extractor::{extract_document, supported_extension};
use crate::models::{Chunk, DataLayout, IngestOutcome};
use crate::IngestError;
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const CHUNKS_SUFFIX: &str = "_chunks.json";

/// Recursively lists `.pdf` and `.txt` files under `folder`, sorted by path.
pub fn discover_input_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if entry.file_type().is_file() && supported_extension(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Document identity for an upload: the file name without its extension.
pub fn doc_id_from_path(path: &Path) -> Result<String, IngestError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

/// Copies `source` verbatim into `uploads_dir`, keeping its file name.
pub fn stage_upload(source: &Path, uploads_dir: &Path) -> Result<PathBuf, IngestError> {
    let name = source
        .file_name()
        .ok_or_else(|| IngestError::MissingFileName(source.display().to_string()))?;

    fs::create_dir_all(uploads_dir)?;
    let target = uploads_dir.join(name);

    let already_staged = match (fs::canonicalize(source), fs::canonicalize(&target)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    };
    if !already_staged {
        fs::copy(source, &target)?;
    }

    Ok(target)
}

/// Extracts, chunks and persists one document.
///
/// Writes `<doc_id>.json` (page map) and `<doc_id>_chunks.json` (chunk list) into
/// `layout.processed_dir`, replacing any earlier output for the same `doc_id`.
pub fn ingest_document(
    path: &Path,
    doc_id: &str,
    config: ChunkingConfig,
    layout: &DataLayout,
) -> Result<IngestOutcome, IngestError> {
    validate_doc_id(doc_id)?;

    let checksum = digest_file(path)?;
    let pages = extract_document(path)?;
    let chunks = chunk_pages(doc_id, &pages, config);

    fs::create_dir_all(&layout.processed_dir)?;
    fs::write(layout.pages_file(doc_id), serde_json::to_string_pretty(&pages)?)?;
    fs::write(layout.chunks_file(doc_id), serde_json::to_string_pretty(&chunks)?)?;

    info!(
        doc_id = %doc_id,
        pages = pages.len(),
        chunks = chunks.len(),
        "document processed"
    );

    Ok(IngestOutcome {
        doc_id: doc_id.to_string(),
        source_path: path.to_path_buf(),
        checksum,
        page_count: pages.len(),
        chunks,
        processed_at: Utc::now(),
    })
}

fn validate_doc_id(doc_id: &str) -> Result<(), IngestError> {
    if doc_id.trim().is_empty() {
        return Err(IngestError::InvalidArgument("doc_id is empty".to_string()));
    }

    if doc_id.contains(&['/', '\\'][..]) || doc_id == "." || doc_id == ".." {
        return Err(IngestError::InvalidArgument(format!(
            "doc_id is not a plain file name: {doc_id}"
        )));
    }

    Ok(())
}

/// Reads every `*_chunks.json` in `processed_dir`, keyed by `doc_id`.
///
/// Files matching the suffix that do not hold a JSON array (a page file for a
/// document whose own id ends in `_chunks`) are skipped.
pub fn load_chunk_files(processed_dir: &Path) -> Result<BTreeMap<String, Vec<Chunk>>, IngestError> {
    let mut documents = BTreeMap::new();

    if !processed_dir.is_dir() {
        return Ok(documents);
    }

    for entry in WalkDir::new(processed_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(doc_id) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_suffix(CHUNKS_SUFFIX))
        else {
            continue;
        };

        let value: Value = serde_json::from_str(&fs::read_to_string(entry.path())?)?;
        if !value.is_array() {
            warn!(path = %entry.path().display(), "not a chunk list, skipping");
            continue;
        }

        let chunks: Vec<Chunk> = serde_json::from_value(value)?;
        debug!(doc_id = %doc_id, chunks = chunks.len(), "loaded chunk file");
        documents.insert(doc_id.to_string(), chunks);
    }

    Ok(documents)
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub processed: Vec<IngestOutcome>,
    pub skipped_files: Vec<SkippedFile>,
}

impl IngestionReport {
    pub fn chunk_count(&self) -> usize {
        self.processed.iter().map(|outcome| outcome.chunks.len()).sum()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Cleaned text per 1-based page number. Iteration order is page order.
pub type PageMap = BTreeMap<u32, String>;

/// Excerpt summary per `doc_id`, ordered by `doc_id`.
pub type SummaryMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub doc_id: String,
    pub page: u32,
    pub text: String,
}

impl Chunk {
    pub fn citation(&self) -> String {
        citation(&self.doc_id, self.page)
    }
}

pub fn citation(doc_id: &str, page: u32) -> String {
    format!("{doc_id} p.{page}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub page: u32,
    pub citation: String,
}

impl From<&Chunk> for ChunkMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            doc_id: chunk.doc_id.clone(),
            page: chunk.page,
            citation: chunk.citation(),
        }
    }
}

/// Column-oriented payload for a single vector store upsert call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertBatch {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    pub embeddings: Vec<Vec<f32>>,
}

impl UpsertBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: Option<f32>,
}

impl SearchHit {
    /// First `max_chars` characters of the hit followed by an ellipsis.
    pub fn preview(&self, max_chars: usize) -> String {
        let head: String = self.text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

/// Tone preset for generated literature reviews.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DomainMode {
    #[default]
    Scientific,
    Business,
    Education,
}

impl DomainMode {
    pub fn system_instruction(self) -> &'static str {
        match self {
            DomainMode::Scientific => "You are a rigorous scientist. Use technical detail.",
            DomainMode::Business => "You are a market analyst. Highlight ROI & scalability.",
            DomainMode::Education => "You are a friendly educator. Explain simply.",
        }
    }
}

impl fmt::Display for DomainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DomainMode::Scientific => "scientific",
            DomainMode::Business => "business",
            DomainMode::Education => "education",
        };
        f.write_str(name)
    }
}

impl FromStr for DomainMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scientific" => Ok(DomainMode::Scientific),
            "business" => Ok(DomainMode::Business),
            "education" => Ok(DomainMode::Education),
            other => Err(format!(
                "unknown domain mode '{other}' (expected scientific, business or education)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionOptions {
    /// Target characters per chunk.
    pub chunk_size: usize,
    /// Characters repeated at the start of the next chunk.
    pub overlap: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

/// On-disk locations for uploads, processed JSON and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub uploads_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl DataLayout {
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let processed_dir = root.join("processed");
        Self {
            uploads_dir: root.join("uploads"),
            reports_dir: processed_dir.clone(),
            processed_dir,
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.uploads_dir)?;
        std::fs::create_dir_all(&self.processed_dir)?;
        std::fs::create_dir_all(&self.reports_dir)
    }

    pub fn pages_file(&self, doc_id: &str) -> PathBuf {
        self.processed_dir.join(format!("{doc_id}.json"))
    }

    pub fn chunks_file(&self, doc_id: &str) -> PathBuf {
        self.processed_dir.join(format!("{doc_id}_chunks.json"))
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::under("data")
    }
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub doc_id: String,
    pub source_path: PathBuf,
    pub checksum: String,
    pub page_count: usize,
    pub chunks: Vec<Chunk>,
    pub processed_at: DateTime<Utc>,
}

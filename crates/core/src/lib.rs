pub mod chunking;
pub mod cleaner;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod indexer;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod stores;
pub mod summary;
pub mod traits;

pub use chunking::{chunk_pages, ChunkingConfig};
pub use cleaner::{clean_bytes, clean_text};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingBackend, HttpEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
pub use error::{AssistantError, IngestError, ServiceError};
pub use extractor::{extract_document, supported_extension, LopdfExtractor, PdfExtractor};
pub use generation::{GeminiClient, DEFAULT_GEMINI_MODEL, GENERATION_UNAVAILABLE};
pub use indexer::{build_upsert_batch, index_chunks, record_id};
pub use ingest::{
    discover_input_files, doc_id_from_path, ingest_document, load_chunk_files, stage_upload,
    IngestionReport, SkippedFile,
};
pub use models::{
    citation, Chunk, ChunkMetadata, DataLayout, DomainMode, IngestOutcome, IngestionOptions,
    PageMap, SearchHit, SummaryMap, UpsertBatch,
};
pub use orchestrator::{ReportPaths, ResearchAssistant, DEFAULT_TOP_K, REVIEW_FILE};
pub use stores::{ChromaStore, DEFAULT_COLLECTION};
pub use summary::{excerpt_summary, keyword_frequencies, load_summaries};
pub use traits::{TextGenerator, VectorIndex};

pub mod chroma;

pub use chroma::{ChromaStore, DEFAULT_COLLECTION};

use crate::{SearchHit, ServiceError, UpsertBatch};
use async_trait::async_trait;

/// Nearest-neighbour store holding chunk vectors.
#[async_trait]
pub trait VectorIndex {
    /// Insert-or-replace every record of `batch` by id in one call.
    async fn upsert(&self, batch: &UpsertBatch) -> Result<(), ServiceError>;

    async fn query(&self, query_vector: &[f32], top_k: usize)
        -> Result<Vec<SearchHit>, ServiceError>;
}

/// Hosted language model turning a prompt into text.
#[async_trait]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

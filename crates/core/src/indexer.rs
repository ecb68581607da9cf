use crate::embeddings::Embedder;
use crate::models::{Chunk, ChunkMetadata, UpsertBatch};
use crate::traits::VectorIndex;
use crate::ServiceError;
use tracing::{info, warn};

/// Store id for the chunk at `position` within one indexing call.
pub fn record_id(doc_id: &str, position: usize) -> String {
    format!("{doc_id}__{position}")
}

pub fn build_upsert_batch(
    chunks: &[Chunk],
    embeddings: Vec<Vec<f32>>,
) -> Result<UpsertBatch, ServiceError> {
    if chunks.len() != embeddings.len() {
        return Err(ServiceError::Request(format!(
            "embedding count {} doesn't match chunk count {}",
            embeddings.len(),
            chunks.len()
        )));
    }

    Ok(UpsertBatch {
        ids: chunks
            .iter()
            .enumerate()
            .map(|(position, chunk)| record_id(&chunk.doc_id, position))
            .collect(),
        documents: chunks.iter().map(|chunk| chunk.text.clone()).collect(),
        metadatas: chunks.iter().map(ChunkMetadata::from).collect(),
        embeddings,
    })
}

/// Embeds `chunks` in one batch and upserts them in one store call.
///
/// Vectors left behind by an earlier, longer ingestion of the same `doc_id` are
/// not removed. Returns the number of records written.
pub async fn index_chunks<E, V>(
    embedder: &E,
    store: &V,
    chunks: &[Chunk],
) -> Result<usize, ServiceError>
where
    E: Embedder + Sync + ?Sized,
    V: VectorIndex + Sync + ?Sized,
{
    if chunks.is_empty() {
        warn!("no chunks to embed");
        return Ok(0);
    }

    let texts = chunks.iter().map(|chunk| chunk.text.as_str()).collect::<Vec<_>>();
    let embeddings = embedder.embed_batch(&texts).await?;
    let batch = build_upsert_batch(chunks, embeddings)?;

    store.upsert(&batch).await?;
    info!(count = batch.len(), "stored vectors");
    Ok(batch.len())
}

use crate::ingest::load_chunk_files;
use crate::models::{Chunk, SummaryMap};
use crate::IngestError;
use std::collections::HashMap;
use std::path::Path;

pub const EXCERPT_HEAD_CHARS: usize = 600;
pub const EXCERPT_TAIL_CHARS: usize = 200;

/// Head and tail of `full_text` joined by an ellipsis. Not a semantic summary.
///
/// Texts shorter than head plus tail repeat their overlap on both sides.
pub fn excerpt_summary(full_text: &str) -> String {
    let chars: Vec<char> = full_text.chars().collect();
    let head: String = chars.iter().take(EXCERPT_HEAD_CHARS).collect();
    let tail: String = chars[chars.len().saturating_sub(EXCERPT_TAIL_CHARS)..]
        .iter()
        .collect();
    format!("{head} ... {tail}")
}

pub fn summarize_chunks(chunks: &[Chunk]) -> String {
    let full_text = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    excerpt_summary(&full_text)
}

/// Excerpt summary for every persisted chunk file under `processed_dir`.
pub fn load_summaries(processed_dir: &Path) -> Result<SummaryMap, IngestError> {
    Ok(load_chunk_files(processed_dir)?
        .into_iter()
        .map(|(doc_id, chunks)| (doc_id, summarize_chunks(&chunks)))
        .collect())
}

/// Most common lower-cased words longer than four characters across all summaries.
///
/// Equal counts keep the order in which the words first appeared.
pub fn keyword_frequencies(summaries: &SummaryMap, limit: usize) -> Vec<(String, usize)> {
    let all_text = summaries
        .values()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for word in all_text.split_whitespace() {
        if word.chars().count() <= 4 {
            continue;
        }
        match positions.get(word) {
            Some(&position) => counts[position].1 += 1,
            None => {
                positions.insert(word, counts.len());
                counts.push((word.to_string(), 1));
            }
        }
    }

    counts.sort_by(|left, right| right.1.cmp(&left.1));
    counts.truncate(limit);
    counts
}

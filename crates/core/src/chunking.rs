use crate::error::IngestError;
use crate::models::{Chunk, IngestionOptions, PageMap};

/// Validated sliding-window parameters, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        if overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {overlap} must be smaller than chunk size {chunk_size}"
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Characters the window advances after each cut. Always at least one.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl TryFrom<IngestionOptions> for ChunkingConfig {
    type Error = IngestError;

    fn try_from(value: IngestionOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.overlap)
    }
}

/// Splits `pages` into overlapping windows of `config.chunk_size()` characters.
///
/// Pages are appended in ascending page order to one buffer, each prefixed by a
/// single space. Whenever the buffer reaches the chunk size its head is cut off
/// and attributed to the page being appended at that moment, so a window that
/// straddles a page break is credited to the later page. The remainder, if it
/// holds any non-whitespace, becomes a trimmed final chunk on the last page.
pub fn chunk_pages(doc_id: &str, pages: &PageMap, config: ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buffer: Vec<char> = Vec::new();
    // head of the unconsumed buffer; consumed chars are dropped once per page
    let mut start = 0;

    for (&page, text) in pages {
        buffer.drain(..start);
        start = 0;
        buffer.push(' ');
        buffer.extend(text.chars());

        while buffer.len() - start >= config.chunk_size {
            chunks.push(Chunk {
                doc_id: doc_id.to_string(),
                page,
                text: buffer[start..start + config.chunk_size].iter().collect(),
            });
            start += config.stride();
        }
    }

    let rest: String = buffer[start..].iter().collect();
    let rest = rest.trim();
    if !rest.is_empty() {
        if let Some(&last_page) = pages.keys().next_back() {
            chunks.push(Chunk {
                doc_id: doc_id.to_string(),
                page: last_page,
                text: rest.to_string(),
            });
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(entries: &[(u32, &str)]) -> PageMap {
        entries
            .iter()
            .map(|(page, text)| (*page, text.to_string()))
            .collect()
    }

    #[test]
    fn overlap_equal_to_chunk_size_is_rejected() {
        let result = ChunkingConfig::new(10, 10);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
        assert!(ChunkingConfig::new(10, 25).is_err());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            ChunkingConfig::new(0, 0),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn options_convert_into_config() {
        let config = ChunkingConfig::try_from(IngestionOptions::default()).unwrap();
        assert_eq!(config.chunk_size(), 500);
        assert_eq!(config.overlap(), 50);
        assert_eq!(config.stride(), 450);
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let config = ChunkingConfig::new(10, 2).unwrap();
        assert!(chunk_pages("doc", &PageMap::new(), config).is_empty());
        assert!(chunk_pages("doc", &pages(&[(1, ""), (2, "")]), config).is_empty());
    }

    #[test]
    fn short_page_is_cut_once_and_remainder_trimmed() {
        let config = ChunkingConfig::new(10, 2).unwrap();
        let chunks = chunk_pages("doc", &pages(&[(1, "AAAA BBBB CCCC")]), config);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, " AAAA BBBB");
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[1].text, "BB CCCC");
        assert_eq!(chunks[1].page, 1);
        assert!(chunks.iter().all(|chunk| chunk.doc_id == "doc"));
    }

    #[test]
    fn window_crossing_a_page_break_is_credited_to_later_page() {
        let config = ChunkingConfig::new(8, 2).unwrap();
        let chunks = chunk_pages("doc", &pages(&[(1, "abcde"), (2, "fghij")]), config);

        // buffer " abcde" stays under 8 until page 2 is appended
        assert_eq!(chunks[0].text, " abcde f");
        assert_eq!(chunks[0].page, 2);
        assert_eq!(chunks.last().map(|chunk| chunk.page), Some(2));
    }

    #[test]
    fn pages_are_consumed_in_numeric_order() {
        let config = ChunkingConfig::new(100, 10).unwrap();
        let mut map = PageMap::new();
        map.insert(10, "ten".to_string());
        map.insert(2, "two".to_string());

        let chunks = chunk_pages("doc", &map, config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "two ten");
        assert_eq!(chunks[0].page, 10);
    }

    #[test]
    fn chunks_reconstruct_the_buffer_after_removing_overlap() {
        let config = ChunkingConfig::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_pages("doc", &pages(&[(1, text)]), config);

        let mut rebuilt = chunks[0].text.clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.text.chars().skip(config.overlap()));
        }

        assert_eq!(rebuilt, format!(" {text}"));
        assert!(chunks[..chunks.len() - 1]
            .iter()
            .all(|chunk| chunk.text.chars().count() == 10));
    }

    #[test]
    fn multi_page_reconstruction_matches_joined_pages() {
        let config = ChunkingConfig::new(7, 2).unwrap();
        let map = pages(&[(1, "Lorem ipsum"), (2, "dolor sit"), (3, "amet.")]);
        let chunks = chunk_pages("doc", &map, config);

        let mut rebuilt = chunks[0].text.clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.text.chars().skip(config.overlap()));
        }

        assert_eq!(rebuilt, " Lorem ipsum dolor sit amet.");
    }

    #[test]
    fn multibyte_text_is_windowed_by_characters() {
        let config = ChunkingConfig::new(4, 1).unwrap();
        let chunks = chunk_pages("doc", &pages(&[(1, "ééééé")]), config);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, " ééé");
        assert_eq!(chunks[1].text, "ééé");
    }

    #[test]
    fn chunk_count_is_bounded_by_text_length_over_stride() {
        let config = ChunkingConfig::new(50, 45).unwrap();
        let text = "x".repeat(10_000);
        let chunks = chunk_pages("doc", &pages(&[(1, &text)]), config);

        let total = text.len() + 1;
        assert!(chunks.len() <= total / config.stride() + 1);
    }

    #[test]
    fn large_single_page_is_windowed_in_one_pass() {
        let config = ChunkingConfig::new(500, 50).unwrap();
        let text = "word ".repeat(200_000);
        let chunks = chunk_pages("doc", &pages(&[(1, &text)]), config);

        // 1_000_001 buffered chars: 2222 full windows plus a 101-char tail
        assert_eq!(chunks.len(), 2223);
        assert!(chunks[..2222]
            .iter()
            .all(|chunk| chunk.text.chars().count() == 500));

        let buffered: Vec<char> = format!(" {text}").chars().collect();
        let expected: String = buffered[1000 * 450..1000 * 450 + 500].iter().collect();
        assert_eq!(chunks[1000].text, expected);
        assert_eq!(chunks[2222].text, buffered[2222 * 450..].iter().collect::<String>().trim());
    }

    #[test]
    fn windows_carry_over_between_pages_after_compaction() {
        let config = ChunkingConfig::new(4, 1).unwrap();
        let chunks = chunk_pages("doc", &pages(&[(1, "abcdefg"), (2, "hij")]), config);

        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec![" abc", "cdef", "fg h", "hij"]);
        assert_eq!(chunks[2].page, 2);
    }
}

use crate::chunking::ChunkingConfig;
use crate::embeddings::Embedder;
use crate::generation::GENERATION_UNAVAILABLE;
use crate::indexer::index_chunks;
use crate::ingest::{
    doc_id_from_path, ingest_document, load_chunk_files, stage_upload, IngestionReport,
    SkippedFile,
};
use crate::prompts::{comparison_prompt, gaps_prompt, literature_review_prompt, HEALTH_CHECK_PROMPT};
use crate::summary::load_summaries;
use crate::traits::{TextGenerator, VectorIndex};
use crate::{
    AssistantError, DataLayout, DomainMode, IngestError, IngestOutcome, IngestionOptions,
    SearchHit, ServiceError, SummaryMap,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_TOP_K: usize = 3;
pub const COMPARE_REPORT_FILE: &str = "compare_report.md";
pub const GAPS_REPORT_FILE: &str = "gaps_report.md";
pub const REVIEW_FILE: &str = "literature_review.md";

/// Services and settings shared by every user action, built once at startup.
pub struct ResearchAssistant<E, V, G>
where
    E: Embedder,
    V: VectorIndex,
    G: TextGenerator,
{
    embedder: E,
    store: V,
    generator: Option<G>,
    layout: DataLayout,
    chunking: ChunkingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub comparison: PathBuf,
    pub gaps: PathBuf,
}

impl<E, V, G> ResearchAssistant<E, V, G>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
    G: TextGenerator + Send + Sync,
{
    /// Fails on invalid chunking options before any document is touched.
    pub fn new(
        embedder: E,
        store: V,
        generator: Option<G>,
        layout: DataLayout,
        options: IngestionOptions,
    ) -> Result<Self, IngestError> {
        let chunking = ChunkingConfig::try_from(options)?;
        if generator.is_none() {
            warn!("no generative model configured; comparison and review are unavailable");
        }

        Ok(Self {
            embedder,
            store,
            generator,
            layout,
            chunking,
        })
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Stages `source` into the uploads directory, processes it and indexes its chunks.
    pub async fn process_upload(&self, source: &Path) -> Result<IngestOutcome, AssistantError> {
        let outcome = self.ingest_upload(source)?;
        index_chunks(&self.embedder, &self.store, &outcome.chunks).await?;
        Ok(outcome)
    }

    fn ingest_upload(&self, source: &Path) -> Result<IngestOutcome, IngestError> {
        let staged = stage_upload(source, &self.layout.uploads_dir)?;
        let doc_id = doc_id_from_path(&staged)?;
        ingest_document(&staged, &doc_id, self.chunking, &self.layout)
    }

    /// Processes `sources` one after another.
    ///
    /// Files that cannot be read or parsed are reported as skipped; an embedding
    /// or store failure aborts the batch.
    pub async fn process_uploads<F>(
        &self,
        sources: &[PathBuf],
        mut on_progress: F,
    ) -> Result<IngestionReport, ServiceError>
    where
        F: FnMut(usize, usize),
    {
        let mut report = IngestionReport {
            processed: Vec::new(),
            skipped_files: Vec::new(),
        };

        for (index, source) in sources.iter().enumerate() {
            match self.ingest_upload(source) {
                Ok(outcome) => {
                    index_chunks(&self.embedder, &self.store, &outcome.chunks).await?;
                    report.processed.push(outcome);
                }
                Err(error) => report.skipped_files.push(SkippedFile {
                    path: source.clone(),
                    reason: error.to_string(),
                }),
            }
            on_progress(index + 1, sources.len());
        }

        Ok(report)
    }

    /// Re-embeds every persisted chunk file, one store call per document.
    pub async fn embed_all(&self) -> Result<usize, AssistantError> {
        let documents = load_chunk_files(&self.layout.processed_dir)?;
        if documents.is_empty() {
            warn!("no chunks to embed");
            return Ok(0);
        }

        let mut written = 0;
        for chunks in documents.values() {
            written += index_chunks(&self.embedder, &self.store, chunks).await?;
        }
        Ok(written)
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, ServiceError> {
        if query.trim().is_empty() {
            return Err(ServiceError::Request("query is empty".to_string()));
        }
        if top_k == 0 {
            return Err(ServiceError::Request("top_k must be at least 1".to_string()));
        }

        let mut vectors = self.embedder.embed_batch(&[query]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| ServiceError::Request("embedder returned no vector".to_string()))?;

        self.store.query(&query_vector, top_k).await
    }

    pub fn summaries(&self) -> Result<SummaryMap, IngestError> {
        load_summaries(&self.layout.processed_dir)
    }

    pub async fn compare_documents(&self, summaries: &SummaryMap) -> Result<String, ServiceError> {
        self.generate_or_unavailable(|| comparison_prompt(summaries))
            .await
    }

    pub async fn find_gaps(&self, summaries: &SummaryMap) -> Result<String, ServiceError> {
        self.generate_or_unavailable(|| gaps_prompt(summaries)).await
    }

    pub async fn draft_literature_review(
        &self,
        summaries: &SummaryMap,
        mode: DomainMode,
    ) -> Result<String, ServiceError> {
        self.generate_or_unavailable(|| literature_review_prompt(summaries, mode))
            .await
    }

    /// Sends the fixed greeting prompt to confirm the generative model answers.
    pub async fn check_generator(&self) -> Result<String, ServiceError> {
        self.generate_or_unavailable(|| Ok(HEALTH_CHECK_PROMPT.to_string()))
            .await
    }

    /// Writes the comparison and gap analysis as markdown into the reports directory.
    pub async fn write_reports(&self, summaries: &SummaryMap) -> Result<ReportPaths, AssistantError> {
        fs::create_dir_all(&self.layout.reports_dir).map_err(IngestError::from)?;

        let comparison = self.layout.reports_dir.join(COMPARE_REPORT_FILE);
        let compare_md = self.compare_documents(summaries).await?;
        fs::write(&comparison, compare_md).map_err(IngestError::from)?;
        info!(path = %comparison.display(), "comparison report saved");

        let gaps = self.layout.reports_dir.join(GAPS_REPORT_FILE);
        let gaps_md = self.find_gaps(summaries).await?;
        fs::write(&gaps, gaps_md).map_err(IngestError::from)?;
        info!(path = %gaps.display(), "gap report saved");

        Ok(ReportPaths { comparison, gaps })
    }

    async fn generate_or_unavailable<P>(&self, prompt: P) -> Result<String, ServiceError>
    where
        P: FnOnce() -> Result<String, ServiceError>,
    {
        let Some(generator) = &self.generator else {
            warn!("generative request skipped: no API key");
            return Ok(GENERATION_UNAVAILABLE.to_string());
        };

        generator.generate(&prompt()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::indexer::tests::RecordingStore;
    use crate::models::{citation, ChunkMetadata};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
            self.prompts
                .lock()
                .map_err(|_| ServiceError::Request("poisoned".to_string()))?
                .push(prompt.to_string());
            Ok(format!("generated {} chars", prompt.len()))
        }
    }

    struct DownGenerator;

    #[async_trait]
    impl TextGenerator for DownGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ServiceError> {
            Err(ServiceError::BackendResponse {
                backend: "gemini".to_string(),
                details: "500 Internal Server Error".to_string(),
            })
        }
    }

    fn options() -> IngestionOptions {
        IngestionOptions {
            chunk_size: 20,
            overlap: 5,
        }
    }

    fn assistant<G: TextGenerator + Send + Sync>(
        root: &Path,
        generator: Option<G>,
    ) -> ResearchAssistant<CharacterNgramEmbedder, RecordingStore, G> {
        ResearchAssistant::new(
            CharacterNgramEmbedder { dimensions: 16 },
            RecordingStore::default(),
            generator,
            DataLayout::under(root),
            options(),
        )
        .unwrap()
    }

    #[test]
    fn invalid_chunking_fails_before_processing() {
        let result = ResearchAssistant::new(
            CharacterNgramEmbedder::default(),
            RecordingStore::default(),
            None::<EchoGenerator>,
            DataLayout::default(),
            IngestionOptions {
                chunk_size: 50,
                overlap: 50,
            },
        );
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[tokio::test]
    async fn upload_is_staged_persisted_and_indexed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let source = dir.path().join("Graph Methods.txt");
        fs::write(&source, "Graph neural networks for protein structure prediction.")?;
        let assistant = assistant(dir.path(), None::<EchoGenerator>);

        let outcome = assistant.process_upload(&source).await?;
        assert_eq!(outcome.doc_id, "Graph Methods");
        assert!(assistant.layout().uploads_dir.join("Graph Methods.txt").exists());
        assert!(assistant.layout().chunks_file("Graph Methods").exists());

        let batches = assistant.store.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), outcome.chunks.len());
        assert_eq!(batches[0].ids[0], "Graph Methods__0");
        Ok(())
    }

    #[tokio::test]
    async fn batch_skips_unreadable_files_and_reports_progress(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let good = dir.path().join("good.txt");
        let broken = dir.path().join("broken.pdf");
        fs::write(&good, "Readable text about climate models and rainfall.")?;
        fs::write(&broken, b"%PDF-1.4\n%broken")?;
        let assistant = assistant(dir.path(), None::<EchoGenerator>);

        let mut progress = Vec::new();
        let report = assistant
            .process_uploads(&[broken.clone(), good], |done, total| {
                progress.push((done, total))
            })
            .await?;

        assert_eq!(progress, vec![(1, 2), (2, 2)]);
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.skipped_files[0].path, broken);
        assert!(report.chunk_count() > 0);
        Ok(())
    }

    #[tokio::test]
    async fn embed_all_indexes_each_persisted_document() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let assistant = assistant(dir.path(), None::<EchoGenerator>);
        assert_eq!(assistant.embed_all().await?, 0);

        let mut counts = Vec::new();
        for (name, text) in [
            ("a.txt", "Some text that is long enough to split."),
            ("b.txt", "A second and noticeably longer text, so that it yields more chunks."),
        ] {
            let source = dir.path().join(name);
            fs::write(&source, text)?;
            counts.push(assistant.ingest_upload(&source)?.chunks.len());
        }

        let written = assistant.embed_all().await?;
        let batches = assistant.store.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(written, counts.iter().sum::<usize>());

        // ids restart per document and match those written at upload time
        for (batch, (doc_id, count)) in batches.iter().zip(["a", "b"].into_iter().zip(counts)) {
            let expected: Vec<String> = (0..count).map(|i| format!("{doc_id}__{i}")).collect();
            assert_eq!(batch.ids, expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected_before_querying() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let assistant = assistant(dir.path(), None::<EchoGenerator>);

        assert!(matches!(
            assistant.search("protein folding", 0).await,
            Err(ServiceError::Request(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn search_delegates_to_the_store() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let hit = SearchHit {
            text: "matching chunk".to_string(),
            metadata: ChunkMetadata {
                doc_id: "paper".to_string(),
                page: 3,
                citation: citation("paper", 3),
            },
            distance: Some(0.2),
        };
        let assistant = ResearchAssistant::new(
            CharacterNgramEmbedder::default(),
            RecordingStore {
                hits: vec![hit.clone(), hit.clone(), hit.clone(), hit],
                ..RecordingStore::default()
            },
            None::<EchoGenerator>,
            DataLayout::under(dir.path()),
            options(),
        )?;

        let hits = assistant.search("protein folding", DEFAULT_TOP_K).await?;
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].metadata.citation, "paper p.3");

        assert!(matches!(
            assistant.search("   ", DEFAULT_TOP_K).await,
            Err(ServiceError::Request(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn missing_generator_returns_sentinel() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let assistant = assistant(dir.path(), None::<EchoGenerator>);
        let summaries = SummaryMap::from([("a".to_string(), "excerpt".to_string())]);

        assert!(!assistant.has_generator());
        assert_eq!(assistant.compare_documents(&summaries).await?, GENERATION_UNAVAILABLE);
        assert_eq!(assistant.find_gaps(&summaries).await?, GENERATION_UNAVAILABLE);
        assert_eq!(
            assistant
                .draft_literature_review(&summaries, DomainMode::Education)
                .await?,
            GENERATION_UNAVAILABLE
        );
        assert_eq!(assistant.check_generator().await?, GENERATION_UNAVAILABLE);
        Ok(())
    }

    #[tokio::test]
    async fn review_prompt_uses_selected_mode() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let assistant = assistant(dir.path(), Some(EchoGenerator::default()));
        let summaries = SummaryMap::from([("a".to_string(), "excerpt".to_string())]);

        let review = assistant
            .draft_literature_review(&summaries, DomainMode::Education)
            .await?;
        assert!(review.starts_with("generated"));

        let generator = assistant.generator.as_ref().unwrap();
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains(DomainMode::Education.system_instruction()));
        Ok(())
    }

    #[tokio::test]
    async fn generator_failure_is_surfaced() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let assistant = assistant(dir.path(), Some(DownGenerator));
        let summaries = SummaryMap::from([("a".to_string(), "excerpt".to_string())]);

        assert!(matches!(
            assistant.compare_documents(&summaries).await,
            Err(ServiceError::BackendResponse { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reports_are_written_verbatim() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let assistant = assistant(dir.path(), Some(EchoGenerator::default()));
        let summaries = SummaryMap::from([("a".to_string(), "excerpt".to_string())]);

        let paths = assistant.write_reports(&summaries).await?;
        assert_eq!(paths.comparison.file_name().unwrap(), COMPARE_REPORT_FILE);
        assert!(fs::read_to_string(&paths.comparison)?.starts_with("generated"));
        assert!(fs::read_to_string(&paths.gaps)?.starts_with("generated"));
        Ok(())
    }
}

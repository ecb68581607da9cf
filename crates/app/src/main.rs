use chrono::Utc;
use clap::{Parser, Subcommand};
use scholar_mind_core::{
    discover_input_files, keyword_frequencies, supported_extension, CharacterNgramEmbedder,
    ChromaStore, DataLayout, DomainMode, EmbeddingBackend, GeminiClient, HttpEmbedder,
    IngestionOptions, ResearchAssistant, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_GEMINI_MODEL, DEFAULT_TOP_K, REVIEW_FILE,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Assistant = ResearchAssistant<EmbeddingBackend, ChromaStore, GeminiClient>;

#[derive(Parser)]
#[command(name = "scholar-mind", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Root folder holding uploads/ and processed/
    #[arg(long, env = "SCHOLAR_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Chroma base URL
    #[arg(long, env = "CHROMA_URL", default_value = "http://localhost:8000")]
    chroma_url: String,

    /// Chroma collection
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// OpenAI-compatible embeddings base URL. Uses the offline n-gram embedder when unset.
    #[arg(long, env = "EMBEDDING_API_URL")]
    embedding_url: Option<String>,

    /// Embedding model name sent to the embeddings endpoint
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Bearer token for the embeddings endpoint
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Vector size produced by the embedder
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Gemini API key. Comparison and review are unavailable without it.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// Characters per chunk
    #[arg(long, default_value_t = IngestionOptions::default().chunk_size)]
    chunk_size: usize,

    /// Characters repeated at the start of the next chunk
    #[arg(long, default_value_t = IngestionOptions::default().overlap)]
    overlap: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Copy papers into the uploads folder, chunk them and index the chunks.
    Ingest {
        /// PDF or TXT files to process.
        files: Vec<PathBuf>,
        /// Also process every PDF/TXT under this folder, recursively.
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Re-embed every processed chunk file into the vector store.
    Embed,
    /// Semantic search over indexed chunks.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Compare processed papers and list research gaps; writes markdown reports.
    Compare,
    /// Draft a literature review of the processed papers.
    Review {
        /// Tone preset: scientific, business or education.
        #[arg(long, default_value_t = DomainMode::Scientific)]
        mode: DomainMode,
        /// Where to save the review. Defaults to the reports folder.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show the most frequent words across the processed papers.
    Keywords {
        /// Number of words to show.
        #[arg(long, default_value_t = 15)]
        top: usize,
    },
    /// Report configuration and ping the generative model.
    Check,
}

impl Cli {
    fn build_assistant(&self) -> anyhow::Result<Assistant> {
        let embedder = match &self.embedding_url {
            Some(url) => EmbeddingBackend::Http(HttpEmbedder::new(
                url,
                self.embedding_model.clone(),
                self.embedding_api_key.clone(),
                self.embedding_dimensions,
            )?),
            None => EmbeddingBackend::Local(CharacterNgramEmbedder {
                dimensions: self.embedding_dimensions,
            }),
        };
        let store = ChromaStore::new(&self.chroma_url, self.collection.clone())?;
        let generator = GeminiClient::from_key(self.gemini_api_key.clone(), &self.gemini_model)?;

        let layout = DataLayout::under(&self.data_dir);
        layout.ensure_dirs()?;

        let options = IngestionOptions {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
        };

        Ok(ResearchAssistant::new(
            embedder, store, generator, layout, options,
        )?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let assistant = cli.build_assistant()?;
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        generative = assistant.has_generator(),
        "scholar-mind boot"
    );

    match cli.command {
        Command::Ingest { files, folder } => {
            let mut sources = Vec::new();
            for path in files {
                if supported_extension(&path).is_some() {
                    sources.push(path);
                } else {
                    warn!(path = %path.display(), "skipping file that is not PDF or TXT");
                }
            }
            if let Some(folder) = folder {
                sources.extend(discover_input_files(&folder));
            }

            if sources.is_empty() {
                println!("Select at least one file.");
                return Ok(());
            }

            let report = assistant
                .process_uploads(&sources, |done, total| {
                    println!("[{done}/{total}] processed");
                })
                .await?;

            if !report.skipped_files.is_empty() {
                warn!(skipped_files = report.skipped_files.len(), "some files were skipped");
                for skipped in &report.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
                }
            }

            for outcome in &report.processed {
                println!(
                    "{} pages={} chunks={} sha256={} source={} at {}",
                    outcome.doc_id,
                    outcome.page_count,
                    outcome.chunks.len(),
                    outcome.checksum,
                    outcome.source_path.display(),
                    outcome.processed_at.to_rfc3339()
                );
            }
            println!(
                "{} files processed & embedded ({} chunks)",
                report.processed.len(),
                report.chunk_count()
            );
        }
        Command::Embed => {
            let written = assistant.embed_all().await?;
            println!("Stored {written} vectors in {}", cli.collection);
        }
        Command::Search { query, top_k } => {
            let hits = assistant.search(&query, top_k).await?;
            println!("Top {} results", hits.len());
            for hit in hits {
                println!("{}", hit.metadata.citation);
                println!("{}", hit.preview(500));
                println!("---");
            }
        }
        Command::Compare => {
            let summaries = assistant.summaries()?;
            if summaries.is_empty() {
                println!("Upload papers first.");
                return Ok(());
            }

            let paths = assistant.write_reports(&summaries).await?;
            println!("### Comparison Table");
            println!("{}", std::fs::read_to_string(&paths.comparison)?);
            println!("### Research Gaps");
            println!("{}", std::fs::read_to_string(&paths.gaps)?);
            println!(
                "saved {} and {}",
                paths.comparison.display(),
                paths.gaps.display()
            );
        }
        Command::Review { mode, output } => {
            let summaries = assistant.summaries()?;
            if summaries.is_empty() {
                println!("Upload papers first.");
                return Ok(());
            }

            let review = assistant.draft_literature_review(&summaries, mode).await?;
            let output = output.unwrap_or_else(|| assistant.layout().reports_dir.join(REVIEW_FILE));
            std::fs::write(&output, &review)?;
            println!("{review}");
            println!("saved {}", output.display());
        }
        Command::Keywords { top } => {
            let summaries = assistant.summaries()?;
            if summaries.is_empty() {
                println!("Upload papers to see visuals.");
                return Ok(());
            }

            let keywords = keyword_frequencies(&summaries, top);
            if keywords.is_empty() {
                println!("No data to plot.");
            }
            let width = keywords.iter().map(|(word, _)| word.chars().count()).max().unwrap_or(0);
            for (word, count) in keywords {
                println!("{word:<width$} {} {count}", "#".repeat(count));
            }
        }
        Command::Check => {
            let layout = assistant.layout();
            println!("data dir: {}", cli.data_dir.display());
            println!("uploads: {}", layout.uploads_dir.display());
            println!("processed: {}", layout.processed_dir.display());
            println!("GEMINI_API_KEY loaded: {}", assistant.has_generator());
            if assistant.has_generator() {
                let reply = assistant.check_generator().await?;
                println!("Gemini reply: {reply}");
            }
        }
    }

    Ok(())
}

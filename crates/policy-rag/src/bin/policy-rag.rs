//! policy-rag command line
//!
//! Run with: cargo run -p policy-rag -- ask --document policy.pdf --question "46M, knee surgery in Pune"

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use policy_rag::embeddings::build_backend;
use policy_rag::ingestion::{TextChunker, TextExtractor};
use policy_rag::providers::EmbeddingBackend;
use policy_rag::{DocumentType, Pipeline, PolicyRagConfig};

#[derive(Parser, Debug)]
#[command(
    name = "policy-rag",
    version,
    about = "Answer claim questions against an insurance policy document"
)]
struct Cli {
    /// TOML configuration file (defaults plus POLICY_RAG_* environment otherwise)
    #[arg(long, global = true, env = "POLICY_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a document and answer one or more questions
    Ask {
        /// Policy document (pdf, docx, txt, md, html)
        #[arg(long)]
        document: PathBuf,

        /// Question to answer; repeat for several
        #[arg(long = "question", required = true)]
        questions: Vec<String>,
    },

    /// Extract and chunk a document, printing the chunks
    Chunk {
        /// Policy document (pdf, docx, txt, md, html)
        #[arg(long)]
        document: PathBuf,

        /// Override the configured word budget
        #[arg(long)]
        max_words: Option<usize>,
    },

    /// Download and load the embedding model ahead of time
    WarmUp,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policy_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Ask {
            document,
            questions,
        } => ask(config, &document, &questions).await,
        Command::Chunk {
            document,
            max_words,
        } => chunk(config, &document, max_words).await,
        Command::WarmUp => warm_up(config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<PolicyRagConfig> {
    let config = match path {
        Some(path) => PolicyRagConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PolicyRagConfig::from_env()?,
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding strategy: {:?}", config.embeddings.strategy);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.output_dimensions());
    tracing::info!("  - LLM: {:?} {} at {}", config.llm.provider, config.llm.model, config.llm.base_url);
    tracing::info!("  - Chunk budget: {} words, top_k: {}", config.chunking.max_words, config.retrieval.top_k);

    Ok(config)
}

async fn ask(config: PolicyRagConfig, document: &Path, questions: &[String]) -> Result<()> {
    if questions.iter().all(|q| q.trim().is_empty()) {
        bail!("at least one non-empty --question is required");
    }

    let pipeline = Pipeline::from_config(config)?;
    let doc = pipeline
        .ingest_file(document)
        .await
        .with_context(|| format!("ingesting {}", document.display()))?;

    let answers = pipeline.answer_all(&doc, questions).await;
    println!("{}", serde_json::to_string_pretty(&answers)?);
    Ok(())
}

async fn chunk(config: PolicyRagConfig, document: &Path, max_words: Option<usize>) -> Result<()> {
    let data = tokio::fs::read(document)
        .await
        .with_context(|| format!("reading {}", document.display()))?;
    let name = document
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let doc_type = DocumentType::resolve(Some(name.as_str()), None, &data)?;

    let extractor = TextExtractor::from_config(&config.extraction);
    let text = tokio::task::spawn_blocking(move || extractor.extract(&data, doc_type)).await??;

    let chunker = TextChunker::from_config(&config.chunking)?;
    let chunks = chunker.chunk(text.as_str(), max_words.unwrap_or(chunker.max_words()));

    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}

async fn warm_up(config: PolicyRagConfig) -> Result<()> {
    let backend = build_backend(&config.embeddings);
    backend.warm_up().await.context("initializing embedding backend")?;

    println!(
        "{}",
        serde_json::json!({
            "backend": backend.name(),
            "dimensions": backend.dimensions(),
            "cache_dir": config.embeddings.cache_dir,
        })
    );
    Ok(())
}

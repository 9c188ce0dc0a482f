use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use verdikt_core::config::Config;
use verdikt_core::pipeline::Pipeline;
use verdikt_index::CorpusIndex;
use verdikt_index::in_memory_store::InMemoryVectorStore;
use verdikt_index::ingest;
use verdikt_index::qdrant::QdrantStore;
use verdikt_index::vector_store::VectorStore;
use verdikt_llm::openai::OpenAiProvider;

#[derive(Parser)]
#[command(name = "verdikt", version, about = "Audited question answering over a private corpus")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "verdikt.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a JSON corpus file into the index.
    Ingest {
        path: PathBuf,
        /// Treat the file as the flat format (no proposition extraction).
        #[arg(long)]
        flat: bool,
    },
    /// Answer a question against the ingested corpus.
    Ask { question: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let provider = Arc::new(create_provider(&config)?);
    let store = create_store(&config)?;
    let index = CorpusIndex::new(
        store,
        Arc::clone(&provider),
        config.index.chunk_collection.clone(),
        config.index.proposition_collection.clone(),
    );
    match cli.command {
        Command::Ingest { path, flat } => {
            index.ensure_collections(config.index.vector_size).await?;
            let report = if flat {
                let records = ingest::load_flat(&path)?;
                ingest::ingest_flat(&index, records).await?
            } else {
                let documents = ingest::load_corpus(&path)?;
                ingest::ingest_corpus(&index, documents).await?
            };
            println!(
                "Ingested {} chunk(s) and {} proposition(s).",
                report.chunks, report.propositions
            );
            println!(
                "Index now holds {} chunk(s) and {} proposition(s).",
                index.chunk_count().await?,
                index.proposition_count().await?
            );
        }
        Command::Ask { question } => {
            if !index.collections_exist().await? {
                bail!("no corpus has been ingested yet; run `verdikt ingest <file>` first");
            }
            let pipeline = Pipeline::new(
                provider,
                index,
                config.retrieval,
                config.pipeline.stage_timeout(),
            );
            let audit = pipeline.answer(&question).await?;

            println!("{}", audit.verified_answer);
            println!();
            println!(
                "[decision: {:?} | confidence: {:.2}]",
                audit.decision, audit.confidence
            );
            if !audit.sources_used.is_empty() {
                println!(
                    "[sources: {}]",
                    audit
                        .sources_used
                        .iter()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            tracing::debug!(reasoning = %audit.reasoning, "audit reasoning");
        }
    }

    Ok(())
}

fn create_provider(config: &Config) -> anyhow::Result<OpenAiProvider> {
    match config.llm.provider.as_str() {
        "openai" => {
            let api_key = config
                .llm
                .api_key
                .clone()
                .context("no API key configured; set OPENAI_API_KEY")?;
            Ok(OpenAiProvider::new(
                api_key,
                config.llm.base_url.clone(),
                config.llm.model.clone(),
                config.llm.max_tokens,
                Some(config.llm.embedding_model.clone()),
            ))
        }
        other => bail!("unknown LLM provider: {other}"),
    }
}

fn create_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.index.backend.as_str() {
        "qdrant" => Ok(Arc::new(QdrantStore::new(&config.index.qdrant_url)?)),
        "memory" => Ok(Arc::new(InMemoryVectorStore::new())),
        other => bail!("unknown index backend: {other}"),
    }
}

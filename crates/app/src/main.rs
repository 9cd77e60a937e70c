mod page;
mod web;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_insights_core::{
    store_file, store_folder, EmbeddingConfig, EmbeddingProvider, IndexBackend, IndexConfig,
    InsightsConfig, InsightsPipeline, Metric, PineconeConfig, QdrantConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-insights", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Embedding provider. `local` hashes text offline and needs no key.
    #[arg(long, value_enum, default_value_t = EmbedderArg::Openai)]
    embedder: EmbedderArg,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    openai_base_url: String,

    /// Embedding model name
    #[arg(long, default_value = "text-embedding-ada-002")]
    embedding_model: String,

    /// Embedding dimensionality; must match the index
    #[arg(long, default_value = "1536")]
    dimensions: usize,

    /// Vector index backend
    #[arg(long, value_enum, default_value_t = BackendArg::Pinecone)]
    index_backend: BackendArg,

    /// Similarity metric used when the index is created
    #[arg(long, value_enum, default_value_t = MetricArg::Cosine)]
    metric: MetricArg,

    /// Index (or collection) name
    #[arg(long, default_value = "finance-insights")]
    index_name: String,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_api_key: Option<String>,

    /// Pinecone environment (serverless region)
    #[arg(long, env = "PINECONE_ENVIRONMENT")]
    pinecone_environment: Option<String>,

    /// Pinecone serverless cloud
    #[arg(long, default_value = "aws")]
    pinecone_cloud: String,

    /// Pinecone control-plane URL
    #[arg(long, default_value = "https://api.pinecone.io")]
    pinecone_controller_url: String,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant API key
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    qdrant_api_key: Option<String>,

    /// Number of matches returned per query
    #[arg(long, default_value = "2")]
    top_k: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderArg {
    Openai,
    Local,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Pinecone,
    Qdrant,
    Memory,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Cosine,
    Euclidean,
    Dotproduct,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the single-page upload and search form.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8501")]
        bind: SocketAddr,
    },
    /// Extract, embed and store one PDF.
    Store {
        /// PDF to store.
        #[arg(long)]
        file: PathBuf,
        /// Index key; defaults to the file name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Store every PDF found under a folder, keyed by file name.
    StoreFolder {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Find the stored documents nearest to a question.
    Search {
        /// Natural-language question.
        #[arg(long)]
        query: String,
    },
}

impl Cli {
    fn config(&self) -> InsightsConfig {
        InsightsConfig {
            embedding: EmbeddingConfig {
                provider: match self.embedder {
                    EmbedderArg::Openai => EmbeddingProvider::OpenAi,
                    EmbedderArg::Local => EmbeddingProvider::Hashing,
                },
                api_key: self.openai_api_key.clone(),
                base_url: self.openai_base_url.clone(),
                model: self.embedding_model.clone(),
                dimensions: self.dimensions,
            },
            index: IndexConfig {
                backend: match self.index_backend {
                    BackendArg::Pinecone => IndexBackend::Pinecone,
                    BackendArg::Qdrant => IndexBackend::Qdrant,
                    BackendArg::Memory => IndexBackend::Memory,
                },
                name: self.index_name.clone(),
                metric: match self.metric {
                    MetricArg::Cosine => Metric::Cosine,
                    MetricArg::Euclidean => Metric::Euclidean,
                    MetricArg::Dotproduct => Metric::Dotproduct,
                },
                pinecone: PineconeConfig {
                    api_key: self.pinecone_api_key.clone(),
                    environment: self.pinecone_environment.clone(),
                    cloud: self.pinecone_cloud.clone(),
                    controller_url: self.pinecone_controller_url.clone(),
                },
                qdrant: QdrantConfig {
                    url: self.qdrant_url.clone(),
                    api_key: self.qdrant_api_key.clone(),
                },
            },
            top_k: self.top_k,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "pdf_insights=info,pdf_insights_core=info,tower_http=info".into()
        }))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let pipeline = InsightsPipeline::from_config(&config).await?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        backend = pipeline.backend(),
        index = %config.index.name,
        model = %config.embedding.model,
        "pdf-insights boot"
    );

    match cli.command {
        Command::Serve { bind } => {
            let app = web::create_router(web::AppState::new(pipeline));
            info!("listening on http://{bind}");
            let listener = tokio::net::TcpListener::bind(bind).await?;
            axum::serve(listener, app).await?;
        }
        Command::Store { file, name } => {
            let receipt = store_file(&pipeline, &file, name.as_deref()).await?;
            println!("{}", receipt.message());
        }
        Command::StoreFolder { folder } => {
            let report = store_folder(&pipeline, &folder).await?;

            for receipt in &report.stored {
                println!("{}", receipt.message());
            }
            for skipped in &report.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
            }

            if !report.skipped_files.is_empty() {
                anyhow::bail!(
                    "{} of {} pdf(s) could not be stored",
                    report.skipped_files.len(),
                    report.stored.len() + report.skipped_files.len()
                );
            }
        }
        Command::Search { query } => {
            let matches = pipeline.search(&query).await?;
            for line in page::result_lines(&matches) {
                println!("{line}");
            }
        }
    }

    Ok(())
}

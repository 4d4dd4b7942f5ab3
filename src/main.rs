use anyhow::Context;
use clap::{Parser, Subcommand};
use courserec_api::{ApiState, RestApi};
use courserec_core::{FuzzyMetric, Outcome, Recommender, RecommenderConfig};
use courserec_storage::{StorageConfig, StorageManager, DEFAULT_ARTIFACT_NAME, DEFAULT_LABEL_COLUMN};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Course recommendations from title similarity
#[derive(Parser, Debug)]
#[command(name = "courserec")]
#[command(about = "Recommend similar courses by title", long_about = None)]
struct Args {
    /// Path to the data directory holding the precomputed matrix
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Catalog CSV file
    #[arg(short, long, default_value = "./data/courses.csv")]
    catalog: PathBuf,

    /// CSV column holding the course title
    #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
    label_column: String,

    /// Artifact file name inside the data directory
    #[arg(long, default_value = DEFAULT_ARTIFACT_NAME)]
    artifact: String,

    /// Do not write the similarity matrix after computing it
    #[arg(long)]
    no_persist: bool,

    /// Default number of recommendations
    #[arg(long, default_value_t = 10)]
    default_k: usize,

    /// Minimum fuzzy ratio for free-text queries
    #[arg(long, default_value_t = courserec_core::DEFAULT_CUTOFF)]
    cutoff: f64,

    /// Fuzzy metric: lcs, levenshtein or jaro_winkler
    #[arg(long, default_value = "lcs")]
    metric: String,

    /// Minimum token length for vocabulary terms
    #[arg(long, default_value_t = 1)]
    min_token_len: usize,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// HTTP API port
        #[arg(long, default_value_t = 8080)]
        http_port: u16,
    },
    /// Recommend courses similar to a title
    Recommend {
        /// Course title or free-text query
        query: String,

        /// Number of recommendations
        #[arg(short)]
        k: Option<usize>,

        /// Require an exact title match, no fuzzy fallback
        #[arg(long)]
        exact: bool,
    },
    /// List course titles containing a term
    Search {
        term: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Compute and store the similarity matrix, then exit
    Precompute,
}

impl Args {
    fn recommender_config(&self) -> anyhow::Result<RecommenderConfig> {
        let metric: FuzzyMetric = self.metric.parse()?;
        let config = RecommenderConfig {
            default_k: self.default_k,
            fuzzy_cutoff: self.cutoff,
            fuzzy_metric: metric,
            min_token_len: self.min_token_len,
            ..RecommenderConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    fn storage_config(&self) -> StorageConfig {
        let mut config = StorageConfig::new(&self.data_dir, &self.catalog);
        config.label_column = self.label_column.clone();
        config.artifact_name = self.artifact.clone();
        config.persist_artifact = !self.no_persist;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let recommender_config = args.recommender_config()?;
    let storage = Arc::new(StorageManager::new(args.storage_config())?);

    match args.command {
        Command::Precompute => {
            let description = storage.precompute(recommender_config)?;
            println!("{}", serde_json::to_string_pretty(&description)?);
            Ok(())
        }
        Command::Search { ref term, limit } => {
            let recommender = storage.open(recommender_config)?;
            let hits = recommender.search_labels(term, limit);
            println!("{}", serde_json::to_string_pretty(&hits)?);
            Ok(())
        }
        Command::Recommend { ref query, k, exact } => {
            let recommender = storage.open(recommender_config)?;
            let k = k.unwrap_or(recommender.config().default_k);
            let outcome = if exact {
                recommender.recommend_by_label(query, k)?
            } else {
                recommender.recommend_by_free_text(query, k, recommender.config().fuzzy_cutoff)?
            };
            print_outcome(&recommender, &outcome)
        }
        Command::Serve { http_port } => serve(storage, recommender_config, http_port).await,
    }
}

fn print_outcome(recommender: &Recommender, outcome: &Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Found { .. } => {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
        Outcome::NotFound { label: query } | Outcome::NoMatch { query } => {
            let suggestions = recommender.search_labels(query, 10);
            let body = serde_json::json!({
                "result": outcome,
                "suggestions": suggestions,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}

async fn serve(
    storage: Arc<StorageManager>,
    config: RecommenderConfig,
    http_port: u16,
) -> anyhow::Result<()> {
    info!("Starting courserec v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", storage.config().data_dir);
    info!("Catalog: {:?}", storage.config().catalog_path);

    let open_storage = storage.clone();
    let recommender = tokio::task::spawn_blocking(move || open_storage.open(config))
        .await
        .context("Recommender initialization panicked")??;
    info!(courses = recommender.len(), "Recommender initialized");

    let state = ApiState {
        recommender: Arc::new(recommender),
        storage: Some(storage),
    };

    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, http_port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}

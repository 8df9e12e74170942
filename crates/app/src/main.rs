use assessment_recommender_core::{
    load_catalogue_file, normalize, CharacterNgramEmbedder, EmbeddingProvider, HttpEmbedder,
    HttpEmbedderOptions, HybridResolver, KeywordOverride, Recommendation, ResolutionPath,
    ResolverConfig, DEFAULT_TOP_K,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "assessment-recommender", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Catalogue file: a JSON array of assessment records.
    #[arg(long, env = "RECOMMENDER_CATALOGUE", default_value = "data/catalogue.json")]
    catalogue: PathBuf,

    /// Embedding backend.
    #[arg(long, env = "RECOMMENDER_EMBEDDER", value_enum, default_value_t = EmbedderKind::Ngram)]
    embedder: EmbedderKind,

    /// Base URL of an OpenAI-compatible embeddings API.
    #[arg(long, env = "RECOMMENDER_EMBEDDING_URL", default_value = "http://localhost:8080/v1")]
    embedding_url: String,

    /// Embedding model name sent to the API.
    #[arg(long, env = "RECOMMENDER_EMBEDDING_MODEL", default_value = "all-MiniLM-L6-v2")]
    embedding_model: String,

    /// Bearer token for the embeddings API.
    #[arg(long, env = "RECOMMENDER_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Vector dimensions produced by the embedder.
    #[arg(long, env = "RECOMMENDER_DIMENSIONS", default_value = "384")]
    dimensions: usize,

    /// Texts per embeddings request when building the index.
    #[arg(long, env = "RECOMMENDER_BATCH_SIZE", default_value = "64")]
    batch_size: usize,

    /// Maximum concurrent embedding calls; unlimited when omitted.
    #[arg(long, env = "RECOMMENDER_EMBEDDING_CONCURRENCY")]
    embedding_concurrency: Option<usize>,

    /// JSON array of keyword override rules replacing the built-in one.
    #[arg(long, env = "RECOMMENDER_OVERRIDE_RULES")]
    override_rules: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    /// Offline character-trigram hashing.
    Ngram,
    /// Remote embeddings endpoint.
    Http,
}

#[derive(Subcommand)]
enum Command {
    /// Recommend assessments for a free-text query.
    Recommend {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of assessments to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Timeout for the query embedding, in milliseconds.
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,
        /// Print the resolution path and similarity scores.
        #[arg(long, default_value_t = false)]
        explain: bool,
        /// Emit the recommendation as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load the catalogue, build the index and report on it.
    Inspect,
    /// Print the normalized form of a text.
    Normalize {
        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "assessment-recommender boot"
    );

    if let Command::Normalize { text } = &cli.command {
        println!("{}", normalize(text));
        return Ok(ExitCode::SUCCESS);
    }

    let provider = build_provider(&cli)?;
    let mut config = ResolverConfig {
        max_concurrent_embeddings: cli.embedding_concurrency,
        ..ResolverConfig::default()
    };
    if let Some(path) = &cli.override_rules {
        config.overrides = read_override_rules(path)?;
    }

    let report = load_catalogue_file(&cli.catalogue)
        .map_err(|error| anyhow::anyhow!("{}: {error}", cli.catalogue.display()))?;
    if !report.skipped_records.is_empty() {
        warn!(
            "skipped_records={} for catalogue={}",
            report.skipped_records.len(),
            cli.catalogue.display()
        );
    }

    let resolver = HybridResolver::new(provider, config);
    let skipped = report.skipped_records;
    let snapshot = resolver
        .rebuild(report.items)
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    match cli.command {
        Command::Inspect => {
            println!("catalogue: {}", cli.catalogue.display());
            println!("items: {}", snapshot.len());
            println!("dimensions: {}", snapshot.index().dimensions());
            println!("checksum: {}", snapshot.checksum());
            println!("built_at: {}", snapshot.built_at().to_rfc3339());
            println!("skipped: {}", skipped.len());
            for record in skipped {
                println!("  record {}: {}", record.position, record.reason);
            }
        }
        Command::Recommend {
            query,
            top_k,
            timeout_ms,
            explain,
            json,
        } => {
            let timeout = Some(Duration::from_millis(timeout_ms));
            if !run_recommend(&resolver, &query, top_k, timeout, explain, json).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Normalize { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}

// Ok(false) when the resolver failed; the notice is already printed
async fn run_recommend(
    resolver: &HybridResolver,
    query: &str,
    top_k: usize,
    timeout: Option<Duration>,
    explain: bool,
    json: bool,
) -> anyhow::Result<bool> {
    let recommendation = match resolver.recommend_with_timeout(query, top_k, timeout).await {
        Ok(recommendation) => recommendation,
        Err(failure) => {
            error!(error = %failure, "recommendation failed");
            eprintln!("Something went wrong: {failure}");
            return Ok(false);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&recommendation)?);
    } else {
        print_recommendation(&recommendation, explain);
    }
    Ok(true)
}

fn build_provider(cli: &Cli) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match cli.embedder {
        EmbedderKind::Ngram => Arc::new(CharacterNgramEmbedder::new(cli.dimensions)),
        EmbedderKind::Http => Arc::new(
            HttpEmbedder::new(HttpEmbedderOptions {
                base_url: cli.embedding_url.clone(),
                model: cli.embedding_model.clone(),
                api_key: cli.embedding_api_key.clone(),
                dimensions: cli.dimensions,
                batch_size: cli.batch_size,
                max_concurrency: cli.embedding_concurrency,
                ..HttpEmbedderOptions::default()
            })
            .map_err(|error| anyhow::anyhow!(error.to_string()))?,
        ),
    };
    Ok(provider)
}

fn read_override_rules(path: &Path) -> anyhow::Result<Vec<KeywordOverride>> {
    let bytes = std::fs::read(path)?;
    let rules: Vec<KeywordOverride> = serde_json::from_slice(&bytes)?;
    info!(path = %path.display(), rules = rules.len(), "loaded keyword override rules");
    Ok(rules)
}

fn print_recommendation(recommendation: &Recommendation, explain: bool) {
    println!("query: {}", recommendation.query);
    if recommendation.hits.is_empty() {
        println!("no matching assessments");
    }

    for (rank, hit) in recommendation.hits.iter().enumerate() {
        let item = &hit.item;
        println!("Recommendation {}: {}", rank + 1, item.name());
        println!("  Description: {}", item.description());
        println!("  Test Type: {}", item.test_type());
        println!("  Job Levels: {}", item.job_levels());
        println!("  Duration: {}", item.length());
        println!("  Remote Testing: {}", item.remote());
        println!("  Adaptive/IRT: {}", item.adaptive());
        if !item.url().is_empty() {
            println!("  Link: {}", item.url());
        }
        if explain {
            match hit.score {
                Some(score) => println!("  explain: position={} score={score:.4}", hit.position),
                None => println!("  explain: position={} keyword match", hit.position),
            }
        }
    }

    if explain {
        match &recommendation.resolution {
            ResolutionPath::KeywordOverride { keyword } => {
                println!("explain: path=keyword_override keyword={keyword}")
            }
            ResolutionPath::Vector => println!("explain: path=vector"),
        }
    }
}

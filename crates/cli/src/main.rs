use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use knowledge_store::{KnowledgeStore, StoreConfig};
use knowledge_vector_store::PointId;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "knowledge")]
#[command(about = "Multi-collection knowledge store over a vector database", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (KNOWLEDGE_* variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether the vector engine answers
    Health,

    /// Create missing collections with the embedder's dimension
    Connect,

    /// Ingest documents, schemas and samples for one datasource
    Ingest(IngestArgs),

    /// Load a batch descriptor (YAML list of description/metadata) into documentation
    Load(LoadArgs),

    /// Similarity search within one datasource
    Search(SearchArgs),

    /// Look up a sample by id
    Sample(SampleArgs),

    /// Delete every record of an ingestion run
    Clear(ClearArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Tenant the records belong to
    #[arg(long)]
    datasource: String,

    /// Ingestion run id, used later by `clear`
    #[arg(long)]
    config_id: String,

    /// YAML list of documentation chunks
    #[arg(long)]
    documents: Option<PathBuf>,

    /// YAML list of schema chunks
    #[arg(long)]
    schemas: Option<PathBuf>,

    /// YAML list of sample queries
    #[arg(long)]
    samples: Option<PathBuf>,
}

#[derive(Args)]
struct LoadArgs {
    path: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SearchTarget {
    Documentation,
    Schema,
    Cache,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(value_enum)]
    target: SearchTarget,

    query: String,

    /// Datasource to search; only the first one is used as the filter
    #[arg(long, required = true)]
    datasource: Vec<String>,

    /// Number of results (defaults to sample_count from the config)
    #[arg(short = 'n', long)]
    count: Option<usize>,
}

#[derive(Args)]
struct SampleArgs {
    id: PointId,

    /// Read only; do not count the lookup as a cache hit
    #[arg(long)]
    no_reinforce: bool,
}

#[derive(Args)]
struct ClearArgs {
    config_id: String,
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config =
        StoreConfig::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    let store = KnowledgeStore::from_config(&config).context("Failed to initialise store")?;

    match cli.command {
        Commands::Health => commands::health(&store).await,
        Commands::Connect => commands::connect(&store).await,
        Commands::Ingest(args) => commands::ingest(&store, args).await,
        Commands::Load(args) => commands::load(&store, &args.path).await,
        Commands::Search(args) => commands::search(&store, args).await,
        Commands::Sample(args) => commands::sample(&store, &args.id, !args.no_reinforce).await,
        Commands::Clear(args) => commands::clear(&store, &args.config_id).await,
    }
}

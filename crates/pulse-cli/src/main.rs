use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod report;
mod run;
mod store;

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "LivePulse news pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, enrich, and store articles from all enabled sources
    Run {
        /// Restrict the run to a single source (by id)
        #[arg(long)]
        source: Option<String>,

        /// Run the full pipeline in memory without touching the database
        #[arg(long)]
        dry_run: bool,

        /// Override the run deadline in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Show recent pipeline runs and stored article totals
    Report {
        /// Maximum number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = pulse_core::load_app_config()?;

    // RUST_LOG wins; PULSE_LOG_LEVEL is the fallback.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            source,
            dry_run,
            timeout_secs,
        } => run::run_pipeline_command(config, source.as_deref(), dry_run, timeout_secs).await,
        Commands::Report { limit } => report::run_report(&config, limit).await,
        Commands::Migrate => {
            let pool = pulse_db::connect(&config).await?;
            pulse_db::run_migrations(&pool).await?;
            println!("migrations up to date");
            Ok(())
        }
    }
}

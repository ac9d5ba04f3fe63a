mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hotel_search::{config, server};

#[derive(Parser)]
#[command(
    name = "hotel-search",
    version,
    about = "Semantic search over hotel annotations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Rank the catalog against a query from the terminal
    Search {
        /// Free-text query
        query: String,
        /// Re-embed every annotation instead of using stored vectors
        #[arg(long)]
        fresh: bool,
    },
    /// Recompute stored vectors for every hotel
    Enrol,
    /// Insert synthetic hotels
    Populate {
        /// Number of hotels (defaults to populate.default_count)
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Seed for reproducible catalogs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Delete every hotel and reset the id counter
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Run database diagnostics
    Doctor,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.hotel-search/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::ServiceConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Search { query, fresh } => cli::search::search(&config, &query, fresh).await?,
        Command::Enrol => cli::enrol::enrol(&config).await?,
        Command::Populate { count, seed } => cli::populate::populate(&config, count, seed).await?,
        Command::Reset { yes } => cli::reset::reset(&config, yes)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}

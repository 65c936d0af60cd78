use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gator_core::{storage::Database, AppConfig};

mod commands;

#[derive(Parser)]
#[command(name = "gator")]
#[command(author, version, about = "An RSS aggregator that scrapes feeds on a schedule")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape feeds every interval until interrupted
    Agg {
        /// Time between scrapes, e.g. "30s", "1m", "1h30m" (defaults to config)
        interval: Option<String>,
    },
    /// Run a single scrape cycle
    Scrape,
    /// Register a feed
    AddFeed {
        /// Display name for the feed
        name: String,
        /// RSS feed URL
        url: String,
    },
    /// List registered feeds
    Feeds,
    /// Remove a feed and its posts
    RemoveFeed {
        /// Feed name or URL
        feed: String,
    },
    /// Show the latest posts
    Posts {
        /// Maximum number of posts to show
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        /// Only show posts from this feed (name or URL)
        #[arg(short, long)]
        feed: Option<String>,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Agg { interval } => commands::agg::run(&config, interval.as_deref()).await,
        Commands::Scrape => {
            let db = Database::new(&config).await?;
            commands::scrape::run(&db, &config).await
        }
        Commands::AddFeed { name, url } => {
            let db = Database::new(&config).await?;
            commands::add_feed::run(&db, &config, &name, &url).await
        }
        Commands::Feeds => {
            let db = Database::new(&config).await?;
            commands::feeds::run(&db).await
        }
        Commands::RemoveFeed { feed } => {
            let db = Database::new(&config).await?;
            commands::remove_feed::run(&db, &feed).await
        }
        Commands::Posts { limit, feed } => {
            let db = Database::new(&config).await?;
            commands::posts::run(&db, limit, feed.as_deref()).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config::init(&config, force),
            ConfigAction::Show => commands::config::show(&config),
        },
    }
}

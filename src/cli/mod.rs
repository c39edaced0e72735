pub mod commands;

use clap::{Parser, Subcommand};
use crate::error::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "news-sitemap")]
#[command(about = "Serve a Google News sitemap of recently published articles")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init,

    /// Serve the sitemap over HTTP until interrupted
    Serve {
        /// Address to bind, overrides the configuration
        #[arg(short, long, env = "NEWS_SITEMAP_BIND")]
        bind: Option<String>,
    },

    /// Print the current sitemap document
    Generate,

    /// Drop the cached document
    Regenerate {
        /// Request the live endpoint afterwards so the cache is warm again
        #[arg(long)]
        warm: bool,
    },

    /// Notify the indexer that a piece of content was published
    Notify {
        /// Id of the published content
        content_id: u64,
    },

    /// Show the ping log
    PingLog,

    /// Empty the ping log
    ClearPingLog,

    /// Print the cache key currently used for the sitemap
    Fingerprint,

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if let Commands::Completions { shell } = self.command {
            commands::generate_completions(shell);
            return Ok(());
        }

        let config = commands::load_config(self.config.clone())?;
        let _guard = commands::init_logging(self.debug, self.verbose, &config.logging)?;

        match self.command {
            Commands::Init => commands::init(self.config).await,
            Commands::Serve { bind } => commands::serve(&config, bind).await,
            Commands::Generate => commands::generate(&config).await,
            Commands::Regenerate { warm } => commands::regenerate(&config, warm).await,
            Commands::Notify { content_id } => commands::notify(&config, content_id).await,
            Commands::PingLog => commands::show_ping_log(&config).await,
            Commands::ClearPingLog => commands::clear_ping_log(&config).await,
            Commands::Fingerprint => commands::fingerprint(&config).await,
            Commands::Completions { .. } => Ok(()),
        }
    }
}

//! tickergate CLI
//!
//! Commands delegate to the library; `serve` is the production entry point.

use crate::config::Config;
use crate::{Result, auth, http, storage};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "tickergate", version, about = "Credential-issuance backend for the market-data platform")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the authorization server
    Serve {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate the configuration and exit
    CheckConfig {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Parse arguments and run the selected command
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let config = Config::load(config.as_deref())?;
            let store = storage::create_storage_from_config(&config.storage).await?;
            let state = Arc::new(auth::OAuthServerState::new(store, config.oauth.clone())?);
            http::serve(&config, state).await
        }
        Commands::CheckConfig { config } => {
            Config::load(config.as_deref())?;
            println!("Configuration OK");
            Ok(())
        }
    }
}

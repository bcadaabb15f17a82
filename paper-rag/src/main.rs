use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paper_rag::{ApiServer, ApiServerConfig, AppConfig, QaService};

#[derive(Parser)]
#[command(name = "paper-rag")]
#[command(about = "Research paper question answering service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start API server
    Serve {
        /// Host to bind to (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "paper_rag=info,paper_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let service = Arc::new(QaService::in_memory(&config)?);
            let server = ApiServer::new(ApiServerConfig::from(&config), service);
            println!("Starting API server on {}", config.bind_address());
            server.start().await?;
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use scripture_qa::Result;
use scripture_qa::commands::{ask, serve};
use scripture_qa::config::{Config, get_config_dir, show_config};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "scripture-qa")]
#[command(about = "Ask questions answered from the Bhagavad Gita, Quran and Bible")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.scripture-qa)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the verses and start the HTTP API
    Serve {
        /// Address to listen on, overrides the config file
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on, overrides the config file
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
        /// Restrict retrieval to this book; repeat for several
        #[arg(long = "book")]
        books: Vec<String>,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };
    let mut config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            serve(config).await?;
        }
        Commands::Ask { question, books } => {
            ask(config, question, books).await?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}

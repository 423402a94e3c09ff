use std::sync::Arc;

use clap::{Parser, Subcommand};

use ringback_core::config::Config;
use ringback_server::AppState;

#[derive(Parser)]
#[command(
    name = "ringback",
    about = "SMS-to-voice relay — receives inbound SMS and calls the sender back to read it aloud",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Port to listen on (default: 5002)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Place an outbound call through a running relay
    Call {
        /// Destination number in E.164 form, e.g. +15551234567
        #[arg(long)]
        to: String,

        /// Text to speak when the call connects
        #[arg(short, long)]
        message: String,

        /// Base URL of the running relay
        #[arg(long, default_value = "http://127.0.0.1:5002")]
        server: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Load config
    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);

    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or_else(|| config.port());
            let state = Arc::new(AppState::from_config(config)?);
            tracing::info!("Starting Ringback relay on port {port}");
            ringback_server::start_server(state, port).await?;
        }
        Commands::Call { to, message, server } => {
            let resp = reqwest::Client::new()
                .post(format!("{}/call/send", server.trim_end_matches('/')))
                .json(&serde_json::json!({ "message": message, "phone_number": to }))
                .send()
                .await?;

            let status = resp.status();
            let body: serde_json::Value = resp.json().await?;
            if status.is_success() {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                anyhow::bail!("call failed ({status}): {body}");
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
        },
    }

    Ok(())
}

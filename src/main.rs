use anyhow::Result;
use clap::{Parser, Subcommand};
use polyprompt::transport::cli::{self, OutputFormat};
use polyprompt::transport::http;
use polyprompt::{Catalog, Config};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "polyprompt")]
#[command(author, version, about = "Ask several LLMs the same question and compare", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay HTTP server
    Serve {
        /// Port to listen on (default: from config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (default: from config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Send a prompt to the selected models
    Ask {
        prompt: String,

        /// Model to ask; repeat for several (default: saved selection)
        #[arg(short, long = "model")]
        models: Vec<String>,

        /// Summarize the answers with this model
        #[arg(long)]
        summarize_with: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Dispatch through a relay server at this URL
        #[arg(long)]
        relay: Option<String>,
    },

    /// List available models
    Models {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Manage provider API keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Toggle models in the saved selection
    Select {
        /// Model ids to toggle
        models: Vec<String>,

        /// Clear the selection first
        #[arg(long)]
        clear: bool,
    },

    /// Show or set the summarization model
    Summarizer {
        model: Option<String>,

        /// Unset the summarization model
        #[arg(long, conflicts_with = "model")]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum KeysAction {
    /// Store a key for a credential group (openai, anthropic, ...)
    Set { group: String, value: String },
    /// Forget the key for a credential group
    Remove { group: String },
    /// Show stored keys, masked
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "polyprompt=debug,tower_http=debug"
    } else {
        "polyprompt=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { port, host } => {
            let config = Config::load()?;
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            let catalog = Arc::new(Catalog::with_overrides(config.catalog.models));
            println!("Relay listening on http://{}:{}", host, port);
            http::run_relay_server(&host, port, catalog).await?;
        }
        Commands::Ask {
            prompt,
            models,
            summarize_with,
            format,
            relay,
        } => {
            cli::run_ask(
                &prompt,
                &models,
                summarize_with.as_deref(),
                format,
                relay.as_deref(),
            )
            .await?;
        }
        Commands::Models { format } => {
            cli::run_models(format)?;
        }
        Commands::Keys { action } => match action {
            KeysAction::Set { group, value } => cli::run_keys_set(&group, &value)?,
            KeysAction::Remove { group } => cli::run_keys_remove(&group)?,
            KeysAction::List => cli::run_keys_list()?,
        },
        Commands::Select { models, clear } => {
            cli::run_select(&models, clear)?;
        }
        Commands::Summarizer { model, clear } => {
            cli::run_summarizer(model.as_deref(), clear)?;
        }
    }

    Ok(())
}

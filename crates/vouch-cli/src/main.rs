//! Vouch — entry point.
//!
//! Compiles proof requests from a presentation definition, validates proof
//! events, and runs them through the decision engine.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::VouchConfig;
use vouch_core::{ConnectionId, ContactId};

/// Vouch presentation-definition evaluation engine
#[derive(Parser, Debug)]
#[command(name = "vouch", version, about = "Vouch presentation-definition evaluation engine")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "vouch.toml")]
    config: PathBuf,

    /// Override the presentation definition path.
    #[arg(long)]
    definition: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config file and exit.
    Init,
    /// Print the outbound proof-request bodies as JSON.
    Compile {
        #[arg(long)]
        connection: String,
        /// Also include the self-attested identity request.
        #[arg(long)]
        identity: bool,
    },
    /// Validate a proof event against every eligible descriptor.
    Validate {
        #[arg(long)]
        proof: PathBuf,
    },
    /// Run a proof event through the decision engine.
    Process {
        #[arg(long)]
        proof: PathBuf,
        /// Contact id; defaults to the event's connection id.
        #[arg(long)]
        contact: Option<String>,
        /// JSON file the result records are read from and written to.
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Send every proof request for a connection and mark them pending.
    Request {
        #[arg(long)]
        connection: String,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        records: Option<PathBuf>,
    },
}

fn init_tracing(config: &VouchConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.json_logs() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration and apply CLI overrides
    let mut config = VouchConfig::load(&args.config)?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(path) = args.definition {
        config.definition.path = path;
    }
    init_tracing(&config);

    match args.command {
        Command::Init => {
            config.save(&args.config)?;
            tracing::info!(path = %args.config.display(), "wrote default config");
        }
        Command::Compile {
            connection,
            identity,
        } => {
            let bodies = commands::compile(&config, &ConnectionId::new(connection), identity)?;
            print_json(&bodies)?;
        }
        Command::Validate { proof } => {
            print_json(&commands::validate_event(&config, &proof)?)?;
        }
        Command::Process {
            proof,
            contact,
            records,
        } => {
            let report = commands::process(
                &config,
                &proof,
                contact.map(ContactId::new),
                records.as_deref(),
            )
            .await?;
            print_json(&report)?;
        }
        Command::Request {
            connection,
            contact,
            records,
        } => {
            let report = commands::request(
                &config,
                ConnectionId::new(connection),
                contact.map(ContactId::new),
                records.as_deref(),
            )
            .await?;
            print_json(&report)?;
        }
    }
    Ok(())
}

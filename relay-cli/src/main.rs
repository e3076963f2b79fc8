//! # relay-cli
//!
//! Scanner and poller roles for scan-relay.
//!
//! ## Commands
//!
//! - `session`: Generate a fresh session key
//! - `submit`: Hand a scanned code to the relay
//! - `pull`: Collect the code for a session (optionally waiting for it)
//! - `lookup`: Resolve a scanned id to a display name
//!
//! ## Example
//!
//! ```bash
//! # Poller: make a session key and share it with the scanner (QR, link...)
//! KEY=$(relay-cli session)
//! relay-cli pull --session "$KEY" --wait
//!
//! # Scanner: submit what was scanned
//! relay-cli submit --session "$KEY" 48291377
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;

use client::RelayClient;
use commands::{lookup, pull, session, submit};

/// Scanner and poller for scan-relay.
#[derive(Parser, Debug)]
#[command(name = "relay-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Relay base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    relay: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a fresh random session key
    Session,

    /// Submit a scanned code
    Submit {
        /// Session key shared with the poller
        #[arg(long, short)]
        session: String,

        /// Scanned code (6-20 digits)
        code: String,
    },

    /// Pull the code for a session
    Pull {
        /// Session key
        #[arg(long, short)]
        session: String,

        /// Read without consuming
        #[arg(long)]
        peek: bool,

        /// Keep polling until a code arrives or the timeout passes
        #[arg(long)]
        wait: bool,

        /// Delay between polls when waiting
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "120")]
        timeout_secs: u64,
    },

    /// Look up the display name for an id
    Lookup {
        /// Scanned id (formatting is ignored)
        code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Session => {
            session::run()?;
        }
        Commands::Submit { session, code } => {
            let client = RelayClient::new(&cli.relay)?;
            submit::run(&client, &session, &code).await?;
        }
        Commands::Pull {
            session,
            peek,
            wait,
            interval_ms,
            timeout_secs,
        } => {
            let client = RelayClient::new(&cli.relay)?;
            let options = pull::PullOptions {
                ack: !peek,
                wait,
                interval: std::time::Duration::from_millis(interval_ms),
                timeout: std::time::Duration::from_secs(timeout_secs),
            };
            pull::run(&client, &session, &options).await?;
        }
        Commands::Lookup { code } => {
            let client = RelayClient::new(&cli.relay)?;
            lookup::run(&client, &code).await?;
        }
    }

    Ok(())
}

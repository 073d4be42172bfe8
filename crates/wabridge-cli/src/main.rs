//! Command-line interface for the wabridge addon client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use wabridge_client::WhatsAppClient;
use wabridge_core::ClientConfig;

/// Talk to a WhatsApp addon from the command line.
#[derive(Parser, Debug)]
#[command(name = "wabridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Base URL of the addon REST API.
    #[arg(long, global = true, default_value = "http://localhost:8066")]
    url: String,

    /// API key for the X-Auth-Token header.
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Session identifier.
    #[arg(long, global = true, default_value = "default")]
    session: String,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Probe addon connectivity.
    Status,
    /// Fetch aggregate statistics.
    Stats,
    /// Show the pairing state and QR payload.
    Qr,
    /// List joined groups.
    Groups,
    /// Send a text message.
    Send {
        /// Recipient: phone number, group id, or full JID.
        #[arg(long)]
        to: String,
        /// Message body.
        message: String,
        /// Message id to quote / reply to.
        #[arg(long)]
        quote: Option<String>,
        /// Extra send attempts on failure.
        #[arg(long, default_value_t = 2)]
        retries: u32,
    },
    /// Poll for inbound events and print them until Ctrl+C.
    Listen {
        /// Poll interval in seconds.
        #[arg(short, long, default_value_t = 5)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let mut config = ClientConfig::new(&args.url).with_session_id(&args.session);
    if let Some(api_key) = &args.api_key {
        config = config.with_api_key(api_key);
    }
    if let Command::Send { retries, .. } = &args.command {
        config = config.with_retry_attempts(*retries);
    }

    let client = WhatsAppClient::new(config);

    match args.command {
        Command::Status => {
            let connected = client.connect().await?;
            println!("connected: {connected}");
        }
        Command::Stats => {
            let stats = client.get_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Qr => {
            let qr = client.get_qr().await?;
            println!("status: {}", qr.status);
            if let Some(code) = qr.qr {
                println!("{code}");
            }
        }
        Command::Groups => {
            for group in client.list_groups().await? {
                println!(
                    "{}\t{}\t{}",
                    group.id,
                    group.name.unwrap_or_default(),
                    group
                        .participants
                        .map(|n| n.to_string())
                        .unwrap_or_default()
                );
            }
        }
        Command::Send {
            to, message, quote, ..
        } => {
            client
                .send_message(&to, &message, quote.as_deref())
                .await?;
            println!("sent");
        }
        Command::Listen { interval } => {
            client.register_callback(Arc::new(|event| {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!(error = %err, "failed to render event"),
                }
            }));
            client.start_polling(Duration::from_secs(interval)).await;
            tracing::info!("listening for events, press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
            client.close().await;
        }
    }

    Ok(())
}

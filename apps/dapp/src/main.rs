use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{SessionEvent, SessionView, WalletProvider, WalletSession};
use futures::StreamExt;
use shared::error::SessionError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "dapp", about = "Store and retrieve a number on the Walee storage contract")]
struct Cli {
    /// Config file (defaults to ./dapp.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the connection status
    Status,
    /// Request account access and switch the wallet to the expected network
    Connect,
    /// Store an unsigned integer in the contract
    Store { value: String },
    /// Read the stored integer
    Retrieve,
    /// Follow wallet events until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    let provider = settings.wallet_provider()?;
    let watcher = provider
        .as_ref()
        .map(|provider| provider.spawn_event_watcher(settings.event_poll_interval()));
    let provider = provider.map(|provider| provider as Arc<dyn WalletProvider>);

    let session = WalletSession::new(provider, settings.session_config()?);
    let event_loop = session.spawn_event_loop();
    session.restore().await;

    let result = run_command(&session, cli.command).await;

    if let Some(handle) = event_loop {
        handle.abort();
    }
    if let Some(handle) = watcher {
        handle.abort();
    }

    result.map_err(|err| anyhow!(err.user_message()))
}

async fn run_command(session: &Arc<WalletSession>, command: Command) -> Result<(), SessionError> {
    match command {
        Command::Status => {
            if !session.is_wallet_available() {
                println!("No wallet provider configured.");
            }
            render(&session.view().await);
        }
        Command::Connect => {
            session.connect().await?;
            render(&session.view().await);
        }
        Command::Store { value } => {
            let receipt = session.store(&value).await?;
            println!("Transaction hash: {}", receipt.transaction_hash);
        }
        Command::Retrieve => {
            let value = session.retrieve().await?;
            println!("Stored Value: {value}");
        }
        Command::Watch => watch(session).await,
    }
    Ok(())
}

async fn watch(session: &Arc<WalletSession>) {
    render(&session.view().await);
    let mut events = BroadcastStream::new(session.subscribe_events());
    info!("watching wallet events, press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = events.next() => match next {
                Some(Ok(event)) => print_event(&event),
                Some(Err(err)) => info!("watch: {err}"),
                None => break,
            },
        }
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::StatusChanged { status, .. } => println!("{status}"),
        SessionEvent::ControlsChanged(controls) => println!(
            "store: {}, retrieve: {}",
            enabled(controls.store_enabled),
            enabled(controls.retrieve_enabled)
        ),
        SessionEvent::TransactionConfirmed(hash) => println!("Transaction hash: {hash}"),
        SessionEvent::ValueRetrieved(value) => println!("Stored Value: {value}"),
        SessionEvent::Error(report) => eprintln!("{}", report.message),
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

fn render(view: &SessionView) {
    println!("{}", view.status);
    println!(
        "store: {}, retrieve: {}",
        enabled(view.controls.store_enabled),
        enabled(view.controls.retrieve_enabled)
    );
    if let Some(hash) = &view.last_transaction {
        println!("Transaction hash: {hash}");
    }
    if let Some(value) = &view.last_value {
        println!("Stored Value: {value}");
    }
    if let Some(report) = &view.last_error {
        eprintln!("{}", report.message);
    }
}

//! Credit Chat - Entry Point
//!
//! Starts the ChatSession actor and drives it from stdin/stdout.

use std::env;
use std::path::PathBuf;

use tokio::io::{stdin, stdout, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use credit_chat::{run_console, ChatSession, Config, FileKeyValueStore, Stores};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they don't interleave with the console on stdout
    // e.g., RUST_LOG=debug or RUST_LOG=credit_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("credit_chat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::from_env();

    // State file from command line overrides the environment
    if let Some(path) = env::args().nth(1) {
        config.state_file = PathBuf::from(path);
    }

    let login_store = FileKeyValueStore::open(&config.state_file)?;
    info!("Login state in {:?}", login_store.path());

    let (event_tx, event_rx) = mpsc::channel(config.channel_buffer);
    let stores = Stores::seeded(Box::new(login_store));
    let (cmd_tx, session) = ChatSession::new(config, stores, event_tx);
    let session = tokio::spawn(session.run());

    info!("ChatSession actor started");

    let mut out = stdout();
    if let Err(e) = run_console(BufReader::new(stdin()), &mut out, cmd_tx, event_rx).await {
        error!("Console error: {}", e);
    }

    // Console dropped its sender; the session drains and stops
    session.await?;
    info!("Bye");

    // The blocking stdin reader would otherwise hold up runtime shutdown
    // until another line is entered
    std::process::exit(0)
}

//! Interactive WhatsApp pairing against an Evolution API gateway.
//!
//! Demonstrates:
//! - Building a Gateway from environment variables
//! - Running a coordinator for a new or existing session
//! - Refreshing an expired pairing code
//!
//! Environment:
//!   EVOLUTION_API_URL     REST base URL (required)
//!   EVOLUTION_EVENTS_URL  WebSocket base URL (optional)
//!   EVOLUTION_API_KEY     gateway key (optional)
//!
//! Usage:
//!   cargo run --example pair
//!   cargo run --example pair -- --session my-instance
//!   cargo run --example pair -- --debug

// ============================================================================
// Imports
// ============================================================================

use anyhow::{Context, Result};
use evolution_pairing::{ConnectionStatus, Coordinator, GatewayBuilder, StatusChange};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    session: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let session = args
            .iter()
            .position(|a| a == "--session")
            .and_then(|i| args.get(i + 1))
            .cloned();

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            session,
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Evolution Pairing ===\n");

    let gateway = GatewayBuilder::from_env()
        .build()
        .context("invalid gateway configuration")?;
    println!("[1] Gateway: {}", gateway.base_url());

    let (change_tx, mut change_rx) = mpsc::unbounded_channel::<StatusChange>();
    let builder = Coordinator::builder()
        .gateway(&gateway)
        .on_status_change(move |change| {
            let _ = change_tx.send(change);
        })
        .on_connected(|| println!("    ✓ Device linked"));

    let coordinator = match args.session {
        Some(session) => {
            println!("[2] Attaching to session {session}...\n");
            builder
                .from_existing_session(session.as_str())
                .with_context(|| format!("cannot attach to session {session:?}"))?
        }
        None => {
            println!("[2] Creating a new session...\n");
            builder
                .from_new_session()
                .context("cannot start a new session")?
        }
    };

    // ========================================================================
    // Status Loop
    // ========================================================================

    loop {
        let change = tokio::select! {
            change = change_rx.recv() => change,
            _ = tokio::signal::ctrl_c() => {
                println!("\n[Exit] Interrupted");
                break;
            }
        };
        let Some(change) = change else {
            break;
        };

        println!("[Status] {}", change.status);
        if let Some(payload) = &change.payload {
            if payload.is_image() {
                println!("    Open this image and scan it with WhatsApp > Linked devices:");
            } else {
                println!("    Render this as a QR code and scan it with WhatsApp > Linked devices:");
            }
            println!("    {payload}\n");
        }
        if let Some(message) = change.error_message() {
            println!("    {message}");
        }

        match change.status {
            ConnectionStatus::Connected => break,
            ConnectionStatus::TimedOut => {
                println!("    Requesting a new code...");
                coordinator.refresh().await;
            }
            ConnectionStatus::InstanceError | ConnectionStatus::TransportError => break,
            _ => {}
        }
    }

    if let Some(session_id) = coordinator.session_id() {
        println!("\n[Done] Session: {session_id}");
    }
    coordinator.dispose();

    Ok(())
}

// ============================================================================
// Functions
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "evolution_pairing=debug"
    } else {
        "evolution_pairing=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

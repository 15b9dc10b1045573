//! Evolution Pairing - WhatsApp session pairing over the Evolution API.
//!
//! This library drives the "link a device" flow against an Evolution API
//! gateway: it provisions a session, fetches the scannable pairing payload,
//! listens for lifecycle events, and reports one linear status stream to a
//! host UI.
//!
//! # Architecture
//!
//! The flow is split into three collaborators and one coordinator:
//!
//! - **Provisioner (REST)**: creates a session, returns its identifier
//! - **Fetcher (REST)**: returns a fresh pairing payload for a session
//! - **Listener (WebSocket)**: pushes connected / timeout / error events
//! - **Coordinator**: serializes every input through one event loop
//!
//! Key design principles:
//!
//! - The coordinator only talks to the collaborators through traits
//! - Every transition produces exactly one [`StatusChange`]
//! - `Connected` is absorbing and reported once
//! - Nothing is observed after [`Coordinator::dispose`]
//!
//! # Quick Start
//!
//! ```no_run
//! use evolution_pairing::{ConnectionStatus, Coordinator, GatewayBuilder, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Reads EVOLUTION_API_URL, EVOLUTION_EVENTS_URL, EVOLUTION_API_KEY
//!     let gateway = GatewayBuilder::from_env().build()?;
//!
//!     let coordinator = Coordinator::builder()
//!         .gateway(&gateway)
//!         .on_status_change(|change| {
//!             if let Some(payload) = &change.payload {
//!                 println!("Scan this: {payload}");
//!             }
//!             if let Some(message) = change.error_message() {
//!                 eprintln!("{}: {message}", change.status);
//!             }
//!         })
//!         .on_connected(|| println!("Device linked"))
//!         .from_new_session()?;
//!
//!     // A "try again" button:
//!     if coordinator.status() == ConnectionStatus::TimedOut {
//!         coordinator.refresh().await;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`coordinator`] | State machine: [`Coordinator`], [`StatusChange`] |
//! | [`gateway`] | REST client, provisioner and fetcher contracts |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`payload`] | Scannable pairing payload |
//! | [`protocol`] | Gateway wire types (internal) |
//! | [`transport`] | WebSocket event listener |

// ============================================================================
// Modules
// ============================================================================

/// Pairing flow coordination.
///
/// Use [`Coordinator::builder()`] to wire collaborators and callbacks.
pub mod coordinator;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Evolution API REST client.
///
/// Use [`Gateway::builder()`] to configure base URL, key and timeouts.
pub mod gateway;

/// Type-safe identifiers for sessions and subscriptions.
pub mod identifiers;

/// Scannable pairing payload.
pub mod payload;

/// Gateway wire types.
///
/// Internal module defining REST bodies and event frames.
pub mod protocol;

/// Live event transport.
///
/// Listener contract and its WebSocket implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Coordinator types
pub use coordinator::{
    ConnectionStatus, Coordinator, CoordinatorBuilder, Failure, FailureKind, StatusChange,
};

// Error types
pub use error::{Error, Result};

// Gateway types
pub use gateway::{Gateway, GatewayBuilder, PairingCodeFetcher, SessionProvisioner};

// Identifier types
pub use identifiers::{SessionId, SubscriptionId};

// Payload
pub use payload::PairingPayload;

// Transport types
pub use transport::{EventListener, EventSink, LifecycleEvent, Subscription, WsListener};

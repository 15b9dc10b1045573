//! Live event transport.
//!
//! This module relays asynchronous lifecycle events for one session from the
//! gateway to the coordinator.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Coordinator    │                              │  Evolution API  │
//! │                 │         WebSocket            │  gateway        │
//! │  EventSink      │◄─────────────────────────────│                 │
//! │  ← WsListener   │   /sessions/{id}/events      │  event relay    │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Subscription Lifecycle
//!
//! 1. Coordinator creates an [`EventSink`] wired to its command queue
//! 2. [`EventListener::subscribe`] opens the channel and spawns the event loop
//! 3. Frames are normalized to [`LifecycleEvent`]s and emitted into the sink
//! 4. [`Subscription::unsubscribe`] closes the sink, then stops the event loop
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket listener and event loop |
//! | `listener` | Listener contract, sink and subscription handle |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket listener and event loop.
pub mod connection;

/// Listener contract.
pub mod listener;

/// Local relay for listener tests.
#[cfg(test)]
pub(crate) mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{DEFAULT_CONNECT_TIMEOUT, WsListener};
pub use listener::{EventHandler, EventListener, EventSink, Subscription};

pub use crate::protocol::LifecycleEvent;

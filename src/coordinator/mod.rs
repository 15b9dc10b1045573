//! Pairing flow coordination.
//!
//! The [`Coordinator`] turns the three collaborators into one linear status
//! stream for a pairing UI.
//!
//! # Status Flow
//!
//! ```text
//!           ┌──────────────┐   ┌──────────────┐   ┌────────────────┐   ┌───────────┐
//!  new ───► │ Provisioning │──►│ FetchingCode │──►│ WaitingForScan │──►│ Connected │
//!           └──────┬───────┘   └──────┬───────┘   └───────┬────────┘   └───────────┘
//!                  │                  │                   │
//!                  ▼                  ▼                   ▼
//!           ┌───────────────────────────────────────────────────┐
//!           │     InstanceError / TransportError / TimedOut     │
//!           └─────────────────────────┬─────────────────────────┘
//!                                     │ refresh()
//!                                     ▼
//!                               FetchingCode
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Coordinator, builder and event loop.
pub mod core;

/// Status snapshot types.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{ConnectedHandler, Coordinator, CoordinatorBuilder, StatusHandler};
pub use status::{ConnectionStatus, Failure, FailureKind, StatusChange};

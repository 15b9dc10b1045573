//! Gateway wire types.
//!
//! This module defines the message shapes exchanged with the Evolution API
//! gateway.
//!
//! # Protocol Overview
//!
//! | Message | Channel | Direction | Purpose |
//! |---------|---------|-----------|---------|
//! | `CreateSessionResponse` | REST | Gateway → Local | New session identifier |
//! | `PairingCodeResponse` | REST | Gateway → Local | Scannable payload |
//! | `ErrorResponse` | REST | Gateway → Local | Failure detail |
//! | `Event` | WebSocket | Gateway → Local | Instance lifecycle notification |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Event frames and lifecycle normalization |
//! | `response` | REST response bodies |

// ============================================================================
// Submodules
// ============================================================================

/// Event frames and lifecycle normalization.
pub mod event;

/// REST response bodies.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{ConnectionState, Event, LifecycleEvent, ParsedEvent};
pub use response::{CreateSessionResponse, ErrorResponse, PairingCodeResponse};

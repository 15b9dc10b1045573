//! Error types for the pairing coordinator.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Collaborator calls return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use evolution_pairing::{Result, SessionId};
//!
//! async fn example(gateway: &Gateway) -> Result<()> {
//!     let session_id = gateway.create_session().await?;
//!     let payload = gateway.fetch_pairing_code(&session_id).await?;
//!     println!("scan: {payload}");
//!     Ok(())
//! }
//! ```
//!
//! The [`Coordinator`](crate::Coordinator) never returns these errors from its
//! actions. It converts them into status transitions instead.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Session | [`Error::InvalidSession`], [`Error::ProvisioningFailed`], [`Error::FetchFailed`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`] |
//! | External | [`Error::Http`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when gateway or coordinator configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Session identifier is empty or otherwise unusable.
    #[error("Invalid session identifier: {message}")]
    InvalidSession {
        /// Description of what is wrong with the identifier.
        message: String,
    },

    /// Remote session could not be created.
    ///
    /// Returned when the create call fails or the response has no identifier.
    #[error("Provisioning failed: {}", .detail.as_deref().unwrap_or("no detail"))]
    ProvisioningFailed {
        /// Human-readable detail, if the gateway gave one.
        detail: Option<String>,
    },

    /// Pairing code could not be fetched.
    ///
    /// Transport failures, non-success statuses and empty payloads all map here.
    #[error("Pairing code fetch failed: {}", .detail.as_deref().unwrap_or("no detail"))]
    FetchFailed {
        /// Human-readable detail, if any.
        detail: Option<String>,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Event channel connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Event channel handshake did not finish in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid session error.
    #[inline]
    pub fn invalid_session(message: impl Into<String>) -> Self {
        Self::InvalidSession {
            message: message.into(),
        }
    }

    /// Creates a provisioning error with a detail message.
    #[inline]
    pub fn provisioning_failed(detail: impl Into<String>) -> Self {
        Self::ProvisioningFailed {
            detail: Some(detail.into()),
        }
    }

    /// Creates a fetch error with a detail message.
    #[inline]
    pub fn fetch_failed(detail: impl Into<String>) -> Self {
        Self::FetchFailed {
            detail: Some(detail.into()),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Accessors
// ============================================================================

impl Error {
    /// Returns the human-readable detail carried by this error.
    ///
    /// Session errors return their optional detail; every other variant
    /// returns its display string.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::ProvisioningFailed { detail } | Self::FetchFailed { detail } => detail.clone(),
            other => Some(other.to_string()),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is a session-level failure.
    #[inline]
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSession { .. } | Self::ProvisioningFailed { .. } | Self::FetchFailed { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed when the caller retries.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProvisioningFailed { .. }
                | Self::FetchFailed { .. }
                | Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::Http(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

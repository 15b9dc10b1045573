//! Status surface of the coordinator.
//!
//! Every transition produces one [`StatusChange`]: the new
//! [`ConnectionStatus`], the current payload, and a [`Failure`] when the
//! status is a failure state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Error;
use crate::payload::PairingPayload;

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Current phase of a pairing flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// Constructed, not started.
    Idle,
    /// Creating a new remote session.
    Provisioning,
    /// Requesting a pairing payload.
    FetchingCode,
    /// Payload displayed, waiting for the phone.
    WaitingForScan,
    /// Session authorized. Absorbing.
    Connected,
    /// Scan window elapsed.
    TimedOut,
    /// Provisioning, fetching, or the remote session failed.
    InstanceError,
    /// Event channel lost.
    TransportError,
}

impl ConnectionStatus {
    /// Returns `true` for `Connected`.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` for the states only [`refresh`](crate::Coordinator::refresh) leaves.
    #[inline]
    #[must_use]
    pub const fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            Self::TimedOut | Self::InstanceError | Self::TransportError
        )
    }

    /// Returns `true` for `Connected` and the terminal-failure states.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.is_connected() || self.is_terminal_failure()
    }

    /// Returns `true` while the flow is still making progress.
    #[inline]
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(
            self,
            Self::Provisioning | Self::FetchingCode | Self::WaitingForScan
        )
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Provisioning => "provisioning",
            Self::FetchingCode => "fetching code",
            Self::WaitingForScan => "waiting for scan",
            Self::Connected => "connected",
            Self::TimedOut => "timed out",
            Self::InstanceError => "instance error",
            Self::TransportError => "transport error",
        };
        f.write_str(name)
    }
}

// ============================================================================
// FailureKind
// ============================================================================

/// Category of a failure reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Session could not be created.
    ProvisioningFailed,
    /// Payload could not be fetched.
    FetchFailed,
    /// Remote session reported a problem.
    InstanceError,
    /// Event channel unreachable.
    TransportError,
    /// Scan window elapsed.
    Timeout,
}

impl FailureKind {
    /// Returns `false` for [`Timeout`](Self::Timeout), which reads as "try
    /// again" rather than as an error.
    #[inline]
    #[must_use]
    pub const fn is_error(self) -> bool {
        !matches!(self, Self::Timeout)
    }

    /// Generic message shown when a failure has no detail.
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::ProvisioningFailed => "Could not create the WhatsApp session.",
            Self::FetchFailed => "Could not load the pairing code.",
            Self::InstanceError => "The WhatsApp session reported a problem.",
            Self::TransportError => "Lost connection to the pairing relay.",
            Self::Timeout => "The pairing code expired. Please try again.",
        }
    }
}

// ============================================================================
// Failure
// ============================================================================

/// A failure with optional human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Failure category.
    pub kind: FailureKind,
    /// Detail from the collaborator, if any.
    pub detail: Option<String>,
}

impl Failure {
    /// Creates a failure.
    #[inline]
    #[must_use]
    pub fn new(kind: FailureKind, detail: Option<String>) -> Self {
        Self { kind, detail }
    }

    /// Converts a provisioning error.
    #[must_use]
    pub fn provisioning(err: &Error) -> Self {
        Self::new(FailureKind::ProvisioningFailed, err.detail())
    }

    /// Converts a fetch error.
    #[must_use]
    pub fn fetch(err: &Error) -> Self {
        Self::new(FailureKind::FetchFailed, err.detail())
    }

    /// Returns the detail, or the kind's fallback message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.detail
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| self.kind.fallback_message())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// ============================================================================
// StatusChange
// ============================================================================

/// Immutable snapshot emitted on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// New status.
    pub status: ConnectionStatus,
    /// Payload to display; only set in `WaitingForScan`.
    pub payload: Option<PairingPayload>,
    /// Failure, set in failure states.
    pub failure: Option<Failure>,
}

impl StatusChange {
    /// Initial snapshot.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            payload: None,
            failure: None,
        }
    }

    /// Returns the failure message, if any.
    #[inline]
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(Failure::message)
    }
}

impl Default for StatusChange {
    fn default() -> Self {
        Self::idle()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Event frames from the gateway's live channel.
//!
//! The gateway pushes one JSON frame per lifecycle change of an instance.
//! Frames are parsed into [`ParsedEvent`] and then normalized to the four
//! [`LifecycleEvent`] kinds the coordinator understands.
//!
//! # Event Types
//!
//! | Frame `event` | Parsed as | Lifecycle |
//! |---------------|-----------|-----------|
//! | `connection.update` | [`ParsedEvent::ConnectionUpdate`] | `open` → connected, `close` → instance error |
//! | `qrcode.updated` | [`ParsedEvent::QrCodeUpdated`] | none |
//! | `qrcode.timeout`, `qrcode.limit`, `timeout` | [`ParsedEvent::QrCodeTimeout`] | timed out |
//! | `instance.error`, `error` | [`ParsedEvent::InstanceError`] | instance error |
//! | `logout.instance`, `remove.instance` | [`ParsedEvent::InstanceClosed`] | instance error |
//! | `connected` | [`ParsedEvent::Connected`] | connected |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Event
// ============================================================================

/// A raw event frame from the gateway.
///
/// # Format
///
/// ```json
/// {
///   "event": "connection.update",
///   "instance": "sales-01",
///   "data": { "state": "open", "statusReason": 200 }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `module.eventName` format.
    pub event: String,

    /// Instance (session) the event belongs to, when the gateway says so.
    #[serde(default)]
    pub instance: Option<String>,

    /// Event-specific data.
    #[serde(default)]
    pub data: Value,
}

impl Event {
    /// Returns `true` if this frame concerns `session`.
    ///
    /// Frames without an `instance` field are assumed to belong to the
    /// channel they arrived on.
    #[inline]
    #[must_use]
    pub fn is_for(&self, session: &str) -> bool {
        self.instance.as_deref().is_none_or(|name| name == session)
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.event.as_str() {
            "connection.update" => ParsedEvent::ConnectionUpdate {
                state: ConnectionState::from(self.get_string("state").as_str()),
                status_reason: self.get_optional_u64("statusReason"),
            },

            "qrcode.updated" => ParsedEvent::QrCodeUpdated,

            "qrcode.timeout" | "qrcode.limit" | "timeout" => ParsedEvent::QrCodeTimeout,

            "instance.error" | "error" => ParsedEvent::InstanceError {
                message: self.message(),
            },

            "logout.instance" | "remove.instance" => ParsedEvent::InstanceClosed {
                event: self.event.clone(),
                message: self.message(),
            },

            "connected" => ParsedEvent::Connected,

            _ => ParsedEvent::Unknown {
                event: self.event.clone(),
                data: self.data.clone(),
            },
        }
    }

    /// Gets a string from data.
    #[inline]
    fn get_string(&self, key: &str) -> String {
        self.get_optional_string(key).unwrap_or_default()
    }

    /// Gets an optional string from data.
    #[inline]
    fn get_optional_string(&self, key: &str) -> Option<String> {
        self.data
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Gets an optional u64 from data.
    #[inline]
    fn get_optional_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(|v| v.as_u64())
    }

    /// Human-readable message from `data.message`, `data.error` or a bare string.
    fn message(&self) -> Option<String> {
        self.get_optional_string("message")
            .or_else(|| self.get_optional_string("error"))
            .or_else(|| self.data.as_str().map(str::to_string))
            .filter(|m| !m.is_empty())
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Instance state reported by `connection.update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Session is authorized and live.
    Open,
    /// Gateway is still negotiating.
    Connecting,
    /// Session was closed by the remote side.
    Close,
    /// Any other value.
    Other(String),
}

impl From<&str> for ConnectionState {
    fn from(value: &str) -> Self {
        match value {
            "open" => Self::Open,
            "connecting" => Self::Connecting,
            "close" => Self::Close,
            other => Self::Other(other.to_string()),
        }
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    /// Instance connection state changed.
    ConnectionUpdate {
        /// New state.
        state: ConnectionState,
        /// Numeric reason code (WhatsApp disconnect reason).
        status_reason: Option<u64>,
    },

    /// Gateway rotated the QR code on its side.
    QrCodeUpdated,

    /// Scan window elapsed.
    QrCodeTimeout,

    /// Instance reported an error.
    InstanceError {
        /// Error message.
        message: Option<String>,
    },

    /// Instance was logged out or removed.
    InstanceClosed {
        /// Original event name.
        event: String,
        /// Optional message.
        message: Option<String>,
    },

    /// Shorthand connected notification.
    Connected,

    /// Unknown event type.
    Unknown {
        /// Event name.
        event: String,
        /// Event data.
        data: Value,
    },
}

impl ParsedEvent {
    /// Normalizes this event into a lifecycle event.
    ///
    /// Returns `None` for events that do not move the pairing flow.
    #[must_use]
    pub fn into_lifecycle(self) -> Option<LifecycleEvent> {
        match self {
            Self::ConnectionUpdate { state, status_reason } => match state {
                ConnectionState::Open => Some(LifecycleEvent::Connected),
                ConnectionState::Close => Some(LifecycleEvent::InstanceError {
                    detail: Some(match status_reason {
                        Some(code) => format!("connection closed (reason {code})"),
                        None => "connection closed".to_string(),
                    }),
                }),
                ConnectionState::Connecting | ConnectionState::Other(_) => None,
            },
            Self::QrCodeTimeout => Some(LifecycleEvent::TimedOut),
            Self::InstanceError { message } => {
                Some(LifecycleEvent::InstanceError { detail: message })
            }
            Self::InstanceClosed { event, message } => Some(LifecycleEvent::InstanceError {
                detail: message.or(Some(event)),
            }),
            Self::Connected => Some(LifecycleEvent::Connected),
            Self::QrCodeUpdated | Self::Unknown { .. } => None,
        }
    }
}

// ============================================================================
// LifecycleEvent
// ============================================================================

/// Normalized lifecycle event delivered to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Session is connected. May repeat.
    Connected,
    /// Scan window elapsed.
    TimedOut,
    /// Remote session reported a problem.
    InstanceError {
        /// Optional detail.
        detail: Option<String>,
    },
    /// Event channel lost; no further events can arrive.
    TransportError {
        /// Optional detail.
        detail: Option<String>,
    },
}

// ============================================================================
// Tests
// ============================================================================

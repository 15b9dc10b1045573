//! REST response bodies.
//!
//! | Endpoint | Body |
//! |----------|------|
//! | `POST /sessions` | [`CreateSessionResponse`] |
//! | `GET /sessions/{id}/code` | [`PairingCodeResponse`] |
//! | any non-success status | [`ErrorResponse`] |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::payload::PairingPayload;

// ============================================================================
// CreateSessionResponse
// ============================================================================

/// Body of a successful session creation.
///
/// ```json
/// { "id": "sales-01" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    /// Assigned session identifier.
    #[serde(default)]
    pub id: Option<String>,
}

impl CreateSessionResponse {
    /// Extracts the session identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProvisioningFailed`] if `id` is missing or empty.
    pub fn into_session_id(self) -> Result<SessionId> {
        self.id
            .and_then(|id| SessionId::new(id).ok())
            .ok_or_else(|| Error::provisioning_failed("response is missing the session id"))
    }
}

// ============================================================================
// PairingCodeResponse
// ============================================================================

/// Body of a successful pairing code fetch.
///
/// ```json
/// { "payload": "2@Xk...==" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PairingCodeResponse {
    /// Scannable payload.
    #[serde(default)]
    pub payload: Option<String>,
}

impl PairingCodeResponse {
    /// Extracts the pairing payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] if `payload` is missing or empty.
    pub fn into_payload(self) -> Result<PairingPayload> {
        match self.payload {
            Some(payload) => PairingPayload::new(payload),
            None => Err(Error::fetch_failed("response is missing the pairing payload")),
        }
    }
}

// ============================================================================
// ErrorResponse
// ============================================================================

/// Error body returned with non-success statuses.
///
/// The gateway is inconsistent here, so every field is optional and
/// `response.message` may be a string or a list of strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    /// Top-level error text.
    #[serde(default)]
    pub error: Option<String>,

    /// Top-level message.
    #[serde(default)]
    pub message: Option<String>,

    /// Nested response object.
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Best human-readable message in the body.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        let nested = self
            .response
            .as_ref()
            .and_then(|r| r.get("message"))
            .and_then(|m| match m {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Array(items) => {
                    let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                    (!parts.is_empty()).then(|| parts.join("; "))
                }
                _ => None,
            });

        nested
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
            .filter(|m| !m.is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Session provisioning.
//!
//! Creates a new remote pairing session and returns its identifier.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::CreateSessionResponse;

use super::client::Gateway;

// ============================================================================
// SessionProvisioner
// ============================================================================

/// Creates remote pairing sessions.
#[async_trait]
pub trait SessionProvisioner: Send + Sync {
    /// Creates a new session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProvisioningFailed`] if the call fails or the
    /// response carries no identifier.
    async fn create_session(&self) -> Result<SessionId>;
}

// ============================================================================
// Gateway Implementation
// ============================================================================

#[async_trait]
impl SessionProvisioner for Gateway {
    async fn create_session(&self) -> Result<SessionId> {
        let url = self
            .endpoint("sessions")
            .map_err(|e| Error::ProvisioningFailed { detail: e.detail() })?;

        debug!(%url, "Creating session");

        let response = self
            .request(Method::POST, url)
            .send()
            .await
            .map_err(|e| Error::provisioning_failed(e.to_string()))?;

        if !response.status().is_success() {
            let detail = Self::describe_failure(response).await;
            warn!(%detail, "Session creation rejected");
            return Err(Error::provisioning_failed(detail));
        }

        let body: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| Error::provisioning_failed(format!("invalid response body: {e}")))?;

        let session_id = body.into_session_id()?;
        info!(session_id = %session_id, "Session provisioned");

        Ok(session_id)
    }
}

// ============================================================================
// Tests
// ============================================================================

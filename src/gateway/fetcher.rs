//! Pairing code retrieval.
//!
//! Every call asks the gateway for a fresh payload; the newest one wins.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::payload::PairingPayload;
use crate::protocol::PairingCodeResponse;

use super::client::Gateway;

// ============================================================================
// PairingCodeFetcher
// ============================================================================

/// Fetches scannable pairing payloads.
#[async_trait]
pub trait PairingCodeFetcher: Send + Sync {
    /// Requests a fresh payload for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] on transport failure, non-success
    /// status, or an empty/missing payload.
    async fn fetch_pairing_code(&self, session_id: &SessionId) -> Result<PairingPayload>;
}

// ============================================================================
// Gateway Implementation
// ============================================================================

#[async_trait]
impl PairingCodeFetcher for Gateway {
    async fn fetch_pairing_code(&self, session_id: &SessionId) -> Result<PairingPayload> {
        let path = format!(
            "sessions/{}/code",
            urlencoding::encode(session_id.as_str())
        );
        let url = self
            .endpoint(&path)
            .map_err(|e| Error::FetchFailed { detail: e.detail() })?;

        debug!(session_id = %session_id, %url, "Fetching pairing code");

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| Error::fetch_failed(e.to_string()))?;

        if !response.status().is_success() {
            let detail = Self::describe_failure(response).await;
            warn!(session_id = %session_id, %detail, "Pairing code fetch rejected");
            return Err(Error::fetch_failed(detail));
        }

        let body: PairingCodeResponse = response
            .json()
            .await
            .map_err(|e| Error::fetch_failed(format!("invalid response body: {e}")))?;

        body.into_payload()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use mockito::Server;
    use tokio_test::assert_err;

    fn gateway(url: String) -> Gateway {
        Gateway::builder().base_url(url).build().expect("gateway")
    }

    #[tokio::test]
    async fn test_fetch_returns_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/sessions/abc/code")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"payload": "2@P1"}"#)
            .create_async()
            .await;

        let id = SessionId::new("abc").expect("id");
        let payload = gateway(server.url())
            .fetch_pairing_code(&id)
            .await
            .expect("payload");

        mock.assert_async().await;
        assert_eq!(payload.as_str(), "2@P1");
    }

    #[tokio::test]
    async fn test_session_id_is_path_encoded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/sessions/sales%20team/code")
            .with_status(200)
            .with_body(r#"{"payload": "2@P1"}"#)
            .create_async()
            .await;

        let id = SessionId::new("sales team").expect("id");
        gateway(server.url())
            .fetch_pairing_code(&id)
            .await
            .expect("payload");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failures_are_undifferentiated() {
        let mut server = Server::new_async().await;
        let _not_found = server
            .mock("GET", "/sessions/gone/code")
            .with_status(404)
            .with_body("instance not found")
            .create_async()
            .await;
        let _empty = server
            .mock("GET", "/sessions/empty/code")
            .with_status(200)
            .with_body(r#"{"payload": ""}"#)
            .create_async()
            .await;

        let gateway = gateway(server.url());

        let gone = SessionId::new("gone").expect("id");
        let err = assert_err!(gateway.fetch_pairing_code(&gone).await);
        assert!(matches!(err, Error::FetchFailed { .. }));
        assert!(err.to_string().contains("instance not found"));

        let empty = SessionId::new("empty").expect("id");
        let err = assert_err!(gateway.fetch_pairing_code(&empty).await);
        assert!(matches!(err, Error::FetchFailed { .. }));
    }
}

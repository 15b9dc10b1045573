//! Evolution API gateway client.
//!
//! [`Gateway`] owns the HTTP client and the endpoint configuration. It
//! implements [`SessionProvisioner`](super::SessionProvisioner) and
//! [`PairingCodeFetcher`](super::PairingCodeFetcher), and hands out
//! [`WsListener`]s for the event channel.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use url::Url;

use crate::error::Result;
use crate::protocol::ErrorResponse;
use crate::transport::WsListener;
use crate::transport::connection::API_KEY_HEADER;

use super::builder::GatewayBuilder;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the gateway.
struct GatewayInner {
    /// HTTP client (connection pool).
    http: Client,
    /// REST base URL, ending in `/`.
    base_url: Url,
    /// Event channel base URL, ending in `/`.
    events_url: Url,
    /// API key.
    api_key: Option<String>,
    /// WebSocket handshake timeout.
    connect_timeout: Duration,
}

// ============================================================================
// Gateway
// ============================================================================

/// Client for one Evolution API gateway.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.base_url.as_str())
            .field("events_url", &self.inner.events_url.as_str())
            .field("api_key", &self.inner.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Creates a configuration builder for the gateway.
    #[inline]
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Creates a gateway from validated configuration.
    pub(crate) fn new(
        base_url: Url,
        events_url: Url,
        api_key: Option<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url,
                events_url,
                api_key,
                connect_timeout,
            }),
        })
    }

    /// Returns the REST base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Returns the configured API key.
    #[inline]
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.inner.api_key.as_deref()
    }

    /// Creates a listener for this gateway's event channel.
    #[must_use]
    pub fn listener(&self) -> WsListener {
        let listener = WsListener::new(self.inner.events_url.clone())
            .with_connect_timeout(self.inner.connect_timeout);

        match self.inner.api_key {
            Some(ref key) => listener.with_api_key(key.clone()),
            None => listener,
        }
    }

    /// Resolves a path relative to the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Starts a request with the API key attached.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.inner.http.request(method, url);
        match self.inner.api_key {
            Some(ref key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Describes a non-success response for error details.
    pub(crate) async fn describe_failure(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.message())
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            });

        match message {
            Some(message) => format!("HTTP {status}: {message}"),
            None => format!("HTTP {status}"),
        }
    }
}

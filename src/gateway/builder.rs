//! Builder pattern for gateway configuration.
//!
//! Provides a fluent API for configuring and creating [`Gateway`] instances.
//!
//! # Example
//!
//! ```no_run
//! use evolution_pairing::Gateway;
//!
//! # fn example() -> evolution_pairing::Result<()> {
//! let gateway = Gateway::builder()
//!     .base_url("https://evolution.example.com")
//!     .api_key("B6D711FCDE4D4FD5936544120E713976")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::DEFAULT_CONNECT_TIMEOUT;

use super::client::Gateway;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for REST calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the REST base URL.
pub const ENV_BASE_URL: &str = "EVOLUTION_API_URL";

/// Environment variable holding the event channel base URL.
pub const ENV_EVENTS_URL: &str = "EVOLUTION_EVENTS_URL";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "EVOLUTION_API_KEY";

// ============================================================================
// GatewayBuilder
// ============================================================================

/// Builder for configuring a [`Gateway`] instance.
///
/// Use [`Gateway::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct GatewayBuilder {
    /// REST base URL.
    base_url: Option<String>,
    /// Event channel base URL.
    events_url: Option<String>,
    /// API key.
    api_key: Option<String>,
    /// REST call timeout.
    request_timeout: Duration,
    /// WebSocket handshake timeout.
    connect_timeout: Duration,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            events_url: None,
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// ============================================================================
// GatewayBuilder Implementation
// ============================================================================

impl GatewayBuilder {
    /// Creates a new builder with default timeouts and no URLs.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from `EVOLUTION_API_URL`, `EVOLUTION_EVENTS_URL`
    /// and `EVOLUTION_API_KEY`.
    ///
    /// Unset variables are left unconfigured; [`build`](Self::build) reports
    /// what is missing.
    #[must_use]
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        builder.base_url = env::var(ENV_BASE_URL).ok();
        builder.events_url = env::var(ENV_EVENTS_URL).ok();
        builder.api_key = env::var(ENV_API_KEY).ok();
        builder
    }

    /// Sets the REST base URL (e.g. `https://evolution.example.com`).
    #[inline]
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the event channel base URL.
    ///
    /// Defaults to the base URL with `http` → `ws` and `https` → `wss`.
    #[inline]
    #[must_use]
    pub fn events_url(mut self, url: impl Into<String>) -> Self {
        self.events_url = Some(url.into());
        self
    }

    /// Sets the API key sent as the `apikey` header.
    #[inline]
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the REST call timeout.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the gateway with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the base URL is missing or not http(s)
    /// - [`Error::Config`] if the events URL is not ws(s)
    /// - [`Error::Config`] if a timeout is zero
    /// - [`Error::Http`] if the HTTP client cannot be created
    pub fn build(self) -> Result<Gateway> {
        let base_url = self.validate_base_url()?;
        let events_url = self.validate_events_url(&base_url)?;
        self.validate_timeouts()?;

        let api_key = self.api_key.filter(|key| !key.trim().is_empty());

        Gateway::new(
            base_url,
            events_url,
            api_key,
            self.request_timeout,
            self.connect_timeout,
        )
    }
}

// ============================================================================
// Validation
// ============================================================================

impl GatewayBuilder {
    /// Validates the REST base URL.
    fn validate_base_url(&self) -> Result<Url> {
        let raw = self.base_url.as_deref().ok_or_else(|| {
            Error::config(format!(
                "Gateway base URL is required. Use .base_url() or set {ENV_BASE_URL}.\n\
                 Example: Gateway::builder().base_url(\"https://evolution.example.com\")"
            ))
        })?;

        let url = Url::parse(raw.trim())
            .map_err(|e| Error::config(format!("Invalid gateway base URL {raw:?}: {e}")))?;

        match url.scheme() {
            "http" | "https" => Ok(with_trailing_slash(url)),
            scheme => Err(Error::config(format!(
                "Gateway base URL must use http or https, got {scheme:?}"
            ))),
        }
    }

    /// Validates or derives the event channel URL.
    fn validate_events_url(&self, base_url: &Url) -> Result<Url> {
        let Some(raw) = self.events_url.as_deref() else {
            return derive_events_url(base_url);
        };

        let url = Url::parse(raw.trim())
            .map_err(|e| Error::config(format!("Invalid events URL {raw:?}: {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(with_trailing_slash(url)),
            scheme => Err(Error::config(format!(
                "Events URL must use ws or wss, got {scheme:?}"
            ))),
        }
    }

    /// Validates the timeouts.
    fn validate_timeouts(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::config("Request timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// URL Helpers
// ============================================================================

/// Ensures the URL path ends in `/` so relative joins append to it.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Maps `http(s)://host/base/` to `ws(s)://host/base/`.
fn derive_events_url(base_url: &Url) -> Result<Url> {
    let scheme = match base_url.scheme() {
        "https" => "wss",
        _ => "ws",
    };

    let mut url = base_url.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("Cannot derive events URL from {base_url}")))?;
    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================

//! Evolution API gateway module.
//!
//! This module provides the REST side of the pairing flow and the
//! collaborator contracts the coordinator is built on.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Gateway`] | HTTP client for one gateway |
//! | [`GatewayBuilder`] | Fluent configuration builder |
//! | [`SessionProvisioner`] | Creates sessions (`POST /sessions`) |
//! | [`PairingCodeFetcher`] | Fetches payloads (`GET /sessions/{id}/code`) |
//!
//! # Example
//!
//! ```no_run
//! use evolution_pairing::{Gateway, PairingCodeFetcher, SessionProvisioner};
//!
//! # async fn example() -> evolution_pairing::Result<()> {
//! let gateway = Gateway::builder()
//!     .base_url("http://localhost:8080")
//!     .api_key("secret")
//!     .build()?;
//!
//! let session_id = gateway.create_session().await?;
//! let payload = gateway.fetch_pairing_code(&session_id).await?;
//! println!("{payload}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for gateway configuration.
pub mod builder;

/// Gateway HTTP client.
pub mod client;

/// Pairing code retrieval.
pub mod fetcher;

/// Session provisioning.
pub mod provisioner;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::GatewayBuilder;
pub use client::Gateway;
pub use fetcher::PairingCodeFetcher;
pub use provisioner::SessionProvisioner;

//! Pairing payload returned by the gateway.
//!
//! The payload is whatever the phone has to scan: a `2@...` QR string, a
//! data URI, or a short pairing code. It is opaque to this crate.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

// ============================================================================
// PairingPayload
// ============================================================================

/// Scannable data authorizing a session.
///
/// Cheap to clone. The most recently fetched payload wins; older ones are
/// never shown again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingPayload(Arc<str>);

impl PairingPayload {
    /// Creates a payload from a non-empty string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] if the value is empty.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref();
        if value.is_empty() {
            return Err(Error::fetch_failed("gateway returned an empty pairing payload"));
        }
        Ok(Self(Arc::from(value)))
    }

    /// Returns the payload as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the payload is an inline image (`data:image/...`).
    #[inline]
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.0.starts_with("data:image/")
    }
}

impl fmt::Display for PairingPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

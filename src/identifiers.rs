//! Type-safe identifiers.
//!
//! Newtype wrappers keep a gateway session name from being confused with
//! any other string, and guarantee it is never empty.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`SessionId`] | `String` | Gateway (new session) or caller (existing session) |
//! | [`SubscriptionId`] | `Uuid` | Generated locally per listener subscription |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// SessionId
// ============================================================================

/// Opaque name of one remote pairing session.
///
/// Always non-empty. Construct with [`SessionId::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session identifier.
    ///
    /// The value is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSession`] if the value is empty or whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::invalid_session("session identifier is empty"));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SessionId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Identifier of one listener subscription.
///
/// Used to tag log lines so a stale subscription is easy to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generates a new random subscription ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

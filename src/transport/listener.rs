//! Listener contract.
//!
//! A listener relays lifecycle events for one session into an [`EventSink`].
//! The [`Subscription`] it returns is the only resource the coordinator has
//! to release explicitly.
//!
//! # Drop Semantics
//!
//! Unsubscribing closes the sink before the listener's own resources are
//! released, so an event racing the unsubscribe is dropped by the sink even
//! if the listener still tries to deliver it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::{SessionId, SubscriptionId};
use crate::protocol::LifecycleEvent;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called for each normalized event while the sink is open.
pub type EventHandler = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

/// Listener teardown callback type.
pub type Teardown = Box<dyn FnOnce() + Send>;

// ============================================================================
// EventListener
// ============================================================================

/// Subscribes to the live event channel of one session.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Opens a subscription scoped to `session_id` delivering into `sink`.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the channel cannot be opened.
    async fn subscribe(&self, session_id: &SessionId, sink: EventSink) -> Result<Subscription>;
}

// ============================================================================
// EventSink
// ============================================================================

/// Gated delivery target for lifecycle events.
///
/// Clones share the same open/closed state.
#[derive(Clone)]
pub struct EventSink {
    /// Subscription this sink belongs to.
    id: SubscriptionId,
    /// Cleared on unsubscribe.
    open: Arc<AtomicBool>,
    /// Downstream handler.
    handler: EventHandler,
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl EventSink {
    /// Creates an open sink forwarding to `handler`.
    #[must_use]
    pub fn new(handler: impl Fn(LifecycleEvent) + Send + Sync + 'static) -> Self {
        Self::with_id(SubscriptionId::generate(), handler)
    }

    /// Creates an open sink with a caller-chosen ID.
    #[must_use]
    pub fn with_id(
        id: SubscriptionId,
        handler: impl Fn(LifecycleEvent) + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            open: Arc::new(AtomicBool::new(true)),
            handler: Arc::new(handler),
        }
    }

    /// Returns the subscription ID this sink is tagged with.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns `true` until the owning subscription is closed.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Delivers an event.
    ///
    /// Returns `false` and drops the event if the sink is closed.
    pub fn emit(&self, event: LifecycleEvent) -> bool {
        if !self.is_open() {
            trace!(subscription = %self.id, ?event, "Dropping event after unsubscribe");
            return false;
        }
        (self.handler)(event);
        true
    }

    /// Delivers a connected event.
    #[inline]
    pub fn connected(&self) -> bool {
        self.emit(LifecycleEvent::Connected)
    }

    /// Delivers a scan timeout event.
    #[inline]
    pub fn timed_out(&self) -> bool {
        self.emit(LifecycleEvent::TimedOut)
    }

    /// Delivers an instance error event.
    #[inline]
    pub fn instance_error(&self, detail: Option<String>) -> bool {
        self.emit(LifecycleEvent::InstanceError { detail })
    }

    /// Delivers a transport error event.
    #[inline]
    pub fn transport_error(&self, detail: Option<String>) -> bool {
        self.emit(LifecycleEvent::TransportError { detail })
    }

    /// Closes the sink. Returns `true` if it was open.
    fn close(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// An open listener subscription.
///
/// Dropping the subscription unsubscribes.
pub struct Subscription {
    /// Sink the listener delivers into.
    sink: EventSink,
    /// Releases the listener's resources.
    teardown: Option<Teardown>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.sink.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// Creates a subscription over `sink`, running `teardown` on unsubscribe.
    #[must_use]
    pub fn new(sink: EventSink, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            sink,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Returns the subscription ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.sink.id
    }

    /// Returns `true` until [`unsubscribe`](Self::unsubscribe) is called.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.sink.is_open()
    }

    /// Stops delivery and releases the listener.
    ///
    /// Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.sink.close() {
            debug!(subscription = %self.sink.id, "Unsubscribed");
        }
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ============================================================================
// Tests
// ============================================================================

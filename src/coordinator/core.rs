//! Connection state coordinator.
//!
//! The [`Coordinator`] owns one pairing flow: it provisions or attaches to a
//! session, fetches pairing payloads, listens for lifecycle events, and
//! reports every transition to the host UI.
//!
//! # Event Loop
//!
//! All inputs are [`CoordinatorCommand`]s on one unbounded channel consumed
//! by a single spawned task, so transitions never run concurrently:
//!
//! - Results of provisioning and fetch calls (tagged with an attempt number)
//! - Results of opening the listener subscription
//! - Lifecycle events from the listener (tagged with the subscription ID)
//! - `refresh()` requests and shutdown
//!
//! Results tagged with an old attempt or subscription are discarded.
//!
//! # Transitions
//!
//! | From | Input | To |
//! |------|-------|----|
//! | Idle | start, new session | Provisioning |
//! | Idle | start, existing session | FetchingCode |
//! | Provisioning | provisioned | FetchingCode |
//! | Provisioning | provisioning failed | InstanceError |
//! | FetchingCode | fetched | WaitingForScan |
//! | FetchingCode | fetch failed | InstanceError |
//! | FetchingCode / WaitingForScan | connected | Connected |
//! | WaitingForScan | timeout | TimedOut |
//! | FetchingCode / WaitingForScan | instance error | InstanceError |
//! | FetchingCode / WaitingForScan | transport error | TransportError |
//! | TimedOut / InstanceError / TransportError | refresh | FetchingCode (Provisioning without a session) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gateway::{Gateway, PairingCodeFetcher, SessionProvisioner};
use crate::identifiers::{SessionId, SubscriptionId};
use crate::payload::PairingPayload;
use crate::protocol::LifecycleEvent;
use crate::transport::{EventListener, EventSink, Subscription};

use super::status::{ConnectionStatus, Failure, FailureKind, StatusChange};

// ============================================================================
// Types
// ============================================================================

/// Status change callback type.
///
/// Called once per transition with an immutable snapshot.
pub type StatusHandler = Box<dyn Fn(StatusChange) + Send + Sync>;

/// Success callback type. Called at most once per coordinator.
pub type ConnectedHandler = Box<dyn FnOnce() + Send>;

/// How the flow obtains its session.
enum Entry {
    /// Create a session through the provisioner.
    NewSession,
    /// Attach to a known session.
    ExistingSession(SessionId),
}

// ============================================================================
// CoordinatorCommand
// ============================================================================

/// Internal commands for the event loop.
enum CoordinatorCommand {
    /// Provisioner finished.
    Provisioned {
        attempt: u64,
        result: Result<SessionId>,
    },
    /// Fetcher finished.
    CodeFetched {
        attempt: u64,
        result: Result<PairingPayload>,
    },
    /// Listener subscription opened or failed.
    Subscribed {
        subscription_id: SubscriptionId,
        result: Result<Subscription>,
    },
    /// Event from the listener.
    Lifecycle {
        subscription_id: SubscriptionId,
        event: LifecycleEvent,
    },
    /// Caller asked for a new pairing code.
    Refresh { reply_tx: oneshot::Sender<bool> },
    /// Stop the event loop.
    Shutdown,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the handle and the event loop.
struct Shared {
    /// Last emitted snapshot.
    snapshot: Mutex<StatusChange>,
    /// Session identifier, once known.
    session_id: Mutex<Option<SessionId>>,
    /// Open listener subscription.
    subscription: Mutex<Option<Subscription>>,
    /// Set by `dispose()`.
    disposed: AtomicBool,
}

impl Shared {
    #[inline]
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Unsubscribes and drops the open subscription, if any.
    fn release_subscription(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(mut subscription) = subscription {
            subscription.unsubscribe();
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Coordinates one WhatsApp pairing flow.
///
/// Created with [`CoordinatorBuilder::from_new_session`] or
/// [`CoordinatorBuilder::from_existing_session`]; starts immediately. Must be
/// created inside a tokio runtime.
///
/// The host calls [`dispose`](Self::dispose) when the pairing UI goes away.
/// Dropping the coordinator disposes it as well.
///
/// # Example
///
/// ```no_run
/// use evolution_pairing::{Coordinator, Gateway};
///
/// # async fn example() -> evolution_pairing::Result<()> {
/// let gateway = Gateway::builder().base_url("http://localhost:8080").build()?;
///
/// let coordinator = Coordinator::builder()
///     .gateway(&gateway)
///     .on_status_change(|change| println!("{} {:?}", change.status, change.payload))
///     .on_connected(|| println!("paired"))
///     .from_new_session()?;
///
/// // later, from a "try again" button:
/// coordinator.refresh().await;
/// # Ok(())
/// # }
/// ```
pub struct Coordinator {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<CoordinatorCommand>,
    /// State shared with the event loop.
    shared: Arc<Shared>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("status", &self.status())
            .field("session_id", &self.session_id())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Creates a builder for injecting collaborators and callbacks.
    #[inline]
    #[must_use]
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    /// Starts a flow that provisions a new session on `gateway`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] only if the builder is incomplete, which
    /// cannot happen through this shorthand.
    pub fn from_new_session(
        gateway: &Gateway,
        on_status_change: impl Fn(StatusChange) + Send + Sync + 'static,
        on_connected: impl FnOnce() + Send + 'static,
    ) -> Result<Self> {
        Self::builder()
            .gateway(gateway)
            .on_status_change(on_status_change)
            .on_connected(on_connected)
            .from_new_session()
    }

    /// Starts a flow attached to an existing session on `gateway`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSession`] if `session_id` is empty.
    pub fn from_existing_session(
        gateway: &Gateway,
        session_id: impl Into<String>,
        on_status_change: impl Fn(StatusChange) + Send + Sync + 'static,
        on_connected: impl FnOnce() + Send + 'static,
    ) -> Result<Self> {
        Self::builder()
            .gateway(gateway)
            .on_status_change(on_status_change)
            .on_connected(on_connected)
            .from_existing_session(session_id)
    }

    /// Spawns the event loop.
    fn spawn(parts: Parts, entry: Entry) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            snapshot: Mutex::new(StatusChange::idle()),
            session_id: Mutex::new(None),
            subscription: Mutex::new(None),
            disposed: AtomicBool::new(false),
        });

        let machine = Machine {
            shared: Arc::clone(&shared),
            command_tx: command_tx.clone(),
            provisioner: parts.provisioner,
            fetcher: parts.fetcher,
            listener: parts.listener,
            on_status_change: parts.on_status_change,
            on_connected: parts.on_connected,
            status: ConnectionStatus::Idle,
            session_id: None,
            attempt: 0,
            subscription_id: None,
            request_task: None,
            subscribe_task: None,
        };

        tokio::spawn(Machine::run_event_loop(machine, command_rx, entry));

        Self { command_tx, shared }
    }

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.snapshot.lock().status
    }

    /// Returns the last emitted snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StatusChange {
        self.shared.snapshot.lock().clone()
    }

    /// Returns the payload to display, if waiting for a scan.
    #[must_use]
    pub fn pairing_payload(&self) -> Option<PairingPayload> {
        self.shared.snapshot.lock().payload.clone()
    }

    /// Returns the session identifier, once known.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.shared.session_id.lock().clone()
    }

    /// Returns `true` if and only if the status is `Connected`.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Requests a fresh pairing code.
    ///
    /// Honored only from `TimedOut`, `InstanceError` or `TransportError`.
    /// Returns `true` if the request was accepted; the outcome arrives
    /// through the status callback.
    pub async fn refresh(&self) -> bool {
        if self.is_disposed() {
            return false;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .command_tx
            .send(CoordinatorCommand::Refresh { reply_tx })
            .is_err()
        {
            return false;
        }

        reply_rx.await.unwrap_or(false)
    }

    /// Tears the flow down.
    ///
    /// Unsubscribes the listener before returning; results of in-flight
    /// calls are discarded. Idempotent.
    pub fn dispose(&self) {
        {
            // Serializes with snapshot writes in the event loop.
            let _snapshot = self.shared.snapshot.lock();
            if self.shared.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
        }

        self.shared.release_subscription();
        let _ = self.command_tx.send(CoordinatorCommand::Shutdown);

        debug!(session_id = ?self.session_id(), "Coordinator disposed");
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ============================================================================
// Machine
// ============================================================================

/// Collaborators and callbacks handed from the builder to the event loop.
struct Parts {
    provisioner: Option<Arc<dyn SessionProvisioner>>,
    fetcher: Arc<dyn PairingCodeFetcher>,
    listener: Arc<dyn EventListener>,
    on_status_change: Option<StatusHandler>,
    on_connected: Option<ConnectedHandler>,
}

/// State owned by the event loop task.
struct Machine {
    shared: Arc<Shared>,
    /// Sender for results of spawned calls and listener events.
    command_tx: mpsc::UnboundedSender<CoordinatorCommand>,
    provisioner: Option<Arc<dyn SessionProvisioner>>,
    fetcher: Arc<dyn PairingCodeFetcher>,
    listener: Arc<dyn EventListener>,
    on_status_change: Option<StatusHandler>,
    /// Taken on the first connected transition.
    on_connected: Option<ConnectedHandler>,
    status: ConnectionStatus,
    session_id: Option<SessionId>,
    /// Bumped for every provisioning or fetch call.
    attempt: u64,
    /// Subscription that is open or being opened.
    subscription_id: Option<SubscriptionId>,
    /// In-flight provisioning or fetch call.
    request_task: Option<AbortHandle>,
    /// In-flight subscribe call.
    subscribe_task: Option<AbortHandle>,
}

impl Machine {
    /// Event loop that serializes every transition.
    async fn run_event_loop(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<CoordinatorCommand>,
        entry: Entry,
    ) {
        self.start(entry);

        while let Some(command) = command_rx.recv().await {
            if self.shared.is_disposed() {
                break;
            }

            match command {
                CoordinatorCommand::Provisioned { attempt, result } => {
                    self.on_provisioned(attempt, result);
                }
                CoordinatorCommand::CodeFetched { attempt, result } => {
                    self.on_code_fetched(attempt, result);
                }
                CoordinatorCommand::Subscribed {
                    subscription_id,
                    result,
                } => {
                    self.on_subscribed(subscription_id, result);
                }
                CoordinatorCommand::Lifecycle {
                    subscription_id,
                    event,
                } => {
                    self.on_lifecycle(subscription_id, event);
                }
                CoordinatorCommand::Refresh { reply_tx } => {
                    let accepted = self.on_refresh();
                    let _ = reply_tx.send(accepted);
                }
                CoordinatorCommand::Shutdown => {
                    debug!("Shutdown command received");
                    break;
                }
            }
        }

        self.shutdown();
        debug!(session_id = ?self.session_id, "Event loop terminated");
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    fn start(&mut self, entry: Entry) {
        match entry {
            Entry::NewSession => self.provision(),
            Entry::ExistingSession(session_id) => {
                info!(session_id = %session_id, "Attaching to existing session");
                self.begin_session(session_id);
            }
        }
    }

    fn on_provisioned(&mut self, attempt: u64, result: Result<SessionId>) {
        if attempt != self.attempt || self.status != ConnectionStatus::Provisioning {
            debug!(attempt, current = self.attempt, "Discarding stale provisioning result");
            return;
        }
        self.request_task = None;

        match result {
            Ok(session_id) => self.begin_session(session_id),
            Err(e) => {
                warn!(error = %e, "Provisioning failed");
                self.fail(ConnectionStatus::InstanceError, Failure::provisioning(&e));
            }
        }
    }

    fn on_code_fetched(&mut self, attempt: u64, result: Result<PairingPayload>) {
        if attempt != self.attempt || self.status != ConnectionStatus::FetchingCode {
            debug!(attempt, current = self.attempt, "Discarding stale fetch result");
            return;
        }
        self.request_task = None;

        match result {
            Ok(payload) => {
                self.transition(ConnectionStatus::WaitingForScan, Some(payload), None);
                self.subscribe();
            }
            Err(e) => {
                warn!(session_id = ?self.session_id, error = %e, "Pairing code fetch failed");
                self.fail(ConnectionStatus::InstanceError, Failure::fetch(&e));
            }
        }
    }

    fn on_subscribed(&mut self, subscription_id: SubscriptionId, result: Result<Subscription>) {
        if self.subscription_id != Some(subscription_id) {
            debug!(subscription = %subscription_id, "Discarding stale subscription");
            return;
        }
        self.subscribe_task = None;

        match result {
            Ok(subscription) => {
                debug!(subscription = %subscription_id, "Listener subscribed");
                *self.shared.subscription.lock() = Some(subscription);
            }
            Err(e) => {
                warn!(session_id = ?self.session_id, error = %e, "Listener subscription failed");
                self.subscription_id = None;
                if self.status.is_pending() {
                    self.fail(
                        ConnectionStatus::TransportError,
                        Failure::new(FailureKind::TransportError, e.detail()),
                    );
                }
            }
        }
    }

    fn on_lifecycle(&mut self, subscription_id: SubscriptionId, event: LifecycleEvent) {
        if self.subscription_id != Some(subscription_id) {
            debug!(subscription = %subscription_id, ?event, "Dropping event from old subscription");
            return;
        }

        let waiting = self.status == ConnectionStatus::WaitingForScan;
        let live = matches!(
            self.status,
            ConnectionStatus::FetchingCode | ConnectionStatus::WaitingForScan
        );

        match event {
            LifecycleEvent::Connected if !self.status.is_terminal() => self.connect(),
            LifecycleEvent::TimedOut if waiting => self.fail(
                ConnectionStatus::TimedOut,
                Failure::new(FailureKind::Timeout, None),
            ),
            LifecycleEvent::InstanceError { detail } if live => self.fail(
                ConnectionStatus::InstanceError,
                Failure::new(FailureKind::InstanceError, detail),
            ),
            LifecycleEvent::TransportError { detail } => {
                // The channel is gone; a refresh has to open a new one.
                self.release_subscription();
                if live {
                    self.fail(
                        ConnectionStatus::TransportError,
                        Failure::new(FailureKind::TransportError, detail),
                    );
                }
            }
            event => debug!(status = %self.status, ?event, "Ignoring lifecycle event"),
        }
    }

    fn on_refresh(&mut self) -> bool {
        if !self.status.is_terminal_failure() {
            debug!(status = %self.status, "Refresh rejected");
            return false;
        }

        info!(session_id = ?self.session_id, from = %self.status, "Refreshing pairing code");

        match self.session_id.clone() {
            Some(session_id) => {
                self.subscribe_to(&session_id);
                self.fetch_code(session_id);
            }
            None => self.provision(),
        }
        true
    }

    // ========================================================================
    // Actions
    // ========================================================================

    fn provision(&mut self) {
        let Some(provisioner) = self.provisioner.clone() else {
            self.fail(
                ConnectionStatus::InstanceError,
                Failure::provisioning(&Error::config("no session provisioner configured")),
            );
            return;
        };

        self.attempt += 1;
        self.transition(ConnectionStatus::Provisioning, None, None);

        let attempt = self.attempt;
        let command_tx = self.command_tx.clone();
        let handle = tokio::spawn(async move {
            let result = provisioner.create_session().await;
            let _ = command_tx.send(CoordinatorCommand::Provisioned { attempt, result });
        });
        self.replace_request_task(handle.abort_handle());
    }

    /// Records the session and starts listening and fetching.
    fn begin_session(&mut self, session_id: SessionId) {
        self.session_id = Some(session_id.clone());
        *self.shared.session_id.lock() = Some(session_id.clone());

        self.subscribe_to(&session_id);
        self.fetch_code(session_id);
    }

    fn fetch_code(&mut self, session_id: SessionId) {
        self.attempt += 1;
        self.transition(ConnectionStatus::FetchingCode, None, None);

        let attempt = self.attempt;
        let fetcher = Arc::clone(&self.fetcher);
        let command_tx = self.command_tx.clone();
        let handle = tokio::spawn(async move {
            let result = fetcher.fetch_pairing_code(&session_id).await;
            let _ = command_tx.send(CoordinatorCommand::CodeFetched { attempt, result });
        });
        self.replace_request_task(handle.abort_handle());
    }

    /// Opens the listener for the current session unless one is open.
    fn subscribe(&mut self) {
        if let Some(session_id) = self.session_id.clone() {
            self.subscribe_to(&session_id);
        }
    }

    fn subscribe_to(&mut self, session_id: &SessionId) {
        if self.subscription_id.is_some() {
            return;
        }

        let subscription_id = SubscriptionId::generate();
        let event_tx = self.command_tx.clone();
        let sink = EventSink::with_id(subscription_id, move |event| {
            let _ = event_tx.send(CoordinatorCommand::Lifecycle {
                subscription_id,
                event,
            });
        });
        self.subscription_id = Some(subscription_id);

        debug!(session_id = %session_id, subscription = %subscription_id, "Opening listener");

        let listener = Arc::clone(&self.listener);
        let session_id = session_id.clone();
        let command_tx = self.command_tx.clone();
        let handle = tokio::spawn(async move {
            let result = listener.subscribe(&session_id, sink).await;
            let _ = command_tx.send(CoordinatorCommand::Subscribed {
                subscription_id,
                result,
            });
        });
        self.subscribe_task = Some(handle.abort_handle());
    }

    fn connect(&mut self) {
        self.attempt += 1;
        if let Some(task) = self.request_task.take() {
            task.abort();
        }

        info!(session_id = ?self.session_id, "Session connected");
        self.transition(ConnectionStatus::Connected, None, None);

        if let Some(on_connected) = self.on_connected.take()
            && !self.shared.is_disposed()
        {
            on_connected();
        }
    }

    fn fail(&mut self, status: ConnectionStatus, failure: Failure) {
        self.transition(status, None, Some(failure));
    }

    fn release_subscription(&mut self) {
        self.subscription_id = None;
        if let Some(task) = self.subscribe_task.take() {
            task.abort();
        }
        self.shared.release_subscription();
    }

    fn replace_request_task(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.request_task.replace(handle) {
            previous.abort();
        }
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.request_task.take() {
            task.abort();
        }
        self.release_subscription();
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Applies a transition and notifies the caller.
    fn transition(
        &mut self,
        status: ConnectionStatus,
        payload: Option<PairingPayload>,
        failure: Option<Failure>,
    ) {
        debug!(
            session_id = ?self.session_id,
            from = %self.status,
            to = %status,
            failure = ?failure,
            "Status transition"
        );
        self.status = status;

        let change = StatusChange {
            status,
            payload,
            failure,
        };
        {
            let mut snapshot = self.shared.snapshot.lock();
            if self.shared.is_disposed() {
                return;
            }
            *snapshot = change.clone();
        }

        if self.shared.is_disposed() {
            return;
        }
        if let Some(ref on_status_change) = self.on_status_change {
            on_status_change(change);
        }
    }
}

// ============================================================================
// CoordinatorBuilder
// ============================================================================

/// Builder wiring collaborators and callbacks into a [`Coordinator`].
///
/// The two terminal methods are the only entry points:
/// [`from_new_session`](Self::from_new_session) and
/// [`from_existing_session`](Self::from_existing_session).
#[derive(Default)]
pub struct CoordinatorBuilder {
    provisioner: Option<Arc<dyn SessionProvisioner>>,
    fetcher: Option<Arc<dyn PairingCodeFetcher>>,
    listener: Option<Arc<dyn EventListener>>,
    on_status_change: Option<StatusHandler>,
    on_connected: Option<ConnectedHandler>,
}

impl fmt::Debug for CoordinatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorBuilder")
            .field("provisioner", &self.provisioner.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .field("listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl CoordinatorBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `gateway` as provisioner and fetcher, and its event channel as
    /// listener.
    #[must_use]
    pub fn gateway(mut self, gateway: &Gateway) -> Self {
        self.provisioner = Some(Arc::new(gateway.clone()));
        self.fetcher = Some(Arc::new(gateway.clone()));
        self.listener = Some(Arc::new(gateway.listener()));
        self
    }

    /// Sets the session provisioner.
    #[inline]
    #[must_use]
    pub fn provisioner(mut self, provisioner: impl SessionProvisioner + 'static) -> Self {
        self.provisioner = Some(Arc::new(provisioner));
        self
    }

    /// Sets the pairing code fetcher.
    #[inline]
    #[must_use]
    pub fn fetcher(mut self, fetcher: impl PairingCodeFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Sets the event listener.
    #[inline]
    #[must_use]
    pub fn listener(mut self, listener: impl EventListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Sets the status change callback.
    #[inline]
    #[must_use]
    pub fn on_status_change(
        mut self,
        handler: impl Fn(StatusChange) + Send + Sync + 'static,
    ) -> Self {
        self.on_status_change = Some(Box::new(handler));
        self
    }

    /// Sets the success callback.
    #[inline]
    #[must_use]
    pub fn on_connected(mut self, handler: impl FnOnce() + Send + 'static) -> Self {
        self.on_connected = Some(Box::new(handler));
        self
    }

    /// Starts a flow that creates a new session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the provisioner, fetcher or listener is
    /// missing.
    pub fn from_new_session(mut self) -> Result<Coordinator> {
        if self.provisioner.is_none() {
            return Err(Error::config(
                "A session provisioner is required for a new session. \
                 Use .provisioner() or .gateway() to set it.",
            ));
        }
        let parts = self.take_parts()?;
        Ok(Coordinator::spawn(parts, Entry::NewSession))
    }

    /// Starts a flow attached to an existing session.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSession`] if `session_id` is empty
    /// - [`Error::Config`] if the fetcher or listener is missing
    pub fn from_existing_session(mut self, session_id: impl Into<String>) -> Result<Coordinator> {
        let session_id = SessionId::new(session_id)?;
        let parts = self.take_parts()?;
        Ok(Coordinator::spawn(parts, Entry::ExistingSession(session_id)))
    }

    /// Validates and moves out the collaborators.
    fn take_parts(&mut self) -> Result<Parts> {
        let fetcher = self.fetcher.take().ok_or_else(|| {
            Error::config("A pairing code fetcher is required. Use .fetcher() or .gateway().")
        })?;
        let listener = self.listener.take().ok_or_else(|| {
            Error::config("An event listener is required. Use .listener() or .gateway().")
        })?;

        Ok(Parts {
            provisioner: self.provisioner.take(),
            fetcher,
            listener,
            on_status_change: self.on_status_change.take(),
            on_connected: self.on_connected.take(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;
    use tokio::time::{sleep, timeout};

    // ------------------------------------------------------------------------
    // Scripted collaborators
    // ------------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct ScriptedProvisioner {
        results: Arc<Mutex<VecDeque<Result<SessionId>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvisioner {
        fn returning(results: Vec<Result<SessionId>>) -> Self {
            Self {
                results: Arc::new(Mutex::new(results.into())),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionProvisioner for ScriptedProvisioner {
        async fn create_session(&self) -> Result<SessionId> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::provisioning_failed("script exhausted")))
        }
    }

    /// Returns `P1`, `P2`, ... unless a failure is queued. Optionally gated.
    #[derive(Clone, Default)]
    struct ScriptedFetcher {
        failures: Arc<Mutex<VecDeque<Error>>>,
        calls: Arc<AtomicUsize>,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedFetcher {
        fn gated() -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            let fetcher = Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            };
            (fetcher, gate)
        }

        fn fail_next(&self, err: Error) {
            self.failures.lock().push_back(err);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PairingCodeFetcher for ScriptedFetcher {
        async fn fetch_pairing_code(&self, session_id: &SessionId) -> Result<PairingPayload> {
            assert!(!session_id.as_str().is_empty());
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(ref gate) = self.gate {
                gate.acquire().await.expect("gate open").forget();
            }
            if let Some(err) = self.failures.lock().pop_front() {
                return Err(err);
            }
            PairingPayload::new(format!("P{n}"))
        }
    }

    /// Hands the sinks it receives to the test.
    #[derive(Clone, Default)]
    struct ManualListener {
        sinks: Arc<Mutex<Vec<EventSink>>>,
        sessions: Arc<Mutex<Vec<SessionId>>>,
        unsubscribes: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    impl ManualListener {
        fn failing() -> Self {
            let listener = Self::default();
            listener.fail.store(true, Ordering::SeqCst);
            listener
        }

        fn subscriptions(&self) -> usize {
            self.sinks.lock().len()
        }

        fn unsubscribes(&self) -> usize {
            self.unsubscribes.load(Ordering::SeqCst)
        }

        /// Waits for the `n`th subscription and returns its sink.
        async fn sink(&self, n: usize) -> EventSink {
            for _ in 0..500 {
                if let Some(sink) = self.sinks.lock().get(n - 1) {
                    return sink.clone();
                }
                sleep(Duration::from_millis(10)).await;
            }
            panic!("listener was not subscribed {n} time(s)");
        }
    }

    #[async_trait]
    impl EventListener for ManualListener {
        async fn subscribe(&self, session_id: &SessionId, sink: EventSink) -> Result<Subscription> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::connection("relay unreachable"));
            }
            self.sessions.lock().push(session_id.clone());
            self.sinks.lock().push(sink.clone());
            let unsubscribes = Arc::clone(&self.unsubscribes);
            Ok(Subscription::new(sink, move || {
                unsubscribes.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    // ------------------------------------------------------------------------
    // Harness
    // ------------------------------------------------------------------------

    struct Harness {
        coordinator: Coordinator,
        changes: mpsc::UnboundedReceiver<StatusChange>,
        connected: Arc<AtomicUsize>,
    }

    impl Harness {
        fn builder(
            fetcher: &ScriptedFetcher,
            listener: &ManualListener,
        ) -> (
            CoordinatorBuilder,
            mpsc::UnboundedReceiver<StatusChange>,
            Arc<AtomicUsize>,
        ) {
            let (tx, rx) = mpsc::unbounded_channel();
            let connected = Arc::new(AtomicUsize::new(0));
            let connected_clone = Arc::clone(&connected);

            let builder = Coordinator::builder()
                .fetcher(fetcher.clone())
                .listener(listener.clone())
                .on_status_change(move |change| {
                    let _ = tx.send(change);
                })
                .on_connected(move || {
                    connected_clone.fetch_add(1, Ordering::SeqCst);
                });

            (builder, rx, connected)
        }

        fn new_session(
            provisioner: &ScriptedProvisioner,
            fetcher: &ScriptedFetcher,
            listener: &ManualListener,
        ) -> Self {
            let (builder, changes, connected) = Self::builder(fetcher, listener);
            let coordinator = builder
                .provisioner(provisioner.clone())
                .from_new_session()
                .expect("coordinator");
            Self {
                coordinator,
                changes,
                connected,
            }
        }

        fn existing_session(id: &str, fetcher: &ScriptedFetcher, listener: &ManualListener) -> Self {
            let (builder, changes, connected) = Self::builder(fetcher, listener);
            let coordinator = builder.from_existing_session(id).expect("coordinator");
            Self {
                coordinator,
                changes,
                connected,
            }
        }

        async fn next(&mut self) -> StatusChange {
            timeout(Duration::from_secs(5), self.changes.recv())
                .await
                .expect("status change in time")
                .expect("channel open")
        }

        async fn expect_status(&mut self, status: ConnectionStatus) -> StatusChange {
            let change = self.next().await;
            assert_eq!(change.status, status, "unexpected change: {change:?}");
            change
        }

        async fn expect_quiet(&mut self) {
            let result = timeout(Duration::from_millis(150), self.changes.recv()).await;
            assert!(
                !matches!(result, Ok(Some(_))),
                "unexpected status change: {result:?}"
            );
        }

        fn connected_calls(&self) -> usize {
            self.connected.load(Ordering::SeqCst)
        }

        /// Waits until the event loop has stored the open subscription.
        async fn subscribed(&self) {
            let shared = Arc::clone(&self.coordinator.shared);
            eventually(move || shared.subscription.lock().is_some()).await;
        }
    }

    async fn eventually(condition: impl Fn() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }

    fn id(value: &str) -> SessionId {
        SessionId::new(value).expect("session id")
    }

    // ------------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_new_session_reaches_waiting_for_scan() {
        let provisioner = ScriptedProvisioner::returning(vec![Ok(id("abc"))]);
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::new_session(&provisioner, &fetcher, &listener);

        h.expect_status(ConnectionStatus::Provisioning).await;
        h.expect_status(ConnectionStatus::FetchingCode).await;
        let waiting = h.expect_status(ConnectionStatus::WaitingForScan).await;

        assert_eq!(waiting.payload.as_ref().map(PairingPayload::as_str), Some("P1"));
        assert!(waiting.failure.is_none());
        assert_eq!(h.coordinator.session_id(), Some(id("abc")));
        assert_eq!(h.coordinator.pairing_payload(), waiting.payload);

        listener.sink(1).await;
        assert_eq!(*listener.sessions.lock(), vec![id("abc")]);
        assert_eq!(provisioner.calls(), 1);
    }

    #[tokio::test]
    async fn test_existing_session_skips_provisioning() {
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        let waiting = h.expect_status(ConnectionStatus::WaitingForScan).await;

        assert_eq!(waiting.payload.as_ref().map(PairingPayload::as_str), Some("P1"));
        assert_eq!(h.coordinator.session_id(), Some(id("xyz")));
    }

    #[tokio::test]
    async fn test_timeout_then_refresh_fetches_new_payload() {
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        let first = h.expect_status(ConnectionStatus::WaitingForScan).await;

        listener.sink(1).await.timed_out();
        let timed_out = h.expect_status(ConnectionStatus::TimedOut).await;
        assert!(timed_out.payload.is_none());
        let failure = timed_out.failure.expect("failure");
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert!(!failure.kind.is_error());
        assert!(h.coordinator.pairing_payload().is_none());

        assert!(h.coordinator.refresh().await);
        h.expect_status(ConnectionStatus::FetchingCode).await;
        let second = h.expect_status(ConnectionStatus::WaitingForScan).await;

        assert_eq!(second.payload.as_ref().map(PairingPayload::as_str), Some("P2"));
        assert_ne!(first.payload, second.payload);
        assert_eq!(listener.subscriptions(), 1);
    }

    #[tokio::test]
    async fn test_provisioning_failure_is_instance_error() {
        let provisioner =
            ScriptedProvisioner::returning(vec![Err(Error::provisioning_failed("network down"))]);
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::new_session(&provisioner, &fetcher, &listener);

        h.expect_status(ConnectionStatus::Provisioning).await;
        let failed = h.expect_status(ConnectionStatus::InstanceError).await;

        let failure = failed.failure.expect("failure");
        assert_eq!(failure.kind, FailureKind::ProvisioningFailed);
        assert!(failure.message().contains("network down"));

        h.expect_quiet().await;
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(listener.subscriptions(), 0);
        assert!(h.coordinator.session_id().is_none());
    }

    #[tokio::test]
    async fn test_refresh_after_provisioning_failure_provisions_again() {
        let provisioner = ScriptedProvisioner::returning(vec![
            Err(Error::provisioning_failed("network down")),
            Ok(id("abc")),
        ]);
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::new_session(&provisioner, &fetcher, &listener);

        h.expect_status(ConnectionStatus::Provisioning).await;
        h.expect_status(ConnectionStatus::InstanceError).await;

        assert!(h.coordinator.refresh().await);
        h.expect_status(ConnectionStatus::Provisioning).await;
        h.expect_status(ConnectionStatus::FetchingCode).await;
        h.expect_status(ConnectionStatus::WaitingForScan).await;
        assert_eq!(provisioner.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_then_events_ignored() {
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        h.expect_status(ConnectionStatus::WaitingForScan).await;

        let sink = listener.sink(1).await;
        sink.transport_error(Some("relay disconnected".into()));
        let failed = h.expect_status(ConnectionStatus::TransportError).await;
        let failure = failed.failure.expect("failure");
        assert_eq!(failure.kind, FailureKind::TransportError);
        assert_eq!(failure.detail.as_deref(), Some("relay disconnected"));

        sink.connected();
        sink.timed_out();
        h.expect_quiet().await;
        assert_eq!(h.coordinator.status(), ConnectionStatus::TransportError);
        assert_eq!(h.connected_calls(), 0);
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connected_is_absorbing_and_notified_once() {
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        h.expect_status(ConnectionStatus::WaitingForScan).await;
        assert!(!h.coordinator.is_connected());

        let sink = listener.sink(1).await;
        sink.connected();
        sink.connected();
        sink.timed_out();

        let connected = h.expect_status(ConnectionStatus::Connected).await;
        assert!(connected.failure.is_none());
        h.expect_quiet().await;

        assert!(h.coordinator.is_connected());
        assert_eq!(h.connected_calls(), 1);

        assert!(!h.coordinator.refresh().await);
        h.expect_quiet().await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(h.coordinator.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_refresh_from_each_terminal_failure() {
        for (emit, status) in [
            (
                LifecycleEvent::TimedOut,
                ConnectionStatus::TimedOut,
            ),
            (
                LifecycleEvent::InstanceError { detail: None },
                ConnectionStatus::InstanceError,
            ),
            (
                LifecycleEvent::TransportError { detail: None },
                ConnectionStatus::TransportError,
            ),
        ] {
            let fetcher = ScriptedFetcher::default();
            let listener = ManualListener::default();
            let mut h = Harness::existing_session("xyz", &fetcher, &listener);

            h.expect_status(ConnectionStatus::FetchingCode).await;
            let first = h.expect_status(ConnectionStatus::WaitingForScan).await;

            listener.sink(1).await.emit(emit.clone());
            let failed = h.expect_status(status).await;
            assert!(failed.failure.is_some());
            assert!(failed.failure.as_ref().is_some_and(|f| !f.message().is_empty()));

            assert!(h.coordinator.refresh().await, "refresh from {status}");
            h.expect_status(ConnectionStatus::FetchingCode).await;
            let second = h.expect_status(ConnectionStatus::WaitingForScan).await;
            assert_ne!(first.payload, second.payload);

            if status == ConnectionStatus::TransportError {
                // The dead channel was released and a new one opened.
                listener.sink(2).await;
                let l = listener.clone();
                eventually(move || l.unsubscribes() == 1).await;
            } else {
                assert_eq!(listener.subscriptions(), 1);
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_rejected_outside_terminal_failure() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        assert!(!h.coordinator.refresh().await);

        gate.add_permits(1);
        h.expect_status(ConnectionStatus::WaitingForScan).await;
        assert!(!h.coordinator.refresh().await);
        h.expect_quiet().await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_then_refresh() {
        let fetcher = ScriptedFetcher::default();
        fetcher.fail_next(Error::FetchFailed { detail: None });
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        let failed = h.expect_status(ConnectionStatus::InstanceError).await;
        let failure = failed.failure.expect("failure");
        assert_eq!(failure.kind, FailureKind::FetchFailed);
        assert_eq!(failure.message(), FailureKind::FetchFailed.fallback_message());

        assert!(h.coordinator.refresh().await);
        h.expect_status(ConnectionStatus::FetchingCode).await;
        let waiting = h.expect_status(ConnectionStatus::WaitingForScan).await;
        assert_eq!(waiting.payload.as_ref().map(PairingPayload::as_str), Some("P2"));
    }

    #[tokio::test]
    async fn test_connected_preempts_pending_fetch() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        listener.sink(1).await.connected();
        h.expect_status(ConnectionStatus::Connected).await;

        gate.add_permits(1);
        h.expect_quiet().await;
        assert_eq!(h.coordinator.status(), ConnectionStatus::Connected);
        assert_eq!(h.connected_calls(), 1);
    }

    #[tokio::test]
    async fn test_instance_error_while_fetching_discards_fetch() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        listener.sink(1).await.instance_error(Some("banned".into()));

        let failed = h.expect_status(ConnectionStatus::InstanceError).await;
        let failure = failed.failure.expect("failure");
        assert_eq!(failure.kind, FailureKind::InstanceError);
        assert_eq!(failure.detail.as_deref(), Some("banned"));

        gate.add_permits(1);
        h.expect_quiet().await;
        assert_eq!(h.coordinator.status(), ConnectionStatus::InstanceError);
        assert!(h.coordinator.pairing_payload().is_none());
    }

    #[tokio::test]
    async fn test_timeout_while_fetching_is_ignored() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        listener.sink(1).await.timed_out();
        h.expect_quiet().await;

        gate.add_permits(1);
        h.expect_status(ConnectionStatus::WaitingForScan).await;
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_transport_error() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let listener = ManualListener::failing();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        let failed = h.expect_status(ConnectionStatus::TransportError).await;
        assert!(
            failed
                .failure
                .and_then(|f| f.detail)
                .is_some_and(|d| d.contains("relay unreachable"))
        );

        // The stale fetch resolves into nothing.
        gate.add_permits(1);
        h.expect_quiet().await;

        listener.fail.store(false, Ordering::SeqCst);
        assert!(h.coordinator.refresh().await);
        h.expect_status(ConnectionStatus::FetchingCode).await;
        gate.add_permits(1);
        h.expect_status(ConnectionStatus::WaitingForScan).await;
        listener.sink(1).await;
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_events_after_dispose_are_dropped() {
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        h.expect_status(ConnectionStatus::WaitingForScan).await;
        let sink = listener.sink(1).await;
        h.subscribed().await;

        h.coordinator.dispose();
        h.coordinator.dispose();

        assert!(h.coordinator.is_disposed());
        assert_eq!(listener.unsubscribes(), 1);
        assert!(!sink.connected());
        assert!(!sink.transport_error(None));

        h.expect_quiet().await;
        assert_eq!(h.coordinator.status(), ConnectionStatus::WaitingForScan);
        assert!(!h.coordinator.refresh().await);
        assert_eq!(h.connected_calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_fetch_after_dispose_is_discarded() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        listener.sink(1).await;

        h.coordinator.dispose();
        gate.add_permits(1);

        h.expect_quiet().await;
        assert_eq!(h.coordinator.status(), ConnectionStatus::FetchingCode);
        assert!(h.coordinator.pairing_payload().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_snapshot_frozen_once_dispose_returns() {
        for _ in 0..50 {
            let fetcher = ScriptedFetcher::default();
            let listener = ManualListener::default();
            let mut h = Harness::existing_session("xyz", &fetcher, &listener);

            h.expect_status(ConnectionStatus::FetchingCode).await;
            h.expect_status(ConnectionStatus::WaitingForScan).await;
            let sink = listener.sink(1).await;

            let emitter = tokio::spawn(async move {
                sink.connected();
            });
            h.coordinator.dispose();
            let frozen = h.coordinator.snapshot();

            let _ = emitter.await;
            sleep(Duration::from_millis(20)).await;
            assert_eq!(h.coordinator.snapshot(), frozen);
        }
    }

    #[tokio::test]
    async fn test_drop_disposes() {
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let mut h = Harness::existing_session("xyz", &fetcher, &listener);

        h.expect_status(ConnectionStatus::FetchingCode).await;
        h.expect_status(ConnectionStatus::WaitingForScan).await;
        let sink = listener.sink(1).await;
        h.subscribed().await;

        drop(h.coordinator);

        assert_eq!(listener.unsubscribes(), 1);
        assert!(!sink.is_open());
    }

    #[tokio::test]
    async fn test_dispose_from_connected_callback() {
        let fetcher = ScriptedFetcher::default();
        let listener = ManualListener::default();
        let slot: Arc<Mutex<Option<Arc<Coordinator>>>> = Arc::default();
        let slot_clone = Arc::clone(&slot);

        let coordinator = Arc::new(
            Coordinator::builder()
                .fetcher(fetcher.clone())
                .listener(listener.clone())
                .on_connected(move || {
                    if let Some(coordinator) = slot_clone.lock().take() {
                        coordinator.dispose();
                    }
                })
                .from_existing_session("xyz")
                .expect("coordinator"),
        );
        *slot.lock() = Some(Arc::clone(&coordinator));

        listener.sink(1).await.connected();

        let c = Arc::clone(&coordinator);
        eventually(move || c.is_disposed()).await;
        assert!(coordinator.is_connected());
        let l = listener.clone();
        eventually(move || l.unsubscribes() == 1).await;
    }

    // ------------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_builder_requires_collaborators() {
        let err = Coordinator::builder()
            .listener(ManualListener::default())
            .from_existing_session("xyz")
            .unwrap_err();
        assert!(err.to_string().contains("fetcher"));

        let err = Coordinator::builder()
            .fetcher(ScriptedFetcher::default())
            .listener(ManualListener::default())
            .from_new_session()
            .unwrap_err();
        assert!(err.to_string().contains("provisioner"));
    }

    #[tokio::test]
    async fn test_existing_session_must_not_be_empty() {
        let err = Coordinator::builder()
            .fetcher(ScriptedFetcher::default())
            .listener(ManualListener::default())
            .from_existing_session("  ")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSession { .. }));
    }
}

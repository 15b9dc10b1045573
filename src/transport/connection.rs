//! WebSocket event listener and event loop.
//!
//! [`WsListener`] connects to the gateway's event channel for one session
//! and spawns a tokio task that normalizes incoming frames into lifecycle
//! events.
//!
//! # Event Loop
//!
//! The spawned task handles:
//!
//! - Text frames: parsed, filtered by instance, normalized, delivered to the sink
//! - Close / read error / end of stream: one transport error, then exit
//! - Shutdown signal from [`Subscription::unsubscribe`]: close the socket, exit

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::from_str;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::Event;

use super::listener::{EventListener, EventSink, Subscription};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the gateway API key.
pub(crate) const API_KEY_HEADER: &str = "apikey";

// ============================================================================
// Types
// ============================================================================

/// Client socket type.
type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WsListener
// ============================================================================

/// Listener over the gateway's WebSocket event channel.
///
/// Each [`subscribe`](EventListener::subscribe) opens its own socket to
/// `{events_url}/sessions/{id}/events`.
#[derive(Debug, Clone)]
pub struct WsListener {
    /// Base URL of the event channel, always ending in `/`.
    events_url: Url,
    /// API key sent with the upgrade request.
    api_key: Option<String>,
    /// Handshake timeout.
    connect_timeout: Duration,
}

impl WsListener {
    /// Creates a listener for the given event channel base URL.
    #[must_use]
    pub fn new(events_url: Url) -> Self {
        Self {
            events_url: crate::gateway::builder::with_trailing_slash(events_url),
            api_key: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the API key sent as the `apikey` header.
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Returns the event channel base URL.
    #[inline]
    #[must_use]
    pub fn events_url(&self) -> &Url {
        &self.events_url
    }

    /// Returns the channel URL for one session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the joined URL is invalid.
    pub fn session_url(&self, session_id: &SessionId) -> Result<Url> {
        let path = format!(
            "sessions/{}/events",
            urlencoding::encode(session_id.as_str())
        );
        Ok(self.events_url.join(&path)?)
    }

    /// Opens the socket for `session_id`.
    async fn connect(&self, session_id: &SessionId) -> Result<ClientStream> {
        let url = self.session_url(session_id)?;
        let mut request = url.as_str().into_client_request()?;

        if let Some(ref api_key) = self.api_key {
            let value = HeaderValue::from_str(api_key)
                .map_err(|e| Error::config(format!("API key is not a valid header value: {e}")))?;
            request.headers_mut().insert(API_KEY_HEADER, value);
        }

        let (ws_stream, _response) = timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(request),
        )
        .await
        .map_err(|_| Error::connection_timeout(self.connect_timeout.as_millis() as u64))??;

        info!(session_id = %session_id, %url, "Event channel connected");

        Ok(ws_stream)
    }

    /// Event loop that relays frames into the sink.
    async fn run_event_loop(
        ws_stream: ClientStream,
        mut shutdown_rx: oneshot::Receiver<()>,
        session_id: SessionId,
        sink: EventSink,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &session_id, &sink);
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(session_id = %session_id, ?frame, "WebSocket closed by relay");
                            let detail = frame
                                .map(|f| f.reason.to_string())
                                .filter(|reason| !reason.is_empty())
                                .unwrap_or_else(|| "relay closed the event channel".to_string());
                            sink.transport_error(Some(detail));
                            break;
                        }

                        Some(Err(e)) => {
                            error!(session_id = %session_id, error = %e, "WebSocket error");
                            sink.transport_error(Some(e.to_string()));
                            break;
                        }

                        None => {
                            debug!(session_id = %session_id, "WebSocket stream ended");
                            sink.transport_error(Some("event channel ended".to_string()));
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                _ = &mut shutdown_rx => {
                    debug!(session_id = %session_id, "Shutdown requested");
                    let _ = ws_write.close().await;
                    break;
                }
            }
        }

        debug!(session_id = %session_id, subscription = %sink.id(), "Event loop terminated");
    }

    /// Handles one text frame.
    fn handle_incoming_message(text: &str, session_id: &SessionId, sink: &EventSink) {
        let event = match from_str::<Event>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, text = %text, "Failed to parse incoming message");
                return;
            }
        };

        if !event.is_for(session_id.as_str()) {
            trace!(event = %event.event, instance = ?event.instance, "Event for another instance");
            return;
        }

        match event.parse().into_lifecycle() {
            Some(lifecycle) => {
                debug!(session_id = %session_id, ?lifecycle, "Lifecycle event");
                sink.emit(lifecycle);
            }
            None => trace!(event = %event.event, "Ignoring event"),
        }
    }
}

#[async_trait]
impl EventListener for WsListener {
    async fn subscribe(&self, session_id: &SessionId, sink: EventSink) -> Result<Subscription> {
        let ws_stream = self.connect(session_id).await?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            shutdown_rx,
            session_id.clone(),
            sink.clone(),
        ));

        Ok(Subscription::new(sink, move || {
            let _ = shutdown_tx.send(());
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

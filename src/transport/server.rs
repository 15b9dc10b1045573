//! Local WebSocket relay used by the listener tests.
//!
//! Stands in for the gateway's event channel: binds to `localhost:0`,
//! accepts one client, records the handshake request and hands back the
//! server side of the socket so a test can push frames.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::SinkExt;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for waiting for the client to connect.
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Handshake
// ============================================================================

/// What the client sent in its upgrade request.
#[derive(Debug, Clone, Default)]
pub(crate) struct Handshake {
    /// Request path, e.g. `/sessions/abc/events`.
    pub path: String,
    /// Value of the `apikey` header, if sent.
    pub api_key: Option<String>,
}

// ============================================================================
// TestRelay
// ============================================================================

/// A bound relay that has not accepted its client yet.
pub(crate) struct TestRelay {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Port the relay is bound to.
    port: u16,
}

impl TestRelay {
    /// Binds to a random localhost port.
    pub async fn bind() -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.map_err(|e| Error::connection(e.to_string()))?;
        let port = listener
            .local_addr()
            .map_err(|e| Error::connection(e.to_string()))?
            .port();

        debug!(port, "Test relay bound");

        Ok(Self { listener, port })
    }

    /// Returns the base WebSocket URL of this relay.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/", self.port)
    }

    /// Accepts one client and completes the upgrade.
    pub async fn accept(self) -> Result<(RelaySocket, Handshake)> {
        let (stream, _) = timeout(ACCEPT_TIMEOUT, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(ACCEPT_TIMEOUT.as_millis() as u64))?
            .map_err(|e| Error::connection(e.to_string()))?;

        let captured = Mutex::new(Handshake::default());
        let record = |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
            let mut handshake = captured.lock();
            handshake.path = req.uri().path().to_string();
            handshake.api_key = req
                .headers()
                .get("apikey")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(resp)
        };
        let ws_stream = tokio_tungstenite::accept_hdr_async(stream, record)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        Ok((RelaySocket { ws_stream }, captured.into_inner()))
    }
}

// ============================================================================
// RelaySocket
// ============================================================================

/// Server side of an accepted relay connection.
pub(crate) struct RelaySocket {
    ws_stream: WebSocketStream<TcpStream>,
}

impl RelaySocket {
    /// Sends one text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.ws_stream
            .send(Message::Text(text.to_string().into()))
            .await?;
        Ok(())
    }

    /// Sends a close frame.
    pub async fn close(mut self) -> Result<()> {
        self.ws_stream.close(None).await?;
        Ok(())
    }
}

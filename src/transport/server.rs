//! Listening socket for the capture extension.
//!
//! The extension is the client: its background script dials the host, and
//! reconnects whenever the browser restarts or the service worker is
//! recycled. [`PendingServer`] therefore stays bound for the life of the
//! host and hands out one [`Connection`] per successful dial.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::Connection;
use super::connection::ReadyData;

// ============================================================================
// Constants
// ============================================================================

/// Bound on the WebSocket upgrade after a TCP connect.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PendingServer
// ============================================================================

/// A bound listener waiting for the extension to dial in.
///
/// ```ignore
/// let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 8765).await?;
/// let (connection, ready) = server.accept().await?;
/// ```
pub struct PendingServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl PendingServer {
    /// Binds the listener. Port 0 lets the OS pick one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the address cannot be bound.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "Extension listener bound");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Bound port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// URL the extension should dial, `ws://{ip}:{port}`.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the extension to dial in, upgrades the socket and completes
    /// the READY handshake.
    ///
    /// Can be called again after a connection ends. The wait for a TCP
    /// connect is unbounded; the upgrade and READY are bounded by 30s each.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the listener fails
    /// - [`Error::ConnectionTimeout`] if the upgrade or READY stalls
    /// - [`Error::Connection`] if the client does not speak WebSocket
    pub async fn accept(&self) -> Result<(Connection, ReadyData)> {
        let (stream, peer) = self.listener.accept().await?;
        debug!(%peer, "TCP connection accepted");

        let socket = upgrade(stream).await?;
        info!(%peer, port = self.port(), "Extension socket upgraded");

        let (connection, ready_rx) = Connection::new(socket);
        let ready = Connection::wait_ready(ready_rx).await?;

        Ok((connection, ready))
    }
}

/// Performs the WebSocket upgrade within [`HANDSHAKE_TIMEOUT`].
async fn upgrade(stream: TcpStream) -> Result<WebSocketStream<TcpStream>> {
    timeout(HANDSHAKE_TIMEOUT, tokio_tungstenite::accept_async(stream))
        .await
        .map_err(|_| Error::connection_timeout(HANDSHAKE_TIMEOUT.as_millis() as u64))?
        .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))
}

// ============================================================================
// Tests
// ============================================================================

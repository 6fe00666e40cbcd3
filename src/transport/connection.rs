//! A live extension connection.
//!
//! One spawned task owns the socket. Callers hand it requests over a
//! channel and park on a oneshot keyed by the request ID in the correlation
//! map; the task completes that oneshot when the matching response arrives.
//! Anything else the extension sends is an event, delivered to the installed
//! handler or queued until one is installed.
//!
//! ```text
//! send() ──► command channel ──► event loop ──► WebSocket ──► extension
//!   ▲                                │
//!   └── oneshot ◄── correlation ◄────┤◄── response
//!                                    └──► EventHandler ◄── event
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, TabId};
use crate::protocol::{Event, Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests in flight before new ones are refused.
const MAX_PENDING_REQUESTS: usize = 100;

/// Timeout for the READY handshake.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum events held while no handler is installed.
const MAX_EVENT_BACKLOG: usize = 64;

// ============================================================================
// Types
// ============================================================================

type Socket = WebSocketStream<TcpStream>;

type ReplySender = oneshot::Sender<Result<Response>>;

/// Request ID to waiting caller.
type CorrelationMap = FxHashMap<RequestId, ReplySender>;

/// Pending READY handshake, registered before the event loop starts.
pub(crate) type ReadySignal = oneshot::Receiver<Result<Response>>;

/// Event callback.
///
/// Runs on the event loop for each event, so it must not block. It is
/// dropped when the connection closes.
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

#[derive(Default)]
struct EventSlot {
    handler: Option<EventHandler>,
    /// Events received while no handler was installed.
    backlog: Vec<Event>,
    /// Set once the event loop has exited.
    closed: bool,
}

impl EventSlot {
    fn deliver(&mut self, event: Event) {
        match self.handler {
            Some(ref handler) => handler(event),
            None if self.backlog.len() < MAX_EVENT_BACKLOG => self.backlog.push(event),
            None => warn!(method = %event.method, "Event dropped, backlog full"),
        }
    }
}

/// Work for the event loop.
enum LoopCommand {
    Send {
        request: Request,
        reply_tx: ReplySender,
    },
    /// Forget a request whose caller gave up waiting.
    Abandon(RequestId),
    Shutdown,
}

// ============================================================================
// ReadyData
// ============================================================================

/// What the extension announced in its READY handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyData {
    /// Active tab at connect time, if any.
    pub tab_id: Option<TabId>,
    /// Browser session ID.
    pub session_id: u64,
}

/// READY payload as sent. A `tabId` of 0 means no tab.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ReadyPayload {
    tab_id: u32,
    session_id: u64,
}

impl From<ReadyPayload> for ReadyData {
    fn from(payload: ReadyPayload) -> Self {
        Self {
            tab_id: TabId::new(payload.tab_id),
            session_id: payload.session_id,
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to the extension's WebSocket.
///
/// Clones share the same socket. The socket closes on [`shutdown`] or when
/// the last clone is dropped.
///
/// [`shutdown`]: Connection::shutdown
#[derive(Clone)]
pub struct Connection {
    loop_tx: mpsc::UnboundedSender<LoopCommand>,
    correlation: Arc<Mutex<CorrelationMap>>,
    events: Arc<Mutex<EventSlot>>,
}

impl Connection {
    /// Starts the event loop on an upgraded socket.
    ///
    /// The READY correlation is registered before the loop is spawned, so a
    /// READY sent right after the upgrade is never missed.
    pub(crate) fn new(socket: Socket) -> (Self, ReadySignal) {
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let events = Arc::new(Mutex::new(EventSlot::default()));

        let (ready_tx, ready_rx) = oneshot::channel();
        correlation.lock().insert(RequestId::ready(), ready_tx);

        tokio::spawn(run_event_loop(
            socket,
            loop_rx,
            Arc::clone(&correlation),
            Arc::clone(&events),
        ));

        let connection = Self {
            loop_tx,
            correlation,
            events,
        };
        (connection, ready_rx)
    }

    /// Waits for the extension's READY handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if READY does not arrive within 30s
    /// - [`Error::ConnectionClosed`] if the socket closes first
    /// - [`Error::Json`] if the READY payload is malformed
    pub(crate) async fn wait_ready(ready_rx: ReadySignal) -> Result<ReadyData> {
        let response = timeout(READY_TIMEOUT, ready_rx)
            .await
            .map_err(|_| Error::connection_timeout(READY_TIMEOUT.as_millis() as u64))???;

        let ready = ReadyData::from(response.parse_result::<ReadyPayload>()?);
        debug!(tab_id = ?ready.tab_id, session_id = ready.session_id, "READY received");
        Ok(ready)
    }

    /// Installs the event handler, replacing any previous one.
    ///
    /// Queued events are replayed to it first. On a closed connection the
    /// handler still sees the queue and is then dropped.
    pub fn set_event_handler(&self, handler: EventHandler) {
        let mut slot = self.events.lock();

        for event in slot.backlog.drain(..) {
            handler(event);
        }

        if slot.closed {
            debug!("Connection closed, event handler dropped");
            return;
        }
        slot.handler = Some(handler);
    }

    /// Removes the event handler. Later events are queued again.
    pub fn clear_event_handler(&self) {
        self.events.lock().handler = None;
    }

    /// Returns `true` once the event loop has exited.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events.lock().closed
    }

    /// Sends a request and waits up to 30s for its response.
    ///
    /// # Errors
    ///
    /// See [`send_with_timeout`](Self::send_with_timeout).
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Sends a request and waits up to `request_timeout` for its response.
    ///
    /// An error response from the extension is still `Ok` here; use
    /// [`Response::into_result`] to surface it.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the socket is gone
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if too many requests are already in flight
    pub async fn send_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let in_flight = self.pending_count();
        if in_flight >= MAX_PENDING_REQUESTS {
            warn!(in_flight, method = request.method(), "Request refused, too many in flight");
            return Err(Error::protocol(format!(
                "{in_flight} requests already in flight (max {MAX_PENDING_REQUESTS})"
            )));
        }

        let request_id = request.id;
        let (reply_tx, reply_rx) = oneshot::channel();

        self.loop_tx
            .send(LoopCommand::Send { request, reply_tx })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self.loop_tx.send(LoopCommand::Abandon(request_id));
                Err(Error::request_timeout(
                    request_id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Closes the WebSocket. Pending requests fail with
    /// [`Error::ConnectionClosed`].
    ///
    /// Dropping every clone of the connection has the same effect.
    pub fn shutdown(&self) {
        let _ = self.loop_tx.send(LoopCommand::Shutdown);
    }
}

// ============================================================================
// Event Loop
// ============================================================================

async fn run_event_loop(
    socket: Socket,
    mut loop_rx: mpsc::UnboundedReceiver<LoopCommand>,
    correlation: Arc<Mutex<CorrelationMap>>,
    events: Arc<Mutex<EventSlot>>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => dispatch_incoming(&text, &correlation, &events),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Extension closed the socket");
                    break;
                }
                Some(Err(e)) => {
                    error!(error = %e, "WebSocket read failed");
                    break;
                }
                None => break,
                // Binary, Ping, Pong
                Some(Ok(_)) => {}
            },

            command = loop_rx.recv() => match command {
                Some(LoopCommand::Send { request, reply_tx }) => {
                    write_request(&mut sink, request, reply_tx, &correlation).await;
                }
                Some(LoopCommand::Abandon(request_id)) => {
                    correlation.lock().remove(&request_id);
                    debug!(%request_id, "Abandoned timed-out request");
                }
                Some(LoopCommand::Shutdown) => {
                    let _ = sink.close().await;
                    break;
                }
                // Every Connection clone is gone
                None => break,
            },
        }
    }

    let pending: Vec<ReplySender> = correlation.lock().drain().map(|(_, tx)| tx).collect();
    if !pending.is_empty() {
        debug!(count = pending.len(), "Failing requests on close");
    }
    for tx in pending {
        let _ = tx.send(Err(Error::ConnectionClosed));
    }

    // Drop the handler outside the lock so its captures see the close
    let handler = {
        let mut slot = events.lock();
        slot.closed = true;
        slot.handler.take()
    };
    drop(handler);

    debug!("Event loop terminated");
}

/// Routes one text frame: a response to its waiting caller, an event to the
/// handler.
fn dispatch_incoming(
    text: &str,
    correlation: &Mutex<CorrelationMap>,
    events: &Mutex<EventSlot>,
) {
    if let Ok(response) = serde_json::from_str::<Response>(text) {
        let waiting = correlation.lock().remove(&response.id);
        match waiting {
            Some(tx) => {
                let _ = tx.send(Ok(response));
            }
            None => warn!(id = %response.id, "Response for unknown request"),
        }
        return;
    }

    match serde_json::from_str::<Event>(text) {
        Ok(event) => {
            trace!(method = %event.method, "Event received");
            events.lock().deliver(event);
        }
        Err(e) => warn!(error = %e, text, "Unrecognized message from extension"),
    }
}

/// Registers the caller and writes the request to the socket.
async fn write_request(
    sink: &mut SplitSink<Socket, Message>,
    request: Request,
    reply_tx: ReplySender,
    correlation: &Mutex<CorrelationMap>,
) {
    let json = match serde_json::to_string(&request) {
        Ok(json) => json,
        Err(e) => {
            let _ = reply_tx.send(Err(Error::Json(e)));
            return;
        }
    };

    let request_id = request.id;
    correlation.lock().insert(request_id, reply_tx);

    if let Err(e) = sink.send(Message::Text(json.into())).await {
        if let Some(tx) = correlation.lock().remove(&request_id) {
            let _ = tx.send(Err(Error::connection(e.to_string())));
        }
        return;
    }

    trace!(%request_id, method = request.method(), "Request sent");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use serde_json::json;

    use crate::protocol::{Command, DocumentCommand};
    use crate::testing::FakeExtension;
    use crate::transport::PendingServer;

    async fn connect(fake_tab: u32) -> (Connection, ReadyData, FakeExtension) {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");
        let url = server.ws_url();

        let (accepted, extension) = tokio::join!(
            server.accept(),
            FakeExtension::connect(&url, fake_tab, |method, params| match method {
                "document.scrollTo" => Ok(json!({ "scrolledTo": params["y"] })),
                other => Err(format!("unsupported {other}")),
            })
        );
        let (connection, ready) = accepted.expect("accept should succeed");
        (connection, ready, extension)
    }

    fn scroll_request(y: u32) -> Request {
        let tab_id = TabId::new(1).expect("valid tab id");
        Request::new(tab_id, Command::Document(DocumentCommand::ScrollTo { x: 0, y }))
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_COMMAND_TIMEOUT.as_secs(), 30);
        assert_eq!(MAX_PENDING_REQUESTS, 100);
        assert_eq!(READY_TIMEOUT.as_secs(), 30);
        assert_eq!(MAX_EVENT_BACKLOG, 64);
    }

    #[tokio::test]
    async fn test_ready_handshake() {
        let (_connection, ready, _extension) = connect(4).await;

        assert_eq!(ready.tab_id, TabId::new(4));
        assert_eq!(ready.session_id, FakeExtension::SESSION_ID);
    }

    #[tokio::test]
    async fn test_request_response_correlation() {
        let (connection, _ready, _extension) = connect(1).await;

        let response = connection.send(scroll_request(1200)).await.expect("send");
        assert!(response.is_success());
        assert_eq!(response.into_result().expect("result")["scrolledTo"], 1200);
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_error_response() {
        let (connection, _ready, _extension) = connect(1).await;

        let tab_id = TabId::new(1).expect("valid tab id");
        let request = Request::new(tab_id, Command::Document(DocumentCommand::Measure));
        let err = connection
            .send(request)
            .await
            .expect("send")
            .into_result()
            .unwrap_err();

        assert!(err.to_string().contains("unsupported document.measure"));
    }

    #[tokio::test]
    async fn test_events_reach_handler() {
        let (connection, _ready, extension) = connect(1).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        connection.set_event_handler(Box::new(move |event| {
            let _ = tx.send(event.method);
        }));

        extension.send_event("action.clicked", json!({ "tabId": 1 }));
        assert_eq!(rx.recv().await.as_deref(), Some("action.clicked"));

        // Handler is released once the extension hangs up
        extension.close().await;
        assert!(rx.recv().await.is_none());
        assert!(connection.is_closed());
    }

    #[tokio::test]
    async fn test_events_before_handler_are_replayed() {
        let (connection, _ready, extension) = connect(1).await;

        extension.send_event("action.clicked", json!({ "tabId": 1 }));
        extension.send_event("page.dumpRequested", json!({ "tabId": 1 }));

        // Round-trip a request so both events have reached the connection
        connection.send(scroll_request(0)).await.expect("send");

        let (tx, mut rx) = mpsc::unbounded_channel();
        connection.set_event_handler(Box::new(move |event| {
            let _ = tx.send(event.method);
        }));

        assert_eq!(rx.recv().await.as_deref(), Some("action.clicked"));
        assert_eq!(rx.recv().await.as_deref(), Some("page.dumpRequested"));
    }

    #[tokio::test]
    async fn test_close_fails_new_requests() {
        let (connection, _ready, extension) = connect(1).await;

        extension.close().await;
        let err = connection.send(scroll_request(0)).await.unwrap_err();
        assert!(err.is_connection_error());
    }
}

//! Typed request/response channel.
//!
//! Every request carries its own reply slot, so a caller always receives the
//! answer to its own request. Dropping all callers closes the inbox; dropping
//! the inbox fails pending and future calls with [`Error::ConnectionClosed`].

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// A request paired with its reply slot.
struct Envelope<Req, Resp> {
    request: Req,
    reply_tx: oneshot::Sender<Result<Resp>>,
}

// ============================================================================
// Constructor
// ============================================================================

/// Creates a bounded channel holding at most `capacity` queued requests.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn channel<Req, Resp>(capacity: usize) -> (Caller<Req, Resp>, Inbox<Req, Resp>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Caller { tx }, Inbox { rx })
}

// ============================================================================
// Caller
// ============================================================================

/// Sending half. Cheap to clone.
pub struct Caller<Req, Resp> {
    tx: mpsc::Sender<Envelope<Req, Resp>>,
}

impl<Req, Resp> Clone for Caller<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<Req, Resp> Caller<Req, Resp> {
    /// Sends `request` and waits for its reply.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the inbox is gone
    /// - [`Error::ChannelClosed`] if the responder was dropped unanswered
    /// - Any error the responder replied with
    pub async fn call(&self, request: Req) -> Result<Resp> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Envelope { request, reply_tx })
            .await
            .map_err(|_| Error::ConnectionClosed)?;

        reply_rx.await?
    }

    /// Returns `true` once the inbox has been dropped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Inbox
// ============================================================================

/// Receiving half.
pub struct Inbox<Req, Resp> {
    rx: mpsc::Receiver<Envelope<Req, Resp>>,
}

impl<Req, Resp> Inbox<Req, Resp> {
    /// Waits for the next request. `None` once every caller is dropped.
    pub async fn recv(&mut self) -> Option<(Req, Responder<Resp>)> {
        self.rx.recv().await.map(|envelope| {
            (
                envelope.request,
                Responder {
                    reply_tx: envelope.reply_tx,
                },
            )
        })
    }
}

// ============================================================================
// Responder
// ============================================================================

/// Reply slot for exactly one request.
pub struct Responder<Resp> {
    reply_tx: oneshot::Sender<Result<Resp>>,
}

impl<Resp> Responder<Resp> {
    /// Sends the reply. A caller that stopped waiting is ignored.
    pub fn respond(self, result: Result<Resp>) {
        let _ = self.reply_tx.send(result);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_receives_own_reply() {
        let (caller, mut inbox) = channel::<u32, u32>(4);

        let server = tokio::spawn(async move {
            while let Some((request, responder)) = inbox.recv().await {
                responder.respond(Ok(request * 2));
            }
        });

        assert_eq!(caller.call(21).await.expect("reply"), 42);
        assert_eq!(caller.call(5).await.expect("reply"), 10);

        drop(caller);
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_error_reply_propagates() {
        let (caller, mut inbox) = channel::<(), ()>(1);

        tokio::spawn(async move {
            if let Some((_, responder)) = inbox.recv().await {
                responder.respond(Err(Error::protocol("nope")));
            }
        });

        let err = caller.call(()).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_dropped_inbox_closes_caller() {
        let (caller, inbox) = channel::<(), ()>(1);
        drop(inbox);

        assert!(caller.is_closed());
        assert!(matches!(caller.call(()).await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_dropped_responder_is_channel_closed() {
        let (caller, mut inbox) = channel::<(), ()>(1);

        tokio::spawn(async move {
            let _ = inbox.recv().await;
        });

        assert!(matches!(caller.call(()).await, Err(Error::ChannelClosed(_))));
    }

    #[tokio::test]
    async fn test_inbox_ends_when_callers_dropped() {
        let (caller, mut inbox) = channel::<(), ()>(1);
        drop(caller);
        assert!(inbox.recv().await.is_none());
    }
}

//! Extension host: turns browser events into capture sessions.
//!
//! # Event Flow
//!
//! ```text
//! action.clicked {tabId}      ──► Pipeline::run(RemoteTab) ──► upload image
//! page.dumpRequested {tabId}  ──► RemoteTab::dump_page     ──► upload dump
//! ```
//!
//! Each trigger runs as its own task. Triggers that arrive while a capture
//! is running are rejected by the pipeline and logged.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::pipeline::{Pipeline, SessionReport, UploadOutcome};
use crate::protocol::ParsedEvent;
use crate::transport::{Connection, PendingServer};

use super::RemoteTab;

// ============================================================================
// Types
// ============================================================================

/// What a trigger task produced.
enum TaskOutcome {
    Capture(TabId, Result<SessionReport>),
    Dump(TabId, Result<UploadOutcome>),
}

// ============================================================================
// Host
// ============================================================================

/// Serves the extension connection and runs a session per trigger.
#[derive(Clone)]
pub struct Host {
    pipeline: Arc<Pipeline>,
}

impl Host {
    /// Creates a host running sessions on `pipeline`.
    #[inline]
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Returns the pipeline.
    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Accepts the extension, serves it until it disconnects, and waits for
    /// it to reconnect. Runs until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the listener fails. Failed handshakes are
    /// logged and the host keeps listening.
    pub async fn serve(self, server: PendingServer) -> Result<()> {
        info!(url = %server.ws_url(), "Waiting for extension");

        loop {
            match server.accept().await {
                Ok((connection, ready)) => {
                    info!(
                        tab_id = ?ready.tab_id,
                        session_id = ready.session_id,
                        "Extension connected"
                    );
                    self.serve_connection(connection).await;
                    info!("Extension disconnected");
                }
                Err(Error::Io(e)) => return Err(Error::Io(e)),
                Err(e) => warn!(error = %e, "Extension handshake failed"),
            }
        }
    }

    /// Serves one connection until it closes.
    ///
    /// Running sessions are awaited before returning.
    pub async fn serve_connection(&self, connection: Connection) {
        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel();

        connection.set_event_handler(Box::new(move |event| match event.parse() {
            ParsedEvent::Unknown { method, .. } => {
                debug!(%method, "Ignoring event");
            }
            trigger => {
                let _ = trigger_tx.send(trigger);
            }
        }));

        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                trigger = trigger_rx.recv() => match trigger {
                    Some(trigger) => self.spawn_trigger(&mut tasks, &connection, trigger),
                    None => break,
                },

                Some(joined) = tasks.join_next() => Self::log_outcome(joined),
            }
        }

        while let Some(joined) = tasks.join_next().await {
            Self::log_outcome(joined);
        }
    }

    /// Starts the task for one trigger.
    fn spawn_trigger(
        &self,
        tasks: &mut JoinSet<TaskOutcome>,
        connection: &Connection,
        trigger: ParsedEvent,
    ) {
        let pipeline = Arc::clone(&self.pipeline);

        match trigger {
            ParsedEvent::ActionClicked { tab_id } => {
                debug!(%tab_id, "Capture triggered");
                let tab = RemoteTab::new(connection.clone(), tab_id);
                tasks.spawn(async move {
                    TaskOutcome::Capture(tab_id, pipeline.run(tab.clone(), tab).await)
                });
            }

            ParsedEvent::DumpRequested { tab_id } => {
                debug!(%tab_id, "Dump triggered");
                let tab = RemoteTab::new(connection.clone(), tab_id);
                tasks.spawn(async move {
                    TaskOutcome::Dump(tab_id, dump_and_upload(&pipeline, &tab).await)
                });
            }

            ParsedEvent::Unknown { .. } => {}
        }
    }

    fn log_outcome(joined: std::result::Result<TaskOutcome, JoinError>) {
        match joined {
            Ok(TaskOutcome::Capture(tab_id, Ok(report))) => {
                info!(
                    %tab_id,
                    session_id = %report.session_id,
                    tiles = report.tile_count,
                    upload = ?report.upload,
                    "Capture complete"
                );
            }
            Ok(TaskOutcome::Capture(tab_id, Err(Error::SessionInProgress))) => {
                warn!(%tab_id, "Capture already running, trigger ignored");
            }
            Ok(TaskOutcome::Capture(tab_id, Err(e))) => {
                error!(%tab_id, kind = ?e.kind(), error = %e, "Capture failed");
            }
            Ok(TaskOutcome::Dump(tab_id, Ok(upload))) => {
                info!(%tab_id, ?upload, "Page dump complete");
            }
            Ok(TaskOutcome::Dump(tab_id, Err(e))) => {
                error!(%tab_id, error = %e, "Page dump failed");
            }
            Err(e) => {
                error!(error = %e, "Trigger task panicked");
            }
        }
    }
}

// ============================================================================
// Page Dump
// ============================================================================

/// Dumps the page and uploads it. Upload failures are reported, not raised.
async fn dump_and_upload(pipeline: &Pipeline, tab: &RemoteTab) -> Result<UploadOutcome> {
    let dump = tab.dump_page().await?;

    match pipeline.uploader().upload_dump(&dump).await {
        Ok(response) => Ok(UploadOutcome::Delivered(response)),
        Err(e) => {
            warn!(tab_id = %tab.tab_id(), error = %e, "Dump upload failed");
            Ok(UploadOutcome::Failed(e.to_string()))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

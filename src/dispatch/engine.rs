//! Dispatch run orchestration.
//!
//! One engine drives at most one run at a time. `start` spawns a background
//! worker that opens a single SMTP session, sends one message per recipient
//! in order, reports everything through the event stream, closes the session
//! exactly once, and always ends the stream with `Finished`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::dispatch::events::{self, DispatchEvents, EventSender, SendOutcome};
use crate::dispatch::message::MessageBuilder;
use crate::dispatch::session::{MailTransport, SmtpTransportFactory, TransportError, TransportFactory};
use crate::models::TransportSettings;

const CANCELLED_NOTE: &str = "Sending cancelled by user.";

#[derive(Debug, Error)]
pub enum DispatchError {
    /// `start` was called while a run is active.
    #[error("a dispatch run is already in progress")]
    RunInProgress,
    /// Host, username or password missing; nothing was attempted.
    #[error("SMTP settings incomplete. Please configure SMTP.")]
    SettingsIncomplete,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Everything one run needs, captured by value at start. The engine never
/// re-reads stores mid-run, so concurrent edits cannot affect a run in flight.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub settings: TransportSettings,
    /// Already trimmed, deduplicated and order-preserving; the engine does
    /// not re-deduplicate.
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

/// Bulk-mail dispatch engine.
///
/// Clones share the same single-run guard and cancellation flag, so a clone
/// handed to a signal handler cancels the run started from the original.
#[derive(Clone)]
pub struct DispatchEngine {
    factory: Arc<dyn TransportFactory>,
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl DispatchEngine {
    /// Engine with the production lettre-backed transport.
    pub fn new() -> Self {
        Self::with_transport_factory(Arc::new(SmtpTransportFactory))
    }

    pub fn with_transport_factory(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts one dispatch run on a background task and returns its event
    /// stream. Rejects a concurrent start instead of queueing. Must be called
    /// within a tokio runtime.
    pub fn start(&self, request: DispatchRequest) -> Result<DispatchEvents, DispatchError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(DispatchError::RunInProgress);
        }
        // A cancel requested while idle must not leak into this run.
        self.cancel.store(false, Ordering::SeqCst);

        let run_id = Uuid::new_v4();
        info!(
            "dispatch run {} started: {} recipient(s) via {}:{}",
            run_id,
            request.recipients.len(),
            request.settings.host,
            request.settings.port
        );

        let (sender, stream) = events::channel();
        tokio::spawn(run_dispatch(
            run_id,
            self.factory.clone(),
            request,
            sender,
            self.cancel.clone(),
            self.running.clone(),
        ));
        Ok(stream)
    }

    /// Asks the active run to stop before its next recipient. Cooperative: an
    /// in-flight send is never interrupted. Idempotent, and a no-op when no
    /// run is active.
    pub fn request_cancel(&self) {
        if self.running.load(Ordering::SeqCst) {
            info!("cancellation requested");
            self.cancel.store(true, Ordering::SeqCst);
        } else {
            debug!("cancellation requested with no active run, ignoring");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Connect, optionally authenticate, and disconnect without sending
    /// anything. Runs on its own session, independent of any dispatch run.
    pub async fn test_connection(
        &self,
        settings: &TransportSettings,
    ) -> Result<(), DispatchError> {
        if !settings.is_complete() {
            return Err(DispatchError::SettingsIncomplete);
        }
        let mut transport = self.factory.create();
        let outcome = open_session(transport.as_mut(), settings).await;
        transport.close().await;
        outcome?;
        Ok(())
    }
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// The worker task for one run. Owns the run state for its whole lifetime;
/// releases the engine's running flag before emitting `Finished` so a caller
/// reacting to `Finished` can immediately start the next run.
async fn run_dispatch(
    run_id: Uuid,
    factory: Arc<dyn TransportFactory>,
    request: DispatchRequest,
    events: EventSender,
    cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
) {
    if !request.settings.is_complete() {
        let reason = DispatchError::SettingsIncomplete.to_string();
        error!("dispatch run {} aborted: {}", run_id, reason);
        events.fatal(reason);
    } else {
        let mut transport = factory.create();
        match open_session(transport.as_mut(), &request.settings).await {
            Ok(()) => send_to_all(transport.as_mut(), &request, &events, &cancel).await,
            Err(err) => {
                let reason = format!("SMTP error: {}", err);
                error!("dispatch run {} aborted: {}", run_id, reason);
                events.fatal(reason);
            }
        }
        // Exactly one close per run, on every exit path past this point.
        transport.close().await;
    }

    running.store(false, Ordering::SeqCst);
    events.finished();
    info!("dispatch run {} finished", run_id);
}

/// Connect and, when a username is configured, authenticate. An error from
/// either step is fatal for the run.
async fn open_session(
    transport: &mut dyn MailTransport,
    settings: &TransportSettings,
) -> Result<(), TransportError> {
    transport.connect(settings).await?;
    if !settings.username.is_empty() {
        transport
            .authenticate(&settings.username, &settings.password)
            .await?;
    }
    Ok(())
}

/// The sequential recipient loop. One recipient's failure never aborts the
/// loop; only cancellation breaks out early.
async fn send_to_all(
    transport: &mut dyn MailTransport,
    request: &DispatchRequest,
    events: &EventSender,
    cancel: &AtomicBool,
) {
    let builder = MessageBuilder::new(
        request.settings.username.clone(),
        request.subject.clone(),
        request.body.clone(),
        request.attachments.clone(),
    );
    let total = request.recipients.len();

    for (i, recipient) in request.recipients.iter().enumerate() {
        let index = i + 1;
        // Observed once per iteration; recipients from here on are simply
        // not processed, not marked failed.
        if cancel.load(Ordering::SeqCst) {
            info!("cancelled before recipient {}/{}", index, total);
            events.progress(CANCELLED_NOTE);
            break;
        }

        let outcome = match builder.build(recipient).await {
            Ok(built) => {
                for note in &built.skipped_attachments {
                    warn!("{}", note);
                    events.progress(note.clone());
                }
                match transport.submit(&built.message).await {
                    Ok(()) => SendOutcome::Sent,
                    Err(err) => SendOutcome::Failed {
                        reason: err.to_string(),
                    },
                }
            }
            Err(err) => SendOutcome::Failed {
                reason: err.to_string(),
            },
        };

        if let SendOutcome::Failed { reason } = &outcome {
            warn!("send to {} failed: {}", recipient, reason);
        }
        events.outcome(recipient, index, total, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_incomplete_message_matches_the_ui_text() {
        assert_eq!(
            DispatchError::SettingsIncomplete.to_string(),
            "SMTP settings incomplete. Please configure SMTP."
        );
    }

    #[test]
    fn run_in_progress_is_reported_as_such() {
        assert_eq!(
            DispatchError::RunInProgress.to_string(),
            "a dispatch run is already in progress"
        );
    }
}

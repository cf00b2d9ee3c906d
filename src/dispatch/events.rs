//! Event model for dispatch runs.
//!
//! A run reports everything it does through a single ordered stream of
//! `DispatchEvent`s: informational progress lines, one outcome per attempted
//! recipient, at most one fatal error, and a final `Finished`. The stream is
//! an unbounded mpsc channel, so the worker never blocks on a slow consumer
//! and the consumer sees events in exactly the order they were emitted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Result of one per-recipient send attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    Sent,
    Failed { reason: String },
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent)
    }
}

/// One entry in a dispatch run's event stream.
///
/// Consumed strictly in emission order. `Finished` is always the last event
/// of a run and is the authoritative signal that the worker is done and its
/// resources (including the transport session) are released.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// Informational line: attachment skips, cancellation notice.
    Progress {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Outcome for recipient `index` of `total` (1-based, input order).
    RecipientOutcome {
        recipient: String,
        index: usize,
        total: usize,
        outcome: SendOutcome,
        timestamp: DateTime<Utc>,
    },
    /// The run was aborted before or while opening the session. At most one
    /// per run, always followed by `Finished`.
    FatalError {
        reason: String,
        timestamp: DateTime<Utc>,
    },
    Finished {
        timestamp: DateTime<Utc>,
    },
}

impl fmt::Display for DispatchEvent {
    /// The fixed human-readable line for each event, as shown in the log view.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchEvent::Progress { message, .. } => f.write_str(message),
            DispatchEvent::RecipientOutcome {
                recipient,
                index,
                total,
                outcome,
                ..
            } => match outcome {
                SendOutcome::Sent => write!(f, "[{}/{}] Sent to {}", index, total, recipient),
                SendOutcome::Failed { reason } => {
                    write!(f, "[{}/{}] Failed to {}: {}", index, total, recipient, reason)
                }
            },
            DispatchEvent::FatalError { reason, .. } => write!(f, "ERROR: {}", reason),
            DispatchEvent::Finished { .. } => f.write_str("Done."),
        }
    }
}

/// Receiving half of a run's event stream, returned by `DispatchEngine::start`.
///
/// The channel closes after `Finished` has been delivered and the worker has
/// exited, so draining with `recv()` until `None` always terminates.
#[derive(Debug)]
pub struct DispatchEvents {
    receiver: mpsc::UnboundedReceiver<DispatchEvent>,
}

impl DispatchEvents {
    /// Next event, or `None` once the run is over and the stream is drained.
    pub async fn recv(&mut self) -> Option<DispatchEvent> {
        self.receiver.recv().await
    }
}

/// Sending half, held by the worker task.
pub(crate) struct EventSender {
    sender: mpsc::UnboundedSender<DispatchEvent>,
}

impl EventSender {
    fn emit(&self, event: DispatchEvent) {
        // A dropped receiver must not stop the run.
        let _ = self.sender.send(event);
    }

    pub(crate) fn progress(&self, message: impl Into<String>) {
        self.emit(DispatchEvent::Progress {
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn outcome(&self, recipient: &str, index: usize, total: usize, outcome: SendOutcome) {
        self.emit(DispatchEvent::RecipientOutcome {
            recipient: recipient.to_string(),
            index,
            total,
            outcome,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn fatal(&self, reason: impl Into<String>) {
        self.emit(DispatchEvent::FatalError {
            reason: reason.into(),
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn finished(&self) {
        self.emit(DispatchEvent::Finished {
            timestamp: Utc::now(),
        });
    }
}

/// Ordered event channel for one run.
pub(crate) fn channel() -> (EventSender, DispatchEvents) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EventSender { sender }, DispatchEvents { receiver })
}

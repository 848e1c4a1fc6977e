// Progress events — the transport-agnostic stream both orchestrators emit.
//
// Orchestrators push events into an unbounded channel through EventSink;
// the transport layer (SSE handler, CLI progress bar) drains the receiver.
// When the receiver is dropped — an SSE client disconnecting — the next
// emit flips the shared cancel flag, which orchestrators poll at
// account/wave boundaries. Cancellation is cooperative: an in-flight call
// is never preempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use super::fetch::FetchRunResult;
use super::translate::TranslateSummary;

/// Shared cooperative cancellation flag.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Emitted once per fetch run, before any account is processed, and only
/// when a purge actually deleted something.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupEvent {
    pub purged_expired: usize,
    pub purged_orphans: usize,
}

/// Emitted once per tracked account as it completes.
#[derive(Debug, Clone, Serialize)]
pub struct AccountProgressEvent {
    pub current: usize,
    pub total: usize,
    pub account: String,
    pub tweets_received: usize,
    pub filtered: usize,
    pub new_posts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Emitted per successfully translated post.
#[derive(Debug, Clone, Serialize)]
pub struct TranslatedEvent {
    pub post_id: String,
    pub translated_text: String,
    pub comment_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_translated_text: Option<String>,
    pub current: usize,
    pub total: usize,
}

/// Emitted per failed post.
#[derive(Debug, Clone, Serialize)]
pub struct TranslateErrorEvent {
    pub post_id: String,
    pub error: String,
    pub current: usize,
    pub total: usize,
}

/// Everything the pipelines can report while running.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Cleanup(CleanupEvent),
    Account(AccountProgressEvent),
    Translated(TranslatedEvent),
    TranslateError(TranslateErrorEvent),
    FetchDone(FetchRunResult),
    TranslateDone(TranslateSummary),
}

impl ProgressEvent {
    /// Wire name of the event, as seen by streaming clients.
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Cleanup(_) => "cleanup",
            ProgressEvent::Account(_) => "progress",
            ProgressEvent::Translated(_) => "translated",
            ProgressEvent::TranslateError(_) => "error",
            ProgressEvent::FetchDone(_) | ProgressEvent::TranslateDone(_) => "done",
        }
    }

    /// JSON payload of the event.
    pub fn payload(&self) -> serde_json::Value {
        let result = match self {
            ProgressEvent::Cleanup(e) => serde_json::to_value(e),
            ProgressEvent::Account(e) => serde_json::to_value(e),
            ProgressEvent::Translated(e) => serde_json::to_value(e),
            ProgressEvent::TranslateError(e) => serde_json::to_value(e),
            ProgressEvent::FetchDone(e) => serde_json::to_value(e),
            ProgressEvent::TranslateDone(e) => serde_json::to_value(e),
        };
        result.unwrap_or(serde_json::Value::Null)
    }
}

/// Sender half handed to an orchestrator.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    cancel: CancelFlag,
}

impl EventSink {
    /// Create a sink plus the receiver the transport layer drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                cancel: CancelFlag::new(),
            },
            rx,
        )
    }

    /// The cancel flag this sink flips when its consumer goes away.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Push an event. A closed receiver marks the run cancelled instead
    /// of erroring — the work itself is still valid, there's just nobody
    /// left to watch it.
    pub fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_receiver_flips_cancel_flag() {
        let (sink, rx) = EventSink::channel();
        let cancel = sink.cancel_flag();
        assert!(!cancel.is_cancelled());

        drop(rx);
        sink.emit(ProgressEvent::Cleanup(CleanupEvent {
            purged_expired: 1,
            purged_orphans: 0,
        }));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn event_names_match_the_wire_protocol() {
        let cleanup = ProgressEvent::Cleanup(CleanupEvent {
            purged_expired: 0,
            purged_orphans: 0,
        });
        assert_eq!(cleanup.name(), "cleanup");

        let translated = ProgressEvent::Translated(TranslatedEvent {
            post_id: "1".to_string(),
            translated_text: "x".to_string(),
            comment_text: String::new(),
            quoted_translated_text: None,
            current: 1,
            total: 2,
        });
        assert_eq!(translated.name(), "translated");
        // Absent quoted translation is omitted from the payload entirely
        assert!(translated.payload().get("quoted_translated_text").is_none());
    }
}

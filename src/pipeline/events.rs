// file: src/pipeline/events.rs
// description: ordered progress channel between a pipeline run and its consumer
// reference: https://docs.rs/tokio/latest/tokio/sync/mpsc

use crate::error::Result;
use crate::pipeline::state::ProgressUpdate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

pub const TIMEOUT_MESSAGE: &str = "Processing timed out.";
pub const INTERRUPTED_MESSAGE: &str = "Processing stopped unexpectedly.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineEvent {
    Processing {
        stage: String,
        progress: u8,
        message: String,
    },
    Completed {
        progress: u8,
        message: String,
        company_id: String,
        markdown: String,
    },
    Error {
        message: String,
    },
}

impl PipelineEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing { .. })
    }

    pub fn progress(&self) -> Option<u8> {
        match self {
            Self::Processing { progress, .. } | Self::Completed { progress, .. } => Some(*progress),
            Self::Error { .. } => None,
        }
    }

    /// Formats the event as one server-sent-events frame.
    pub fn to_sse(&self) -> Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Event(PipelineEvent),
    End,
}

/// Producer half. Sending never blocks and never fails the run.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: UnboundedSender<StreamItem>,
}

impl ProgressSender {
    pub fn send(&self, event: PipelineEvent) {
        if self.tx.send(StreamItem::Event(event)).is_err() {
            debug!("Progress consumer is gone, dropping event");
        }
    }

    /// Emits a `processing` event for a non-terminal update.
    pub fn stage(&self, update: ProgressUpdate) {
        if let Some(stage) = update.stage_key {
            self.send(PipelineEvent::Processing {
                stage: stage.to_string(),
                progress: update.progress,
                message: update.message.to_string(),
            });
        }
    }

    pub fn end(&self) {
        if self.tx.send(StreamItem::End).is_err() {
            debug!("Progress consumer is gone, dropping end marker");
        }
    }
}

/// Consumer half with an inactivity timeout.
#[derive(Debug)]
pub struct ProgressStream {
    rx: UnboundedReceiver<StreamItem>,
    timeout: Duration,
    terminal_seen: bool,
    finished: bool,
}

impl ProgressStream {
    /// Next event, or `None` once the stream has ended.
    ///
    /// If nothing arrives within the timeout a synthetic error event is yielded
    /// and the stream ends. A producer that disappears without a terminal event
    /// also yields one synthetic error.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        if self.finished {
            return None;
        }

        match tokio::time::timeout(self.timeout, self.rx.recv()).await {
            Ok(Some(StreamItem::Event(event))) => {
                if event.is_terminal() {
                    self.terminal_seen = true;
                }
                Some(event)
            }
            Ok(Some(StreamItem::End)) => {
                self.finished = true;
                None
            }
            Ok(None) => {
                self.finished = true;
                if self.terminal_seen {
                    None
                } else {
                    warn!("Pipeline task ended without a terminal event");
                    Some(PipelineEvent::error(INTERRUPTED_MESSAGE))
                }
            }
            Err(_) => {
                warn!("No progress for {:?}, giving up on the stream", self.timeout);
                self.finished = true;
                Some(PipelineEvent::error(TIMEOUT_MESSAGE))
            }
        }
    }

    pub async fn collect_events(mut self) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }
}

pub fn progress_channel(timeout: Duration) -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressSender { tx },
        ProgressStream {
            rx,
            timeout,
            terminal_seen: false,
            finished: false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_event_json_shapes() {
        let processing = PipelineEvent::Processing {
            stage: "pages".to_string(),
            progress: 25,
            message: "Saving PDF pages to database...".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&processing).unwrap(),
            json!({"status": "processing", "stage": "pages", "progress": 25,
                   "message": "Saving PDF pages to database..."})
        );

        let completed = PipelineEvent::Completed {
            progress: 100,
            message: "done".to_string(),
            company_id: "c1".to_string(),
            markdown: "# Note".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&completed).unwrap(),
            json!({"status": "completed", "progress": 100, "message": "done",
                   "company_id": "c1", "markdown": "# Note"})
        );

        assert_eq!(
            serde_json::to_value(PipelineEvent::error("boom")).unwrap(),
            json!({"status": "error", "message": "boom"})
        );
    }

    #[test]
    fn test_to_sse_frame() {
        let frame = PipelineEvent::error("boom").to_sse().unwrap();
        assert_eq!(frame, "data: {\"status\":\"error\",\"message\":\"boom\"}\n\n");
    }

    #[tokio::test]
    async fn test_events_arrive_in_order_then_end() {
        let (sender, stream) = progress_channel(Duration::from_secs(5));
        sender.send(PipelineEvent::error("first"));
        sender.end();
        sender.send(PipelineEvent::error("after end"));

        let events = stream.collect_events().await;
        assert_eq!(events, vec![PipelineEvent::error("first")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactivity_timeout_yields_error_then_ends() {
        let (sender, mut stream) = progress_channel(Duration::from_secs(600));

        let event = stream.next_event().await;
        assert_eq!(event, Some(PipelineEvent::error(TIMEOUT_MESSAGE)));
        assert_eq!(stream.next_event().await, None);

        // The producer keeps working unaffected.
        sender.send(PipelineEvent::error("late"));
    }

    #[tokio::test]
    async fn test_dropped_producer_without_terminal_event() {
        let (sender, mut stream) = progress_channel(Duration::from_secs(5));
        drop(sender);
        assert_eq!(
            stream.next_event().await,
            Some(PipelineEvent::error(INTERRUPTED_MESSAGE))
        );
        assert_eq!(stream.next_event().await, None);
    }

    #[test]
    fn test_stage_update_without_key_is_not_sent() {
        let (sender, stream) = progress_channel(Duration::from_secs(5));
        sender.stage(ProgressUpdate {
            stage_key: None,
            progress: 100,
            message: "done",
        });
        sender.stage(ProgressUpdate {
            stage_key: Some("details"),
            progress: 5,
            message: "Extracting company details...",
        });
        sender.end();

        let events = tokio_test::block_on(stream.collect_events());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].progress(), Some(5));
    }

    #[tokio::test]
    async fn test_send_after_consumer_dropped_is_ignored() {
        let (sender, stream) = progress_channel(Duration::from_secs(5));
        drop(stream);
        sender.send(PipelineEvent::error("nobody listens"));
        sender.end();
    }
}

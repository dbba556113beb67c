// file: src/pipeline/progress.rs
// description: terminal progress rendering for pipeline event streams
// reference: uses indicatif for progress bars

use crate::pipeline::events::{PipelineEvent, ProgressStream};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Stage counts and timing for one observed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub stages_seen: Vec<String>,
    pub duration: Duration,
}

pub struct ProgressTracker {
    bar: ProgressBar,
    stages_seen: Vec<String>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(colored: bool) -> Self {
        Self::with_bar(create_progress_bar(colored))
    }

    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            stages_seen: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn handle(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Processing {
                stage,
                progress,
                message,
            } => {
                self.stages_seen.push(stage.clone());
                self.bar.set_position(u64::from(*progress));
                self.bar.set_message(message.clone());
            }
            PipelineEvent::Completed {
                progress, message, ..
            } => {
                self.bar.set_position(u64::from(*progress));
                self.bar.finish_with_message(message.clone());
            }
            PipelineEvent::Error { message } => {
                self.bar.abandon_with_message(message.clone());
            }
        }
    }

    /// Drains the stream, returning the terminal event if one arrived.
    pub async fn track(&mut self, mut stream: ProgressStream) -> Option<PipelineEvent> {
        let mut terminal = None;
        while let Some(event) = stream.next_event().await {
            self.handle(&event);
            if event.is_terminal() {
                terminal = Some(event);
            }
        }
        terminal
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            stages_seen: self.stages_seen.clone(),
            duration: self.start_time.elapsed(),
        }
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn create_progress_bar(colored: bool) -> ProgressBar {
    let bar = ProgressBar::new(100);
    let template = if colored {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}"
    } else {
        "{spinner} [{elapsed_precise}] [{bar:40}] {pos:>3}% {msg}"
    };
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(if colored { "█▓▒░" } else { "=>-" });
    bar.set_style(style);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::events::progress_channel;
    use pretty_assertions::assert_eq;

    fn processing(stage: &str, progress: u8) -> PipelineEvent {
        PipelineEvent::Processing {
            stage: stage.to_string(),
            progress,
            message: format!("{}...", stage),
        }
    }

    #[test]
    fn test_tracker_follows_progress() {
        let mut tracker = ProgressTracker::hidden();
        tracker.handle(&processing("details", 5));
        tracker.handle(&processing("markdown", 90));
        assert_eq!(tracker.position(), 90);
        assert_eq!(tracker.stats().stages_seen, vec!["details", "markdown"]);
    }

    #[tokio::test]
    async fn test_track_returns_terminal_event() {
        let (sender, stream) = progress_channel(Duration::from_secs(5));
        sender.send(processing("checklist", 75));
        sender.send(PipelineEvent::Completed {
            progress: 100,
            message: "done".to_string(),
            company_id: "c1".to_string(),
            markdown: "# Note".to_string(),
        });
        sender.end();

        let mut tracker = ProgressTracker::hidden();
        let terminal = tracker.track(stream).await;
        assert!(matches!(terminal, Some(PipelineEvent::Completed { .. })));
        assert_eq!(tracker.position(), 100);
    }
}

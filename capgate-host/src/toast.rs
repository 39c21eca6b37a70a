//! Non-blocking user notifications
//!
//! A [`Notifier`] only dispatches a message to the presentation layer; the
//! guarded action never waits for it to be shown or dismissed.

use std::time::Duration;

use crate::recording::Recorder;

/// Presentation sink for informational toasts
pub trait Notifier: Send + Sync {
    /// Show `message` for roughly `duration`
    fn info(&self, message: &str, duration: Duration);
}

/// Notifier that renders toasts as `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str, duration: Duration) {
        tracing::info!(duration_ms = duration.as_millis() as u64, "{}", message);
    }
}

/// A toast captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNotice {
    pub message: String,
    pub duration: Duration,
}

/// Notifier that records toasts for testing
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Recorder<RecordedNotice>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<RecordedNotice> {
        self.notices.items()
    }

    pub fn count(&self) -> usize {
        self.notices.len()
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str, duration: Duration) {
        self.notices.push(RecordedNotice {
            message: message.to_string(),
            duration,
        });
    }
}

impl std::fmt::Debug for RecordingNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingNotifier")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.info("Downloading photos...", Duration::from_millis(3000));

        assert_eq!(notifier.count(), 1);
        let notices = notifier.notices();
        assert_eq!(notices[0].message, "Downloading photos...");
        assert_eq!(notices[0].duration, Duration::from_secs(3));
    }

    #[test]
    fn test_tracing_notifier_does_not_block() {
        TracingNotifier.info("hello", Duration::ZERO);
    }
}

//! Shared bookkeeping for the recording test doubles

use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;

/// Append-only log that async code can wait on
pub(crate) struct Recorder<T> {
    items: Mutex<Vec<T>>,
    notify: Notify,
}

impl<T: Clone> Recorder<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    pub(crate) fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
        self.notify.notify_waiters();
    }

    pub(crate) fn items(&self) -> Vec<T> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn clear(&self) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Resolve once at least `count` items have been recorded
    pub(crate) async fn wait_for(&self, count: usize) {
        loop {
            // Registered before the check so a push in between still wakes us
            let notified = self.notify.notified();
            if self.len() >= count {
                return;
            }
            notified.await;
        }
    }
}

impl<T: Clone> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_for_already_satisfied() {
        let recorder = Recorder::new();
        recorder.push(1);
        recorder.wait_for(1).await;
        assert_eq!(recorder.items(), vec![1]);
    }

    #[tokio::test]
    async fn test_wait_for_later_push() {
        let recorder = Arc::new(Recorder::new());
        let pusher = Arc::clone(&recorder);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            pusher.push("a");
            pusher.push("b");
        });

        tokio::time::timeout(Duration::from_secs(2), recorder.wait_for(2))
            .await
            .unwrap();
        assert_eq!(recorder.len(), 2);

        recorder.clear();
        assert_eq!(recorder.len(), 0);
    }
}

//! Observable holder for the published asset list
//!
//! The recent-assets hook and [`crate::sync::AssetSync`] write through the
//! [`AssetStore`] trait. Every publish replaces the whole list.

use capgate_api::AssetRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// Destination for enriched asset lists
pub trait AssetStore: Send + Sync {
    /// Replace the stored list with `assets`
    fn set_assets(&self, assets: Vec<AssetRecord>);
}

/// In-memory store that UI code can observe through a `watch` channel
#[derive(Debug)]
pub struct MemoryAssetStore {
    sender: watch::Sender<Vec<AssetRecord>>,
    publishes: AtomicUsize,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            sender,
            publishes: AtomicUsize::new(0),
        }
    }

    /// Snapshot of the current list
    pub fn assets(&self) -> Vec<AssetRecord> {
        self.sender.borrow().clone()
    }

    /// Receiver that observes every replacement
    pub fn subscribe(&self) -> watch::Receiver<Vec<AssetRecord>> {
        self.sender.subscribe()
    }

    /// Number of times the list has been replaced
    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore for MemoryAssetStore {
    fn set_assets(&self, assets: Vec<AssetRecord>) {
        let count = assets.len();
        // send_replace works without live receivers
        self.sender.send_replace(assets);
        self.publishes.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(count, "Asset list replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capgate_api::RawAsset;
    use chrono::{TimeZone, Utc};

    fn record(id: &str) -> AssetRecord {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        AssetRecord::from_raw(&RawAsset::photo(id, time))
    }

    #[test]
    fn test_set_assets_replaces() {
        let store = MemoryAssetStore::new();
        assert!(store.assets().is_empty());

        store.set_assets(vec![record("a"), record("b")]);
        store.set_assets(vec![record("c")]);

        let ids: Vec<String> = store.assets().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["c"]);
        assert_eq!(store.publish_count(), 2);
    }

    #[tokio::test]
    async fn test_subscriber_sees_updates() {
        let store = MemoryAssetStore::new();
        let mut rx = store.subscribe();

        store.set_assets(vec![record("a")]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}

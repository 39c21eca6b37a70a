//! Recent photos for the in-app media picker
//!
//! The pipeline is always run from scratch: look up the "Recents" smart
//! album, query the newest page (or the whole library when there is no such
//! album), enrich every item, and publish the list to the [`AssetStore`].

use capgate_api::{AssetQuery, AssetRecord, Capability, DEFAULT_PAGE_SIZE, RECENTS_ALBUM_TITLE};
use futures::future::join_all;
use std::sync::Arc;

use crate::audit;
use crate::backend::MediaLibraryBackend;
use crate::error::{BackendError, BackendResult};
use crate::guard::Guard;
use crate::permission::AlertKeys;
use crate::store::AssetStore;

const ALERT: AlertKeys = AlertKeys::new("media_picker", "alert.media_library");

#[derive(Clone)]
pub struct MediaPicker {
    guard: Guard,
    library: Arc<dyn MediaLibraryBackend>,
    store: Arc<dyn AssetStore>,
    page_size: usize,
    recents_album: String,
}

impl MediaPicker {
    pub fn new(
        guard: Guard,
        library: Arc<dyn MediaLibraryBackend>,
        store: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            guard,
            library,
            store,
            page_size: DEFAULT_PAGE_SIZE,
            recents_album: RECENTS_ALBUM_TITLE.to_string(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Title of the smart album that holds recent items
    pub fn with_recents_album(mut self, title: impl Into<String>) -> Self {
        self.recents_album = title.into();
        self
    }

    pub fn library(&self) -> &Arc<dyn MediaLibraryBackend> {
        &self.library
    }

    /// Fetch, enrich and publish the newest photos
    ///
    /// Returns the number of records published, or `Ok(None)` when access
    /// was refused (the store is left untouched then).
    pub async fn list_recent_assets(&self) -> BackendResult<Option<usize>> {
        self.guard
            .run(
                Capability::MediaLibrary,
                ALERT,
                None,
                "list_recent_assets",
                move || async move {
                    let records = self.fetch_recent().await?;
                    let count = records.len();
                    self.store.set_assets(records);
                    audit::emit(self.guard.audit(), audit::assets_published(count));
                    tracing::info!(count, "Published recent assets");
                    Ok::<_, BackendError>(Some(count))
                },
            )
            .await
    }

    async fn fetch_recent(&self) -> BackendResult<Vec<AssetRecord>> {
        let albums = self.library.albums(true).await?;
        let album = albums
            .into_iter()
            .find(|a| a.title == self.recents_album)
            .map(|a| a.id);
        if album.is_none() {
            tracing::debug!(
                album = %self.recents_album,
                "No recents album, querying the whole library"
            );
        }

        let query = AssetQuery::recent_photos(album, self.page_size);
        let page = self.library.assets(&query).await?;
        let lookups =
            join_all(page.assets.iter().map(|asset| self.library.asset_info(asset))).await;

        // Assets deleted since the query drop out; any other failure fails the page
        let mut records = Vec::with_capacity(lookups.len());
        for lookup in lookups {
            match lookup {
                Ok(record) => records.push(record),
                Err(e) if e.is_gone() => tracing::debug!(error = %e, "Skipping removed asset"),
                Err(e) => return Err(e),
            }
        }

        records.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));
        records.truncate(self.page_size);
        Ok(records)
    }
}

impl std::fmt::Debug for MediaPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPicker")
            .field("page_size", &self.page_size)
            .field("recents_album", &self.recents_album)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEventType;
    use crate::backend::{MemoryMediaLibrary, MemoryPermissionProvider};
    use crate::features::fixture;
    use crate::store::MemoryAssetStore;
    use capgate_api::{Album, PermissionStatus, RawAsset};
    use chrono::{Duration, TimeZone, Utc};

    fn photos(count: usize) -> Vec<RawAsset> {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        (0..count)
            .map(|i| RawAsset::photo(format!("p{}", i), base + Duration::minutes(i as i64)))
            .collect()
    }

    fn granted() -> MemoryPermissionProvider {
        MemoryPermissionProvider::new()
            .with_status(Capability::MediaLibrary, PermissionStatus::Granted)
    }

    #[tokio::test]
    async fn test_uses_recents_album() {
        let f = fixture::guard(granted());
        let library = Arc::new(
            MemoryMediaLibrary::new()
                .with_album(Album::new("smart-1", "Recents").smart())
                .with_assets(photos(5)),
        );
        let store = Arc::new(MemoryAssetStore::new());
        let picker = MediaPicker::new(f.guard.clone(), library.clone(), store.clone());

        assert_eq!(picker.list_recent_assets().await.unwrap(), Some(5));
        assert_eq!(library.queries()[0].album.as_deref(), Some("smart-1"));
        assert_eq!(library.info_calls(), 5);

        let assets = store.assets();
        assert_eq!(assets[0].id, "p4");
        assert!(assets.iter().all(|a| a.local_uri.is_some()));
        assert_eq!(f.audit.find_by_type(AuditEventType::AssetsPublished).len(), 1);
    }

    #[tokio::test]
    async fn test_bounded_and_newest_first() {
        let f = fixture::guard(granted());
        let library = Arc::new(MemoryMediaLibrary::new().with_assets(photos(45)));
        let store = Arc::new(MemoryAssetStore::new());
        let picker = MediaPicker::new(f.guard.clone(), library.clone(), store.clone());

        assert_eq!(picker.list_recent_assets().await.unwrap(), Some(DEFAULT_PAGE_SIZE));
        assert_eq!(library.queries()[0].album, None);

        let assets = store.assets();
        assert_eq!(assets.len(), DEFAULT_PAGE_SIZE);
        assert_eq!(assets[0].id, "p44");
        assert!(assets
            .windows(2)
            .all(|w| w[0].creation_time >= w[1].creation_time));
    }

    #[tokio::test]
    async fn test_removed_asset_drops_out() {
        let f = fixture::guard(granted());
        let library = Arc::new(MemoryMediaLibrary::new().with_assets(photos(3)));
        library.mark_gone("p1");
        let store = Arc::new(MemoryAssetStore::new());
        let picker = MediaPicker::new(f.guard.clone(), library.clone(), store.clone());

        assert_eq!(picker.list_recent_assets().await.unwrap(), Some(2));
        assert_eq!(library.info_calls(), 3);
        let ids: Vec<String> = store.assets().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["p2", "p0"]);
    }

    #[tokio::test]
    async fn test_denied_leaves_store() {
        let f = fixture::guard(
            MemoryPermissionProvider::new()
                .with_status(Capability::MediaLibrary, PermissionStatus::Denied),
        );
        let library = Arc::new(MemoryMediaLibrary::new().with_assets(photos(3)));
        let store = Arc::new(MemoryAssetStore::new());
        let picker = MediaPicker::new(f.guard.clone(), library.clone(), store.clone());

        assert_eq!(picker.list_recent_assets().await.unwrap(), None);
        f.guard.settle().await;

        assert_eq!(store.publish_count(), 0);
        assert!(library.queries().is_empty());
        assert_eq!(f.presenter.prompts()[0].title, "Photo library access needed");
    }

    #[tokio::test]
    async fn test_custom_album_title() {
        let f = fixture::guard(granted());
        let library = Arc::new(
            MemoryMediaLibrary::new()
                .with_album(Album::new("smart-7", "Recientes").smart())
                .with_assets(photos(2)),
        );
        let store = Arc::new(MemoryAssetStore::new());
        let picker = MediaPicker::new(f.guard.clone(), library.clone(), store)
            .with_recents_album("Recientes")
            .with_page_size(1);

        assert_eq!(picker.list_recent_assets().await.unwrap(), Some(1));
        assert_eq!(library.queries()[0].album.as_deref(), Some("smart-7"));
        assert_eq!(library.queries()[0].first, 1);
    }
}

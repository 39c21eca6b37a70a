//! Saving images into the photo library

use capgate_api::Capability;
use std::sync::Arc;

use crate::backend::{FileTransfer, MediaLibraryBackend};
use crate::error::{BackendError, BackendResult};
use crate::guard::Guard;
use crate::permission::AlertKeys;
use crate::strings::DOWNLOADING_PHOTOS;
use crate::temp::TempFiles;

const ALERT: AlertKeys = AlertKeys::new("camera_roll", "alert");

/// Prefix of the data URL produced by [`CameraRoll::image_to_base64`]
pub const DATA_URL_PREFIX: &str = "data:image/png;base64, ";

/// Library saves from remote URLs and encoded payloads
#[derive(Clone)]
pub struct CameraRoll {
    guard: Guard,
    transfer: Arc<dyn FileTransfer>,
    library: Arc<dyn MediaLibraryBackend>,
    temp: TempFiles,
    announce: bool,
}

impl CameraRoll {
    pub fn new(
        guard: Guard,
        transfer: Arc<dyn FileTransfer>,
        library: Arc<dyn MediaLibraryBackend>,
        temp: TempFiles,
    ) -> Self {
        Self {
            guard,
            transfer,
            library,
            temp,
            announce: true,
        }
    }

    /// Toggle the "downloading" toast shown before each save
    pub fn with_announcements(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    fn notice(&self) -> Option<&'static str> {
        self.announce.then_some(DOWNLOADING_PHOTOS)
    }

    /// Download `url` to a temp file and import it
    ///
    /// `Ok(None)` when access is refused or the download left no local file;
    /// nothing is imported in either case.
    pub async fn save_from_url(&self, url: &str) -> BackendResult<Option<bool>> {
        self.guard
            .run(
                Capability::MediaLibrary,
                ALERT,
                self.notice(),
                "save_from_url",
                move || async move {
                    let dest = self.temp.next_path();
                    let Some(local) = self.transfer.download(url, &dest).await? else {
                        tracing::warn!(url = %url, "Download produced no local file, not saving");
                        return Ok(None);
                    };
                    self.library.save_to_library(&local).await?;
                    tracing::info!(path = %local.display(), "Saved image to library");
                    Ok::<_, BackendError>(Some(true))
                },
            )
            .await
    }

    /// Decode a base64 payload to a temp file and import it
    pub async fn save_from_payload(&self, payload: &str) -> BackendResult<Option<bool>> {
        self.guard
            .run(
                Capability::MediaLibrary,
                ALERT,
                self.notice(),
                "save_from_payload",
                move || async move {
                    let dest = self.temp.next_path();
                    self.transfer.write_base64(&dest, payload).await?;
                    self.library.save_to_library(&dest).await?;
                    tracing::info!(path = %dest.display(), "Saved payload to library");
                    Ok::<_, BackendError>(Some(true))
                },
            )
            .await
    }

    /// Fetch `url` and return it as a base64 data URL
    ///
    /// No library access is involved, so no permission is checked.
    pub async fn image_to_base64(&self, url: &str) -> BackendResult<Option<String>> {
        let dest = self.temp.next_path();
        let Some(local) = self.transfer.download(url, &dest).await? else {
            return Ok(None);
        };
        let encoded = self.transfer.read_base64(&local).await?;
        Ok(Some(format!("{}{}", DATA_URL_PREFIX, encoded)))
    }
}

impl std::fmt::Debug for CameraRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraRoll")
            .field("temp", &self.temp)
            .field("announce", &self.announce)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        DownloadBehavior, MemoryFileTransfer, MemoryMediaLibrary, MemoryPermissionProvider,
    };
    use crate::features::fixture;
    use capgate_api::PermissionStatus;

    fn granted() -> MemoryPermissionProvider {
        MemoryPermissionProvider::new()
            .with_status(Capability::MediaLibrary, PermissionStatus::Granted)
    }

    fn camera_roll(
        guard: Guard,
        transfer: Arc<MemoryFileTransfer>,
        library: Arc<MemoryMediaLibrary>,
    ) -> CameraRoll {
        CameraRoll::new(guard, transfer, library, TempFiles::new("/tmp/capgate"))
    }

    #[tokio::test]
    async fn test_save_from_url() {
        let f = fixture::guard(granted());
        let transfer = Arc::new(MemoryFileTransfer::new());
        let library = Arc::new(MemoryMediaLibrary::new());
        let roll = camera_roll(f.guard.clone(), transfer.clone(), library.clone());

        let saved = roll
            .save_from_url("https://example.com/x.jpg")
            .await
            .unwrap();
        assert_eq!(saved, Some(true));

        let downloads = transfer.downloads();
        assert_eq!(downloads.len(), 1);
        assert!(downloads[0].1.starts_with("/tmp/capgate"));
        assert_eq!(library.saved(), vec![downloads[0].1.clone()]);
        assert_eq!(f.notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_save_from_url_without_location() {
        let f = fixture::guard(granted());
        let transfer =
            Arc::new(MemoryFileTransfer::new().with_behavior(DownloadBehavior::NoLocation));
        let library = Arc::new(MemoryMediaLibrary::new());
        let roll = camera_roll(f.guard.clone(), transfer, library.clone());

        assert_eq!(roll.save_from_url("https://example.com/x.jpg").await.unwrap(), None);
        assert!(library.saved().is_empty());
    }

    #[tokio::test]
    async fn test_download_failure_propagates() {
        let f = fixture::guard(granted());
        let transfer = Arc::new(MemoryFileTransfer::new().with_behavior(DownloadBehavior::Fail));
        let library = Arc::new(MemoryMediaLibrary::new());
        let roll = camera_roll(f.guard.clone(), transfer, library.clone());

        let err = roll
            .save_from_url("https://example.com/x.jpg")
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(library.saved().is_empty());
    }

    #[tokio::test]
    async fn test_save_from_payload() {
        let f = fixture::guard(granted());
        let transfer = Arc::new(MemoryFileTransfer::new());
        let library = Arc::new(MemoryMediaLibrary::new());
        let roll = camera_roll(f.guard.clone(), transfer.clone(), library.clone())
            .with_announcements(false);

        assert_eq!(roll.save_from_payload("aGVsbG8=").await.unwrap(), Some(true));

        let saved = library.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(transfer.file(&saved[0]).as_deref(), Some("aGVsbG8="));
        assert_eq!(f.notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_denied_does_nothing() {
        let f = fixture::guard(
            MemoryPermissionProvider::new()
                .with_status(Capability::MediaLibrary, PermissionStatus::Denied),
        );
        let transfer = Arc::new(MemoryFileTransfer::new());
        let library = Arc::new(MemoryMediaLibrary::new());
        let roll = camera_roll(f.guard.clone(), transfer.clone(), library.clone());

        assert_eq!(roll.save_from_payload("aGVsbG8=").await.unwrap(), None);
        f.guard.settle().await;

        assert_eq!(transfer.file_count(), 0);
        assert!(library.saved().is_empty());
        assert_eq!(f.presenter.prompt_count(), 1);
        assert_eq!(f.presenter.prompts()[0].title, "Photo library access needed");
    }

    #[tokio::test]
    async fn test_image_to_base64_skips_permission() {
        let f = fixture::guard(
            MemoryPermissionProvider::new()
                .with_status(Capability::MediaLibrary, PermissionStatus::Denied),
        );
        let transfer = Arc::new(MemoryFileTransfer::new().with_download_payload("aGk="));
        let roll = camera_roll(f.guard.clone(), transfer, Arc::new(MemoryMediaLibrary::new()));

        let data = roll
            .image_to_base64("https://example.com/x.png")
            .await
            .unwrap();
        assert_eq!(data.as_deref(), Some("data:image/png;base64, aGk="));
        assert_eq!(f.provider.status_count(Capability::MediaLibrary), 0);
    }
}

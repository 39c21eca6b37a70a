//! Directory-backed photo library
//!
//! Treats a directory of image files as a media library: files at the root
//! and in first-level subdirectories are assets, each subdirectory is an
//! album, and a smart "Recents" album spans everything. A `notify` watcher
//! turns file system events into library change notifications.

use async_trait::async_trait;
use capgate_api::{
    Album, AssetPage, AssetQuery, AssetRecord, LibraryChange, MediaType, RawAsset,
    RECENTS_ALBUM_TITLE,
};
use chrono::{DateTime, Utc};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::{paginate, ChangeListener, ListenerId, ListenerSet, MediaLibraryBackend};
use crate::error::{BackendError, BackendResult};

/// Album id of the smart album covering the whole directory
pub const RECENTS_ALBUM_ID: &str = "recents";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "gif", "webp"];

/// Photo library stored as plain files under one root directory
pub struct DirectoryMediaLibrary {
    root: PathBuf,
    listeners: Arc<ListenerSet>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl DirectoryMediaLibrary {
    /// Open (creating if needed) a library rooted at `root`
    pub fn open(root: impl AsRef<Path>) -> BackendResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            listeners: Arc::new(ListenerSet::new()),
            watcher: Mutex::new(None),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start emitting change notifications for file system events
    pub fn watch(&self) -> BackendResult<()> {
        let mut slot = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }

        let listeners = Arc::clone(&self.listeners);
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if is_library_event(&event) => {
                    listeners.emit(LibraryChange::full());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Library watcher error"),
            }
        })
        .map_err(BackendError::Watch)?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(BackendError::Watch)?;
        tracing::info!(dir = %self.root.display(), "Watching library directory");

        *slot = Some(watcher);
        Ok(())
    }

    /// Stop the file system watcher
    pub fn unwatch(&self) {
        let stopped = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if stopped.is_some() {
            tracing::info!(dir = %self.root.display(), "Stopped watching library directory");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn scan(&self) -> BackendResult<Vec<RawAsset>> {
        let root = self.root.clone();
        let assets = tokio::task::spawn_blocking(move || scan_directory(&root)).await??;
        Ok(assets)
    }

    /// Pick a destination name that does not overwrite an existing asset
    fn import_path(&self, source: &Path) -> PathBuf {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpeg".to_string());
        let candidate = self.root.join(&file_name);
        if !candidate.exists() {
            return candidate;
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "jpeg".to_string());
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        self.root
            .join(format!("{}_{}.{}", stem, &suffix[..8], extension))
    }
}

impl std::fmt::Debug for DirectoryMediaLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryMediaLibrary")
            .field("root", &self.root)
            .field("listeners", &self.listeners.len())
            .field("watching", &self.is_watching())
            .finish()
    }
}

#[async_trait]
impl MediaLibraryBackend for DirectoryMediaLibrary {
    async fn save_to_library(&self, path: &Path) -> BackendResult<()> {
        let dest = self.import_path(path);
        tokio::fs::copy(path, &dest).await?;
        tracing::info!(source = %path.display(), dest = %dest.display(), "Imported into library");

        if !self.is_watching() {
            let id = relative_id(&self.root, &dest);
            self.listeners.emit(LibraryChange::inserted(vec![id]));
        }
        Ok(())
    }

    async fn albums(&self, include_smart: bool) -> BackendResult<Vec<Album>> {
        let assets = self.scan().await?;

        let mut albums: Vec<Album> = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() || is_hidden(&entry.path()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let count = assets
                .iter()
                .filter(|a| a.album_id.as_deref() == Some(name.as_str()))
                .count();
            albums.push(Album::new(name.clone(), name).with_count(count));
        }
        albums.sort_by(|a, b| a.title.cmp(&b.title));

        if include_smart {
            albums.push(
                Album::new(RECENTS_ALBUM_ID, RECENTS_ALBUM_TITLE)
                    .smart()
                    .with_count(assets.len()),
            );
        }
        Ok(albums)
    }

    async fn assets(&self, query: &AssetQuery) -> BackendResult<AssetPage> {
        let assets = self.scan().await?;
        let scoped: Vec<RawAsset> = match query.album.as_deref() {
            None | Some(RECENTS_ALBUM_ID) => assets,
            Some(album) => {
                if !self.root.join(album).is_dir() {
                    return Err(BackendError::query(format!("unknown album {}", album)));
                }
                assets
                    .into_iter()
                    .filter(|a| a.album_id.as_deref() == Some(album))
                    .collect()
            }
        };
        let matching = scoped
            .into_iter()
            .filter(|a| a.media_type == query.media_type)
            .collect();
        Ok(paginate(matching, query))
    }

    async fn asset_info(&self, asset: &RawAsset) -> BackendResult<AssetRecord> {
        let path = self.root.join(&asset.id);
        if !tokio::fs::try_exists(&path).await? {
            return Err(BackendError::AssetGone(asset.id.clone()));
        }
        Ok(AssetRecord::from_raw(asset).with_local_uri(path.display().to_string()))
    }

    fn add_listener(&self, listener: ChangeListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn is_library_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_image(p) && !is_hidden(p))
}

fn relative_id(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn to_asset(root: &Path, path: &Path, album: Option<&str>) -> std::io::Result<RawAsset> {
    let meta = std::fs::metadata(path)?;
    let modified: DateTime<Utc> = meta.modified()?.into();
    let created: DateTime<Utc> = meta.created().map(Into::into).unwrap_or(modified);

    Ok(RawAsset {
        id: relative_id(root, path),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        uri: format!("file://{}", path.display()),
        media_type: MediaType::Photo,
        width: 0,
        height: 0,
        creation_time: created,
        modification_time: modified,
        album_id: album.map(str::to_string),
    })
}

/// Collect assets from the root and first-level albums
///
/// Entries that vanish or can't be read mid-scan are skipped; only an
/// unreadable root fails the scan.
fn scan_directory(root: &Path) -> std::io::Result<Vec<RawAsset>> {
    let mut assets = Vec::new();
    for entry in std::fs::read_dir(root)?.flatten() {
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_dir() {
            let album = entry.file_name().to_string_lossy().into_owned();
            let inner = match std::fs::read_dir(&path) {
                Ok(inner) => inner,
                Err(e) => {
                    tracing::warn!(album = %album, error = %e, "Skipping unreadable album");
                    continue;
                }
            };
            for inner in inner.flatten() {
                let inner_path = inner.path();
                if inner_path.is_file() && is_image(&inner_path) && !is_hidden(&inner_path) {
                    push_asset(&mut assets, root, &inner_path, Some(&album));
                }
            }
        } else if is_image(&path) {
            push_asset(&mut assets, root, &path, None);
        }
    }
    Ok(assets)
}

fn push_asset(assets: &mut Vec<RawAsset>, root: &Path, path: &Path, album: Option<&str>) {
    match to_asset(root, path, album) {
        Ok(asset) => assets.push(asset),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable asset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_file(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"\xff\xd8\xff").unwrap();
    }

    #[tokio::test]
    async fn test_albums_and_recents() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("a.jpg"));
        write_file(&temp.path().join("trip").join("b.png"));
        write_file(&temp.path().join("trip").join("notes.txt"));
        write_file(&temp.path().join(".hidden").join("c.jpg"));

        let library = DirectoryMediaLibrary::open(temp.path()).unwrap();
        let albums = library.albums(true).await.unwrap();
        let titles: Vec<_> = albums.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["trip", RECENTS_ALBUM_TITLE]);
        assert_eq!(albums[0].asset_count, 1);
        assert_eq!(albums[1].asset_count, 2);
        assert!(albums[1].smart);

        assert_eq!(library.albums(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_assets_by_album() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("a.jpg"));
        write_file(&temp.path().join("trip").join("b.jpg"));

        let library = DirectoryMediaLibrary::open(temp.path()).unwrap();
        let all = library
            .assets(&AssetQuery::recent_photos(None, 20))
            .await
            .unwrap();
        assert_eq!(all.total_count, 2);

        let trip = library
            .assets(&AssetQuery::recent_photos(Some("trip".into()), 20))
            .await
            .unwrap();
        assert_eq!(trip.assets.len(), 1);
        assert_eq!(trip.assets[0].id, "trip/b.jpg");

        let info = library.asset_info(&trip.assets[0]).await.unwrap();
        assert!(info.local_uri.unwrap().ends_with("b.jpg"));

        assert!(library
            .assets(&AssetQuery::recent_photos(Some("nope".into()), 20))
            .await
            .is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("good.jpg"));
        std::os::unix::fs::symlink(temp.path().join("gone.jpg"), temp.path().join("broken.jpg"))
            .unwrap();

        let library = DirectoryMediaLibrary::open(temp.path()).unwrap();
        let page = library
            .assets(&AssetQuery::recent_photos(None, 20))
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.assets[0].id, "good.jpg");

        let albums = library.albums(true).await.unwrap();
        assert_eq!(albums.last().unwrap().asset_count, 1);
    }

    #[tokio::test]
    async fn test_removed_asset_is_gone() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("a.jpg"));

        let library = DirectoryMediaLibrary::open(temp.path()).unwrap();
        let page = library
            .assets(&AssetQuery::recent_photos(None, 20))
            .await
            .unwrap();
        fs::remove_file(temp.path().join("a.jpg")).unwrap();

        let err = library.asset_info(&page.assets[0]).await.unwrap_err();
        assert!(err.is_gone());
    }

    #[tokio::test]
    async fn test_save_imports_without_overwriting() {
        let library_dir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let source = cache.path().join("image_1.jpeg");
        write_file(&source);
        write_file(&library_dir.path().join("image_1.jpeg"));

        let library = DirectoryMediaLibrary::open(library_dir.path()).unwrap();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        library.add_listener(Arc::new(move |change: LibraryChange| {
            sink.lock().unwrap().push(change);
        }));

        library.save_to_library(&source).await.unwrap();

        let files = fs::read_dir(library_dir.path()).unwrap().count();
        assert_eq!(files, 2);
        assert_eq!(changes.lock().unwrap().len(), 1);
        // Temp file is left in place
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_watcher_emits_changes() {
        let temp = TempDir::new().unwrap();
        let library = DirectoryMediaLibrary::open(temp.path()).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        library.add_listener(Arc::new(move |change: LibraryChange| {
            let _ = tx.send(change);
        }));
        library.watch().unwrap();
        assert!(library.is_watching());

        write_file(&temp.path().join("new.jpg"));

        let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!change.has_incremental_changes);

        library.unwatch();
        assert!(!library.is_watching());
    }
}

//! Platform collaborator interfaces
//!
//! The guard core never talks to the OS directly. Each device facility is a
//! trait that a platform layer implements; this module also ships in-memory
//! implementations for tests and simulation, an HTTP file transfer, and a
//! directory-backed photo library for desktop use.
//!
//! | Trait | Provided implementations |
//! |-------|--------------------------|
//! | [`PermissionProvider`] | `MemoryPermissionProvider` |
//! | [`FileTransfer`] | `HttpFileTransfer`, `MemoryFileTransfer` |
//! | [`MediaLibraryBackend`] | `DirectoryMediaLibrary`, `MemoryMediaLibrary` |
//! | [`PickerBackend`] | `StaticPicker` |
//! | [`LocationBackend`] | `StaticLocation` |

pub mod directory;
pub mod http;
pub mod memory;

pub use directory::DirectoryMediaLibrary;
pub use http::HttpFileTransfer;
pub use memory::{
    DownloadBehavior, MemoryFileTransfer, MemoryMediaLibrary, MemoryPermissionProvider,
    StaticLocation, StaticPicker,
};

use async_trait::async_trait;
use capgate_api::{
    Album, AssetPage, AssetQuery, AssetRecord, Capability, LibraryChange, PermissionResponse,
    PickerOptions, PickerResult, Position, PositionOptions, RawAsset, SortBy,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::BackendResult;

/// OS permission API for every capability
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Read the current status without prompting
    async fn status(&self, capability: Capability) -> BackendResult<PermissionResponse>;

    /// Show the OS permission prompt and return the user's answer
    async fn request(&self, capability: Capability) -> BackendResult<PermissionResponse>;
}

/// Moves bytes between remote URLs, encoded payloads and local files
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Download `url` into `dest`; `None` when no local file was produced
    async fn download(&self, url: &str, dest: &Path) -> BackendResult<Option<PathBuf>>;

    /// Decode a base64 payload into `dest`
    async fn write_base64(&self, dest: &Path, payload: &str) -> BackendResult<()>;

    /// Read a local file back as base64
    async fn read_base64(&self, path: &Path) -> BackendResult<String>;
}

/// Callback invoked on every library mutation
pub type ChangeListener = Arc<dyn Fn(LibraryChange) + Send + Sync>;

/// Handle for one registered change listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Photo library access
#[async_trait]
pub trait MediaLibraryBackend: Send + Sync {
    /// Import a local file into the library
    async fn save_to_library(&self, path: &Path) -> BackendResult<()>;

    /// List albums, optionally including smart albums
    async fn albums(&self, include_smart: bool) -> BackendResult<Vec<Album>>;

    /// Query one page of assets
    async fn assets(&self, query: &AssetQuery) -> BackendResult<AssetPage>;

    /// Load extended info for one asset
    async fn asset_info(&self, asset: &RawAsset) -> BackendResult<AssetRecord>;

    /// Register a change listener
    fn add_listener(&self, listener: ChangeListener) -> ListenerId;

    /// Deregister one listener; other listeners stay registered
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// System image picker UI
#[async_trait]
pub trait PickerBackend: Send + Sync {
    async fn launch_gallery(&self, options: &PickerOptions) -> BackendResult<PickerResult>;

    async fn launch_camera(&self, options: &PickerOptions) -> BackendResult<PickerResult>;
}

/// Device location services
#[async_trait]
pub trait LocationBackend: Send + Sync {
    /// Read the current position; `None` when no fix is available
    async fn current_position(&self, options: &PositionOptions) -> BackendResult<Option<Position>>;
}

/// Apply a query's sort order, cursor and page size to a candidate set
pub fn paginate(mut assets: Vec<RawAsset>, query: &AssetQuery) -> AssetPage {
    match query.sort_by {
        SortBy::CreationTime => assets.sort_by(|a, b| b.creation_time.cmp(&a.creation_time)),
        SortBy::ModificationTime => {
            assets.sort_by(|a, b| b.modification_time.cmp(&a.modification_time))
        }
    }

    let start = match &query.after {
        Some(cursor) => assets
            .iter()
            .position(|a| &a.id == cursor)
            .map(|i| i + 1)
            .unwrap_or(assets.len()),
        None => 0,
    };
    let total_count = assets.len();
    let page: Vec<RawAsset> = assets.into_iter().skip(start).take(query.first).collect();
    let has_next_page = start + page.len() < total_count;

    AssetPage {
        end_cursor: page.last().map(|a| a.id.clone()),
        assets: page,
        has_next_page,
        total_count,
    }
}

// ============================================================================
// Listener bookkeeping
// ============================================================================

/// Per-handle listener registry shared by the library implementations
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, ChangeListener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, listener);
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deliver a change to every registered listener
    pub fn emit(&self, change: LibraryChange) {
        // Listeners run outside the lock so they may (de)register freely
        let listeners: Vec<ChangeListener> = self.lock().values().cloned().collect();
        for listener in listeners {
            listener(change.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ListenerId, ChangeListener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("count", &self.len())
            .finish()
    }
}

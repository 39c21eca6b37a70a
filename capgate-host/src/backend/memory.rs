//! In-memory backends
//!
//! Deterministic stand-ins for the OS facilities. They keep call counters so
//! tests can assert how often the guard reached each collaborator, and the
//! CLI uses them to simulate a device.

use async_trait::async_trait;
use capgate_api::{
    Album, AssetPage, AssetQuery, AssetRecord, Capability, LibraryChange, PermissionResponse,
    PermissionStatus, PickerOptions, PickerResult, Position, PositionOptions, RawAsset,
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    paginate, ChangeListener, FileTransfer, ListenerId, ListenerSet, LocationBackend,
    MediaLibraryBackend, PermissionProvider, PickerBackend,
};
use crate::error::{BackendError, BackendResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Permissions
// ============================================================================

#[derive(Debug, Default)]
struct PermissionState {
    statuses: HashMap<Capability, PermissionStatus>,
    answers: HashMap<Capability, PermissionStatus>,
    status_calls: HashMap<Capability, usize>,
    request_calls: HashMap<Capability, usize>,
    fail_status: bool,
}

/// Permission provider backed by a status table
///
/// Capabilities start `Undetermined`. A request on an undetermined
/// capability applies the configured answer (default: granted); a request
/// on a decided capability returns the current status unchanged, like the
/// OS does once the user has answered.
#[derive(Debug, Default)]
pub struct MemoryPermissionProvider {
    state: Mutex<PermissionState>,
}

impl MemoryPermissionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `capability` in `status`
    pub fn with_status(self, capability: Capability, status: PermissionStatus) -> Self {
        self.set_status(capability, status);
        self
    }

    /// Answer the OS prompt for `capability` with `answer`
    pub fn answering(self, capability: Capability, answer: PermissionStatus) -> Self {
        lock(&self.state).answers.insert(capability, answer);
        self
    }

    /// Change a status, as the user would from the settings screen
    pub fn set_status(&self, capability: Capability, status: PermissionStatus) {
        lock(&self.state).statuses.insert(capability, status);
    }

    /// Make every status read fail
    pub fn fail_status_reads(&self, fail: bool) {
        lock(&self.state).fail_status = fail;
    }

    pub fn current(&self, capability: Capability) -> PermissionStatus {
        lock(&self.state)
            .statuses
            .get(&capability)
            .copied()
            .unwrap_or_default()
    }

    /// Number of status reads for `capability`
    pub fn status_count(&self, capability: Capability) -> usize {
        lock(&self.state)
            .status_calls
            .get(&capability)
            .copied()
            .unwrap_or(0)
    }

    /// Number of OS prompts shown for `capability`
    pub fn request_count(&self, capability: Capability) -> usize {
        lock(&self.state)
            .request_calls
            .get(&capability)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PermissionProvider for MemoryPermissionProvider {
    async fn status(&self, capability: Capability) -> BackendResult<PermissionResponse> {
        let mut state = lock(&self.state);
        *state.status_calls.entry(capability).or_insert(0) += 1;
        if state.fail_status {
            return Err(BackendError::Unavailable(capability));
        }
        let status = state.statuses.get(&capability).copied().unwrap_or_default();
        Ok(PermissionResponse::from_status(status))
    }

    async fn request(&self, capability: Capability) -> BackendResult<PermissionResponse> {
        let mut state = lock(&self.state);
        *state.request_calls.entry(capability).or_insert(0) += 1;
        let current = state.statuses.get(&capability).copied().unwrap_or_default();
        let status = if current == PermissionStatus::Undetermined {
            let answer = state
                .answers
                .get(&capability)
                .copied()
                .unwrap_or(PermissionStatus::Granted);
            state.statuses.insert(capability, answer);
            answer
        } else {
            current
        };
        Ok(PermissionResponse::from_status(status))
    }
}

// ============================================================================
// File transfer
// ============================================================================

/// What a [`MemoryFileTransfer`] download does
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadBehavior {
    /// Produce the destination path
    #[default]
    Succeed,
    /// Finish without a local location
    NoLocation,
    /// Fail with a transport error
    Fail,
}

#[derive(Debug, Default)]
struct TransferState {
    behavior: DownloadBehavior,
    downloads: Vec<(String, PathBuf)>,
    files: HashMap<PathBuf, String>,
    download_payload: String,
}

/// File transfer that keeps "files" as base64 strings in memory
#[derive(Debug, Default)]
pub struct MemoryFileTransfer {
    state: Mutex<TransferState>,
}

impl MemoryFileTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(self, behavior: DownloadBehavior) -> Self {
        lock(&self.state).behavior = behavior;
        self
    }

    /// Base64 content stored for every successful download
    pub fn with_download_payload(self, payload: impl Into<String>) -> Self {
        lock(&self.state).download_payload = payload.into();
        self
    }

    /// `(url, dest)` for every download attempt
    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        lock(&self.state).downloads.clone()
    }

    /// Content of an in-memory file
    pub fn file(&self, path: &Path) -> Option<String> {
        lock(&self.state).files.get(path).cloned()
    }

    pub fn file_count(&self) -> usize {
        lock(&self.state).files.len()
    }
}

#[async_trait]
impl FileTransfer for MemoryFileTransfer {
    async fn download(&self, url: &str, dest: &Path) -> BackendResult<Option<PathBuf>> {
        let mut state = lock(&self.state);
        state.downloads.push((url.to_string(), dest.to_path_buf()));
        match state.behavior {
            DownloadBehavior::Succeed => {
                let payload = state.download_payload.clone();
                state.files.insert(dest.to_path_buf(), payload);
                Ok(Some(dest.to_path_buf()))
            }
            DownloadBehavior::NoLocation => Ok(None),
            DownloadBehavior::Fail => Err(BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("download of {} refused", url),
            ))),
        }
    }

    async fn write_base64(&self, dest: &Path, payload: &str) -> BackendResult<()> {
        lock(&self.state)
            .files
            .insert(dest.to_path_buf(), payload.to_string());
        Ok(())
    }

    async fn read_base64(&self, path: &Path) -> BackendResult<String> {
        lock(&self.state).files.get(path).cloned().ok_or_else(|| {
            BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            ))
        })
    }
}

// ============================================================================
// Media library
// ============================================================================

#[derive(Debug, Default)]
struct LibraryState {
    albums: Vec<Album>,
    assets: Vec<RawAsset>,
    saved: Vec<PathBuf>,
    queries: Vec<AssetQuery>,
    info_calls: usize,
    gone: Vec<String>,
}

/// Photo library held in memory
///
/// Smart albums contain every asset; other albums contain the assets whose
/// `album_id` matches. Saving a file appends an asset and notifies the
/// registered listeners.
#[derive(Debug, Default)]
pub struct MemoryMediaLibrary {
    state: Mutex<LibraryState>,
    listeners: ListenerSet,
}

impl MemoryMediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_album(self, album: Album) -> Self {
        lock(&self.state).albums.push(album);
        self
    }

    pub fn with_assets(self, assets: impl IntoIterator<Item = RawAsset>) -> Self {
        lock(&self.state).assets.extend(assets);
        self
    }

    /// Add an asset and notify listeners
    pub fn insert_asset(&self, asset: RawAsset) {
        let id = asset.id.clone();
        lock(&self.state).assets.push(asset);
        self.listeners.emit(LibraryChange::inserted(vec![id]));
    }

    /// Keep listing `id` but fail its `asset_info`, as if it was deleted
    /// between the query and the lookup
    pub fn mark_gone(&self, id: impl Into<String>) {
        lock(&self.state).gone.push(id.into());
    }

    /// Notify listeners without changing content
    pub fn emit_change(&self, change: LibraryChange) {
        self.listeners.emit(change);
    }

    /// Paths imported through `save_to_library`
    pub fn saved(&self) -> Vec<PathBuf> {
        lock(&self.state).saved.clone()
    }

    /// Every asset query received
    pub fn queries(&self) -> Vec<AssetQuery> {
        lock(&self.state).queries.clone()
    }

    pub fn info_calls(&self) -> usize {
        lock(&self.state).info_calls
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[async_trait]
impl MediaLibraryBackend for MemoryMediaLibrary {
    async fn save_to_library(&self, path: &Path) -> BackendResult<()> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled.jpeg".to_string());
        let id = {
            let mut state = lock(&self.state);
            state.saved.push(path.to_path_buf());
            let id = format!("saved-{}", state.saved.len());
            let mut asset = RawAsset::photo(id.clone(), Utc::now());
            asset.filename = filename;
            state.assets.push(asset);
            id
        };
        self.listeners.emit(LibraryChange::inserted(vec![id]));
        Ok(())
    }

    async fn albums(&self, include_smart: bool) -> BackendResult<Vec<Album>> {
        let state = lock(&self.state);
        Ok(state
            .albums
            .iter()
            .filter(|a| include_smart || !a.smart)
            .cloned()
            .collect())
    }

    async fn assets(&self, query: &AssetQuery) -> BackendResult<AssetPage> {
        let mut state = lock(&self.state);
        state.queries.push(query.clone());

        let scope = match &query.album {
            Some(album_id) => {
                let album = state
                    .albums
                    .iter()
                    .find(|a| &a.id == album_id)
                    .ok_or_else(|| BackendError::query(format!("unknown album {}", album_id)))?;
                if album.smart {
                    None
                } else {
                    Some(album.id.clone())
                }
            }
            None => None,
        };

        let matching: Vec<RawAsset> = state
            .assets
            .iter()
            .filter(|a| a.media_type == query.media_type)
            .filter(|a| scope.is_none() || a.album_id == scope)
            .cloned()
            .collect();
        Ok(paginate(matching, query))
    }

    async fn asset_info(&self, asset: &RawAsset) -> BackendResult<AssetRecord> {
        let mut state = lock(&self.state);
        state.info_calls += 1;
        if state.gone.contains(&asset.id) {
            return Err(BackendError::AssetGone(asset.id.clone()));
        }
        drop(state);
        let local_uri = format!("file:///library/{}", asset.filename);
        Ok(AssetRecord::from_raw(asset).with_local_uri(local_uri))
    }

    fn add_listener(&self, listener: ChangeListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

// ============================================================================
// Picker and location
// ============================================================================

#[derive(Debug, Default)]
struct PickerState {
    gallery: PickerResult,
    camera: PickerResult,
    gallery_launches: Vec<PickerOptions>,
    camera_launches: Vec<PickerOptions>,
}

/// Picker that returns preconfigured results
#[derive(Debug)]
pub struct StaticPicker {
    state: Mutex<PickerState>,
}

impl StaticPicker {
    /// Picker whose sessions are all canceled
    pub fn canceled() -> Self {
        Self::new(PickerResult::canceled(), PickerResult::canceled())
    }

    pub fn new(gallery: PickerResult, camera: PickerResult) -> Self {
        Self {
            state: Mutex::new(PickerState {
                gallery,
                camera,
                ..PickerState::default()
            }),
        }
    }

    /// Options of every gallery launch
    pub fn gallery_launches(&self) -> Vec<PickerOptions> {
        lock(&self.state).gallery_launches.clone()
    }

    /// Options of every camera launch
    pub fn camera_launches(&self) -> Vec<PickerOptions> {
        lock(&self.state).camera_launches.clone()
    }
}

#[async_trait]
impl PickerBackend for StaticPicker {
    async fn launch_gallery(&self, options: &PickerOptions) -> BackendResult<PickerResult> {
        let mut state = lock(&self.state);
        state.gallery_launches.push(options.clone());
        Ok(state.gallery.clone())
    }

    async fn launch_camera(&self, options: &PickerOptions) -> BackendResult<PickerResult> {
        let mut state = lock(&self.state);
        state.camera_launches.push(options.clone());
        Ok(state.camera.clone())
    }
}

/// Location source with a fixed fix (or none)
#[derive(Debug, Default)]
pub struct StaticLocation {
    position: Option<Position>,
    fail: bool,
    reads: Mutex<usize>,
}

impl StaticLocation {
    pub fn new(position: Option<Position>) -> Self {
        Self {
            position,
            fail: false,
            reads: Mutex::new(0),
        }
    }

    /// Location source whose reads fail
    pub fn failing() -> Self {
        Self {
            position: None,
            fail: true,
            reads: Mutex::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        *lock(&self.reads)
    }
}

#[async_trait]
impl LocationBackend for StaticLocation {
    async fn current_position(&self, _options: &PositionOptions) -> BackendResult<Option<Position>> {
        *lock(&self.reads) += 1;
        if self.fail {
            return Err(BackendError::Unavailable(Capability::ForegroundLocation));
        }
        Ok(self.position)
    }
}

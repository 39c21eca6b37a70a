//! capgate-api: Shared types for permission-gated device capabilities
//!
//! This crate defines the data exchanged between the guard core, the
//! platform backends and the UI layer. It carries no behavior beyond
//! small constructors and the picker option merge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of assets fetched by a recent-assets query
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Title of the smart album holding the most recent items
pub const RECENTS_ALBUM_TITLE: &str = "Recents";

// ============================================================================
// Permissions
// ============================================================================

/// A device permission domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read/write access to the photo library
    MediaLibrary,
    /// Camera capture
    Camera,
    /// Library access through the system media picker
    MediaPicker,
    /// Location while the app is in the foreground
    ForegroundLocation,
}

impl Capability {
    /// Every capability, in declaration order
    pub const ALL: [Capability; 4] = [
        Capability::MediaLibrary,
        Capability::Camera,
        Capability::MediaPicker,
        Capability::ForegroundLocation,
    ];

    /// Stable name used in logs, audit records and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::MediaLibrary => "media_library",
            Capability::Camera => "camera",
            Capability::MediaPicker => "media_picker",
            Capability::ForegroundLocation => "foreground_location",
        }
    }

    /// Parse a stable name back into a capability
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission status as reported by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// The user has not been asked yet
    #[default]
    Undetermined,
    /// Access allowed
    Granted,
    /// Access refused; only a settings change can undo it
    Denied,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Undetermined => "undetermined",
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "undetermined" => Some(PermissionStatus::Undetermined),
            "granted" => Some(PermissionStatus::Granted),
            "denied" => Some(PermissionStatus::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of a status read or a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResponse {
    /// Whether access is currently allowed
    pub granted: bool,
    /// Detailed status
    pub status: PermissionStatus,
}

impl PermissionResponse {
    /// Build a response whose `granted` flag agrees with the status
    pub fn from_status(status: PermissionStatus) -> Self {
        Self {
            granted: status == PermissionStatus::Granted,
            status,
        }
    }

    pub fn granted() -> Self {
        Self::from_status(PermissionStatus::Granted)
    }

    pub fn denied() -> Self {
        Self::from_status(PermissionStatus::Denied)
    }

    pub fn undetermined() -> Self {
        Self::from_status(PermissionStatus::Undetermined)
    }
}

// ============================================================================
// Media library
// ============================================================================

/// Kind of media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Photo,
    Video,
    Audio,
    Unknown,
}

/// Sort key for asset queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Newest first by creation time
    #[default]
    CreationTime,
    /// Newest first by modification time
    ModificationTime,
}

/// An album (user-created or smart)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub asset_count: usize,
    /// Smart albums are computed by the library (e.g. "Recents")
    #[serde(default)]
    pub smart: bool,
}

impl Album {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            asset_count: 0,
            smart: false,
        }
    }

    /// Mark the album as a smart album
    pub fn smart(mut self) -> Self {
        self.smart = true;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.asset_count = count;
        self
    }
}

/// A library item as returned by an asset query, before enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAsset {
    pub id: String,
    pub filename: String,
    pub uri: String,
    pub media_type: MediaType,
    pub width: u32,
    pub height: u32,
    pub creation_time: DateTime<Utc>,
    pub modification_time: DateTime<Utc>,
    #[serde(default)]
    pub album_id: Option<String>,
}

impl RawAsset {
    /// Create a photo asset created (and last modified) at `creation_time`
    pub fn photo(id: impl Into<String>, creation_time: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            filename: format!("{}.jpg", id),
            uri: format!("asset://{}", id),
            id,
            media_type: MediaType::Photo,
            width: 0,
            height: 0,
            creation_time,
            modification_time: creation_time,
            album_id: None,
        }
    }

    pub fn in_album(mut self, album_id: impl Into<String>) -> Self {
        self.album_id = Some(album_id.into());
        self
    }
}

/// Query for a page of assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetQuery {
    /// Restrict to one album; `None` queries the whole library
    pub album: Option<String>,
    pub media_type: MediaType,
    pub sort_by: SortBy,
    /// Page size
    pub first: usize,
    /// Cursor from a previous page
    pub after: Option<String>,
}

impl AssetQuery {
    /// Newest photos first, `first` items, optionally inside one album
    pub fn recent_photos(album: Option<String>, first: usize) -> Self {
        Self {
            album,
            media_type: MediaType::Photo,
            sort_by: SortBy::CreationTime,
            first,
            after: None,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPage {
    pub assets: Vec<RawAsset>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    pub total_count: usize,
}

/// Geographic point attached to an asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized descriptor of a media item, produced by enriching a [`RawAsset`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: String,
    pub filename: String,
    pub uri: String,
    pub media_type: MediaType,
    pub width: u32,
    pub height: u32,
    pub creation_time: DateTime<Utc>,
    pub modification_time: DateTime<Utc>,
    #[serde(default)]
    pub album_id: Option<String>,
    /// Local file location, when the item is available on device
    #[serde(default)]
    pub local_uri: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl AssetRecord {
    /// Start an enriched record from a raw asset with no extended info
    pub fn from_raw(raw: &RawAsset) -> Self {
        Self {
            id: raw.id.clone(),
            filename: raw.filename.clone(),
            uri: raw.uri.clone(),
            media_type: raw.media_type,
            width: raw.width,
            height: raw.height,
            creation_time: raw.creation_time,
            modification_time: raw.modification_time,
            album_id: raw.album_id.clone(),
            local_uri: None,
            location: None,
            is_favorite: false,
        }
    }

    pub fn with_local_uri(mut self, local_uri: impl Into<String>) -> Self {
        self.local_uri = Some(local_uri.into());
        self
    }
}

/// Change notification from the media library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryChange {
    /// Whether the id lists below describe the change; when false the
    /// listener should refetch everything
    pub has_incremental_changes: bool,
    #[serde(default)]
    pub inserted: Vec<String>,
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub updated: Vec<String>,
}

impl LibraryChange {
    /// A change that carries no detail
    pub fn full() -> Self {
        Self::default()
    }

    pub fn inserted(ids: Vec<String>) -> Self {
        Self {
            has_incremental_changes: true,
            inserted: ids,
            ..Self::default()
        }
    }
}

// ============================================================================
// Image picker
// ============================================================================

/// Media kinds offered by the picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerMediaTypes {
    #[default]
    Images,
    Videos,
    All,
}

/// Fully resolved picker options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickerOptions {
    pub media_types: PickerMediaTypes,
    /// Show the crop/edit step after selection
    pub allows_editing: bool,
    /// Crop aspect ratio (width, height)
    pub aspect: (u32, u32),
    /// Compression quality, 0.0..=1.0
    pub quality: f32,
    pub allows_multiple_selection: bool,
    /// Include base64 data in the result
    pub base64: bool,
}

impl PickerOptions {
    /// Gallery defaults: images only, crop on, 9:16, full quality
    pub fn gallery_defaults() -> Self {
        Self {
            media_types: PickerMediaTypes::Images,
            allows_editing: true,
            aspect: (9, 16),
            quality: 1.0,
            allows_multiple_selection: false,
            base64: false,
        }
    }

    /// Camera defaults: images only, crop on, 4:3, full quality
    pub fn camera_defaults() -> Self {
        Self {
            aspect: (4, 3),
            ..Self::gallery_defaults()
        }
    }

    /// Apply caller overrides on top of these options
    pub fn merged(mut self, overrides: &PickerOverrides) -> Self {
        if let Some(media_types) = overrides.media_types {
            self.media_types = media_types;
        }
        if let Some(allows_editing) = overrides.allows_editing {
            self.allows_editing = allows_editing;
        }
        if let Some(aspect) = overrides.aspect {
            self.aspect = aspect;
        }
        if let Some(quality) = overrides.quality {
            self.quality = quality;
        }
        if let Some(multiple) = overrides.allows_multiple_selection {
            self.allows_multiple_selection = multiple;
        }
        if let Some(base64) = overrides.base64 {
            self.base64 = base64;
        }
        self
    }
}

/// Caller-supplied picker options; unset fields keep the defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerOverrides {
    pub media_types: Option<PickerMediaTypes>,
    pub allows_editing: Option<bool>,
    pub aspect: Option<(u32, u32)>,
    pub quality: Option<f32>,
    pub allows_multiple_selection: Option<bool>,
    pub base64: Option<bool>,
}

impl PickerOverrides {
    /// Layer `other` over `self`; fields set in `other` win
    pub fn layered(&self, other: &PickerOverrides) -> PickerOverrides {
        PickerOverrides {
            media_types: other.media_types.or(self.media_types),
            allows_editing: other.allows_editing.or(self.allows_editing),
            aspect: other.aspect.or(self.aspect),
            quality: other.quality.or(self.quality),
            allows_multiple_selection: other
                .allows_multiple_selection
                .or(self.allows_multiple_selection),
            base64: other.base64.or(self.base64),
        }
    }
}

/// An item returned by the picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickedAsset {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub base64: Option<String>,
}

impl PickedAsset {
    pub fn new(uri: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            uri: uri.into(),
            width,
            height,
            file_name: None,
            mime_type: None,
            file_size: None,
            base64: None,
        }
    }
}

/// Outcome of a picker session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickerResult {
    /// The user dismissed the picker without choosing
    pub canceled: bool,
    #[serde(default)]
    pub assets: Vec<PickedAsset>,
}

impl PickerResult {
    pub fn canceled() -> Self {
        Self {
            canceled: true,
            assets: Vec::new(),
        }
    }

    pub fn picked(assets: Vec<PickedAsset>) -> Self {
        Self {
            canceled: false,
            assets,
        }
    }

    /// First selected asset, unless the session was canceled
    pub fn into_first(self) -> Option<PickedAsset> {
        if self.canceled {
            None
        } else {
            self.assets.into_iter().next()
        }
    }
}

// ============================================================================
// Location
// ============================================================================

/// Requested accuracy for a position read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAccuracy {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
    Highest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionOptions {
    pub accuracy: LocationAccuracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in meters
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            heading: None,
            speed: None,
        }
    }
}

/// A position fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: Coordinates,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(coords: Coordinates, timestamp: DateTime<Utc>) -> Self {
        Self { coords, timestamp }
    }
}

//! capgate: permission-gated device capability actions
//!
//! Wraps photo-library, camera, picker and location actions in a permission
//! check. An action runs only when its capability resolves to granted;
//! denial offers a way into system settings; the recent-assets list is kept
//! in sync with the library.
//!
//! ```text
//! feature entry point ──► Guard::run
//!                           │
//!                           ├─► PermissionOracle ──► PermissionProvider
//!                           │        └─(denied)──► DenialRecovery (background)
//!                           │
//!                           └─(granted)──► backend action ──► Ok(Some(..))
//! ```
//!
//! Denial and cancellation are `Ok(None)`; backend failures are `Err`.

pub mod audit;
pub mod backend;
pub mod config;
pub mod error;
pub mod features;
pub mod gate;
pub mod guard;
pub mod permission;
mod recording;
pub mod store;
pub mod strings;
pub mod sync;
pub mod temp;
pub mod toast;

pub use backend::{
    ChangeListener, DirectoryMediaLibrary, FileTransfer, HttpFileTransfer, ListenerId,
    LocationBackend, MediaLibraryBackend, PermissionProvider, PickerBackend,
};
pub use config::{ConfigError, GateConfig};
pub use error::{BackendError, BackendResult};
pub use features::{CameraRoll, Geolocation, ImagePicker, MediaPicker};
pub use gate::{Gate, GateBuilder, GateError, GatePresets};
pub use guard::Guard;
pub use permission::{AlertKeys, DenialRecovery, PermissionOracle};
pub use store::{AssetStore, MemoryAssetStore};
pub use strings::{StringResolver, StringTable};
pub use sync::{AssetSync, SyncOptions};
pub use temp::TempFiles;
pub use toast::{Notifier, TracingNotifier};

pub use capgate_api::{
    AssetRecord, Capability, PermissionResponse, PermissionStatus, PickedAsset, PickerOptions,
    PickerOverrides, Position,
};

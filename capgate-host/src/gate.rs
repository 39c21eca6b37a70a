//! Assembling a gate from collaborators
//!
//! A [`Gate`] owns the shared [`Guard`] plus the platform backends and hands
//! out the feature objects. Build one with [`GateBuilder`] or start from a
//! [`GatePresets`] bundle.
//!
//! ```rust,ignore
//! use capgate::{GateBuilder, GateConfig};
//!
//! let gate = GateBuilder::new()
//!     .config(GateConfig::load("capgate.json")?)
//!     .permissions(provider)
//!     .library(library)
//!     .picker(picker)
//!     .location(location)
//!     .build()?;
//!
//! let saved = gate.camera_roll().save_from_url(url).await?;
//! ```

use std::sync::Arc;

use crate::audit::{AuditSink, MemoryAuditSink};
use crate::backend::{
    FileTransfer, HttpFileTransfer, LocationBackend, MediaLibraryBackend, MemoryFileTransfer,
    MemoryMediaLibrary, PermissionProvider, PickerBackend, StaticLocation, StaticPicker,
};
use crate::config::{ConfigError, GateConfig};
use crate::features::{CameraRoll, Geolocation, ImagePicker, MediaPicker};
use crate::guard::Guard;
use crate::permission::{
    AutoRecoveryPresenter, DenialRecovery, PermissionOracle, RecoveryPresenter, SettingsLauncher,
    TerminalRecoveryPresenter, TracingSettingsLauncher,
};
use crate::store::{AssetStore, MemoryAssetStore};
use crate::strings::StringResolver;
use crate::sync::AssetSync;
use crate::temp::TempFiles;
use crate::toast::{Notifier, TracingNotifier};

/// Error type for gate assembly
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Shared guard, configuration and backends
#[derive(Clone)]
pub struct Gate {
    guard: Guard,
    config: GateConfig,
    transfer: Arc<dyn FileTransfer>,
    library: Arc<dyn MediaLibraryBackend>,
    picker: Arc<dyn PickerBackend>,
    location: Arc<dyn LocationBackend>,
    store: Arc<dyn AssetStore>,
}

impl Gate {
    pub fn builder() -> GateBuilder {
        GateBuilder::new()
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn oracle(&self) -> &PermissionOracle {
        self.guard.oracle()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn camera_roll(&self) -> CameraRoll {
        CameraRoll::new(
            self.guard.clone(),
            Arc::clone(&self.transfer),
            Arc::clone(&self.library),
            TempFiles::new(&self.config.cache_dir),
        )
        .with_announcements(self.config.announce_saves)
    }

    pub fn image_picker(&self) -> ImagePicker {
        ImagePicker::new(self.guard.clone(), Arc::clone(&self.picker))
            .with_defaults(self.config.gallery_options(), self.config.camera_options())
    }

    pub fn geolocation(&self) -> Geolocation {
        Geolocation::new(self.guard.clone(), Arc::clone(&self.location))
            .with_options(self.config.location)
    }

    pub fn media_picker(&self) -> MediaPicker {
        MediaPicker::new(
            self.guard.clone(),
            Arc::clone(&self.library),
            Arc::clone(&self.store),
        )
        .with_page_size(self.config.page_size)
        .with_recents_album(self.config.recents_album.clone())
    }

    /// Subscribe a new [`AssetSync`] with the configured options
    pub fn asset_sync(&self) -> AssetSync {
        AssetSync::start(self.media_picker(), self.config.sync.clone())
    }

    /// Wait for pending recovery dialogs
    pub async fn settle(&self) {
        self.guard.settle().await
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("guard", &self.guard)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Gate`]
///
/// Permissions, library, picker and location are required. Everything else
/// falls back to: HTTP transfers, a deny-choosing recovery presenter, logged
/// settings launches and toasts, texts and audit sink from the config, and
/// an in-memory asset store.
#[derive(Default)]
pub struct GateBuilder {
    config: Option<GateConfig>,
    permissions: Option<Arc<dyn PermissionProvider>>,
    transfer: Option<Arc<dyn FileTransfer>>,
    library: Option<Arc<dyn MediaLibraryBackend>>,
    picker: Option<Arc<dyn PickerBackend>>,
    location: Option<Arc<dyn LocationBackend>>,
    presenter: Option<Arc<dyn RecoveryPresenter>>,
    settings: Option<Arc<dyn SettingsLauncher>>,
    notifier: Option<Arc<dyn Notifier>>,
    strings: Option<Arc<dyn StringResolver>>,
    audit: Option<Arc<dyn AuditSink>>,
    store: Option<Arc<dyn AssetStore>>,
}

impl GateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: GateConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn permissions(mut self, permissions: Arc<dyn PermissionProvider>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn transfer(mut self, transfer: Arc<dyn FileTransfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn library(mut self, library: Arc<dyn MediaLibraryBackend>) -> Self {
        self.library = Some(library);
        self
    }

    pub fn picker(mut self, picker: Arc<dyn PickerBackend>) -> Self {
        self.picker = Some(picker);
        self
    }

    pub fn location(mut self, location: Arc<dyn LocationBackend>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn RecoveryPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsLauncher>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn strings(mut self, strings: Arc<dyn StringResolver>) -> Self {
        self.strings = Some(strings);
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<Gate, GateError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let permissions = self
            .permissions
            .ok_or(GateError::MissingCollaborator("permissions"))?;
        let library = self
            .library
            .ok_or(GateError::MissingCollaborator("library"))?;
        let picker = self.picker.ok_or(GateError::MissingCollaborator("picker"))?;
        let location = self
            .location
            .ok_or(GateError::MissingCollaborator("location"))?;

        let strings: Arc<dyn StringResolver> = match self.strings {
            Some(strings) => strings,
            None => Arc::new(config.string_table()?),
        };
        let audit = match self.audit {
            Some(audit) => audit,
            None => config.audit_sink()?,
        };

        let recovery = DenialRecovery::new(
            self.presenter
                .unwrap_or_else(|| Arc::new(AutoRecoveryPresenter::always_deny())),
            self.settings
                .unwrap_or_else(|| Arc::new(TracingSettingsLauncher)),
            Arc::clone(&strings),
            Arc::clone(&audit),
        );
        let oracle = PermissionOracle::new(permissions, recovery, Arc::clone(&audit));
        let guard = Guard::new(
            oracle,
            self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            strings,
            audit,
        )
        .with_notice_duration(config.notice_duration());

        tracing::debug!(cache_dir = %config.cache_dir.display(), "Gate assembled");

        Ok(Gate {
            guard,
            transfer: self
                .transfer
                .unwrap_or_else(|| Arc::new(HttpFileTransfer::new())),
            library,
            picker,
            location,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryAssetStore::new())),
            config,
        })
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

/// Ready-made builders for common setups
pub struct GatePresets;

impl GatePresets {
    /// Everything in memory
    ///
    /// - in-memory transfer, empty library, canceled picker, no location fix
    /// - recovery dialogs answered "deny"
    /// - in-memory audit sink
    ///
    /// Override any collaborator on the returned builder.
    pub fn testing(permissions: Arc<dyn PermissionProvider>) -> GateBuilder {
        GateBuilder::new()
            .permissions(permissions)
            .transfer(Arc::new(MemoryFileTransfer::new()))
            .library(Arc::new(MemoryMediaLibrary::new()))
            .picker(Arc::new(StaticPicker::canceled()))
            .location(Arc::new(StaticLocation::new(None)))
            .presenter(Arc::new(AutoRecoveryPresenter::always_deny()))
            .audit(Arc::new(MemoryAuditSink::new()))
    }

    /// Terminal session
    ///
    /// - HTTP transfers into `config.cache_dir`
    /// - recovery dialogs asked on the terminal
    /// - toasts and settings launches logged
    /// - texts and audit log from `config`
    ///
    /// Library, picker and location still have to be supplied.
    pub fn interactive(permissions: Arc<dyn PermissionProvider>, config: GateConfig) -> GateBuilder {
        GateBuilder::new()
            .config(config)
            .permissions(permissions)
            .transfer(Arc::new(HttpFileTransfer::new()))
            .presenter(Arc::new(TerminalRecoveryPresenter::new()))
            .settings(Arc::new(TracingSettingsLauncher))
            .notifier(Arc::new(TracingNotifier))
    }
}

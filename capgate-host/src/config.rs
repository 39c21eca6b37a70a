//! Gate configuration
//!
//! Loaded from a JSON file; every field has a default, so `{}` is a valid
//! configuration.
//!
//! ```json
//! {
//!   "cache_dir": "/var/cache/myapp",
//!   "page_size": 20,
//!   "recents_album": "Recents",
//!   "gallery_defaults": { "quality": 0.8 },
//!   "sync": { "debounce_ms": 250 }
//! }
//! ```

use capgate_api::{
    PickerOptions, PickerOverrides, PositionOptions, DEFAULT_PAGE_SIZE, RECENTS_ALBUM_TITLE,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::audit::{AuditError, AuditSink, FileAuditSink, NullAuditSink};
use crate::strings::StringTable;
use crate::sync::SyncOptions;

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to open audit log: {0}")]
    Audit(#[from] AuditError),
}

/// Runtime configuration for a [`crate::Gate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Directory for temp files; never cleaned by the gate
    pub cache_dir: PathBuf,
    /// Recent-assets page size
    pub page_size: usize,
    /// Title of the smart album holding recent items
    pub recents_album: String,
    /// How long toasts stay visible
    pub notify_duration_ms: u64,
    /// Show the "downloading" toast before library saves
    pub announce_saves: bool,
    pub gallery_defaults: PickerOverrides,
    pub camera_defaults: PickerOverrides,
    pub location: PositionOptions,
    /// JSON string table overriding the built-in texts
    pub strings: Option<PathBuf>,
    /// JSONL audit log
    pub audit_log: Option<PathBuf>,
    pub sync: SyncOptions,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            recents_album: RECENTS_ALBUM_TITLE.to_string(),
            notify_duration_ms: 3000,
            announce_saves: true,
            gallery_defaults: PickerOverrides::default(),
            camera_defaults: PickerOverrides::default(),
            location: PositionOptions::default(),
            strings: None,
            audit_log: None,
            sync: SyncOptions::default(),
        }
    }
}

/// `<platform cache dir>/capgate`, or a temp-dir fallback
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("capgate")
}

impl GateConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GateConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.recents_album.trim().is_empty() {
            return Err(ConfigError::Invalid("recents_album must not be empty".into()));
        }
        for (name, options) in [
            ("gallery_defaults", self.gallery_options()),
            ("camera_defaults", self.camera_options()),
        ] {
            if !(0.0..=1.0).contains(&options.quality) {
                return Err(ConfigError::Invalid(format!(
                    "{}.quality must be within 0..=1, got {}",
                    name, options.quality
                )));
            }
            if options.aspect.0 == 0 || options.aspect.1 == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{}.aspect must not contain zero",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notify_duration_ms)
    }

    /// Built-in gallery options with the configured overrides applied
    pub fn gallery_options(&self) -> PickerOptions {
        PickerOptions::gallery_defaults().merged(&self.gallery_defaults)
    }

    /// Built-in camera options with the configured overrides applied
    pub fn camera_options(&self) -> PickerOptions {
        PickerOptions::camera_defaults().merged(&self.camera_defaults)
    }

    /// English texts, overlaid with the configured string file if any
    pub fn string_table(&self) -> Result<StringTable, ConfigError> {
        let table = StringTable::english();
        match &self.strings {
            Some(path) => Ok(table.merged(StringTable::load(path)?)),
            None => Ok(table),
        }
    }

    /// File sink for `audit_log`, or a null sink
    pub fn audit_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match &self.audit_log {
            Some(path) => Ok(Arc::new(FileAuditSink::new(path)?)),
            None => Ok(Arc::new(NullAuditSink)),
        }
    }
}

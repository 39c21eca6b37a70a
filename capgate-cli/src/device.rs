//! Simulated device
//!
//! A device profile describes what the "OS" reports: the current status of
//! each capability, how undecided permission prompts are answered, what the
//! picker returns and where the device is. The photo library is a real
//! directory.
//!
//! ```json
//! {
//!   "permissions": { "media_library": "granted", "camera": "denied" },
//!   "answers": { "foreground_location": "granted" },
//!   "camera": { "canceled": false, "assets": [{ "uri": "file:///shot.jpg", "width": 4000, "height": 3000 }] },
//!   "position": { "coords": { "latitude": 35.68, "longitude": 139.76 }, "timestamp": "2024-05-01T09:00:00Z" }
//! }
//! ```

use anyhow::Context;
use async_trait::async_trait;
use capgate::backend::{MemoryPermissionProvider, StaticLocation, StaticPicker};
use capgate::{
    BackendResult, Capability, DirectoryMediaLibrary, GateConfig, PermissionProvider,
    PermissionResponse, PermissionStatus,
};
use capgate_api::{PickerResult, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::StatusOverride;

/// JSON description of a simulated device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Current status per capability; missing ones are undetermined
    pub permissions: HashMap<Capability, PermissionStatus>,
    /// Answer given to the OS prompt when it can't be asked on the terminal
    pub answers: HashMap<Capability, PermissionStatus>,
    /// Ask undecided permission prompts on the terminal
    pub ask: bool,
    pub gallery: PickerResult,
    pub camera: PickerResult,
    pub position: Option<Position>,
    /// Library directory; defaults to `<cache_dir>/library`
    pub library_dir: Option<PathBuf>,
}

impl DeviceProfile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read device profile {}", path.display()))?;
        let profile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid device profile {}", path.display()))?;
        Ok(profile)
    }

    pub fn apply_overrides(&mut self, overrides: &[StatusOverride]) {
        for o in overrides {
            self.permissions.insert(o.capability, o.status);
        }
    }

    fn permission_provider(&self) -> MemoryPermissionProvider {
        let mut provider = MemoryPermissionProvider::new();
        for (capability, status) in &self.permissions {
            provider = provider.with_status(*capability, *status);
        }
        for (capability, answer) in &self.answers {
            provider = provider.answering(*capability, *answer);
        }
        provider
    }
}

/// Backends built from a [`DeviceProfile`]
pub struct Device {
    pub permissions: Arc<dyn PermissionProvider>,
    pub library: Arc<DirectoryMediaLibrary>,
    pub picker: Arc<StaticPicker>,
    pub location: Arc<StaticLocation>,
}

impl Device {
    pub fn from_profile(profile: &DeviceProfile, config: &GateConfig) -> anyhow::Result<Self> {
        let library_dir = profile
            .library_dir
            .clone()
            .unwrap_or_else(|| config.cache_dir.join("library"));
        let library = DirectoryMediaLibrary::open(&library_dir)
            .with_context(|| format!("Failed to open library {}", library_dir.display()))?;
        tracing::debug!(library = %library_dir.display(), ask = profile.ask, "Simulated device ready");

        let provider = profile.permission_provider();
        let permissions: Arc<dyn PermissionProvider> = if profile.ask {
            Arc::new(TerminalPermissionProvider::new(provider))
        } else {
            Arc::new(provider)
        };

        Ok(Self {
            permissions,
            library: Arc::new(library),
            picker: Arc::new(StaticPicker::new(
                profile.gallery.clone(),
                profile.camera.clone(),
            )),
            location: Arc::new(StaticLocation::new(profile.position)),
        })
    }
}

/// Asks undecided permission prompts on the terminal
///
/// Statuses live in the wrapped provider, so an answer sticks for the rest
/// of the process. Without a terminal the wrapped provider's configured
/// answer is used.
pub struct TerminalPermissionProvider {
    inner: MemoryPermissionProvider,
}

impl TerminalPermissionProvider {
    pub fn new(inner: MemoryPermissionProvider) -> Self {
        Self { inner }
    }
}

fn parse_answer(input: &str) -> PermissionStatus {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" | "allow" => PermissionStatus::Granted,
        _ => PermissionStatus::Denied,
    }
}

fn ask(capability: Capability) -> io::Result<PermissionStatus> {
    let mut stdout = io::stdout();
    write!(stdout, "Allow access to {}? [y/N] ", capability)?;
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(parse_answer(&input))
}

#[async_trait]
impl PermissionProvider for TerminalPermissionProvider {
    async fn status(&self, capability: Capability) -> BackendResult<PermissionResponse> {
        self.inner.status(capability).await
    }

    async fn request(&self, capability: Capability) -> BackendResult<PermissionResponse> {
        let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();
        if !interactive || self.inner.current(capability) != PermissionStatus::Undetermined {
            return self.inner.request(capability).await;
        }

        let answer = tokio::task::spawn_blocking(move || ask(capability)).await??;
        self.inner.set_status(capability, answer);
        tracing::info!(capability = %capability, status = %answer, "Permission answered");
        Ok(PermissionResponse::from_status(answer))
    }
}

//! Deep link into the OS settings screen

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::recording::Recorder;

/// Opens the application's page in system settings
#[async_trait]
pub trait SettingsLauncher: Send + Sync {
    async fn open_settings(&self) -> BackendResult<()>;
}

/// Logs the request instead of opening anything
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSettingsLauncher;

#[async_trait]
impl SettingsLauncher for TracingSettingsLauncher {
    async fn open_settings(&self) -> BackendResult<()> {
        tracing::info!("Opening application settings");
        Ok(())
    }
}

/// Counts settings launches for testing
#[derive(Default)]
pub struct RecordingSettingsLauncher {
    opened: Recorder<()>,
}

impl RecordingSettingsLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.opened.len()
    }

    pub async fn wait_for(&self, count: usize) {
        self.opened.wait_for(count).await
    }
}

#[async_trait]
impl SettingsLauncher for RecordingSettingsLauncher {
    async fn open_settings(&self) -> BackendResult<()> {
        self.opened.push(());
        Ok(())
    }
}

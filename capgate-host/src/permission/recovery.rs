//! Denied-permission recovery
//!
//! [`DenialRecovery::present`] dispatches the settings dialog to a background
//! task and returns at once; the caller has already decided "not granted"
//! and never waits for the user's answer.

use capgate_api::Capability;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

use super::prompt::{RecoveryPresenter, RecoveryPrompt};
use super::settings::SettingsLauncher;
use crate::audit::{self, AuditSink};
use crate::strings::StringResolver;

/// Where a feature's alert texts live in the string table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertKeys {
    pub scope: &'static str,
    pub prefix: &'static str,
}

impl AlertKeys {
    pub const fn new(scope: &'static str, prefix: &'static str) -> Self {
        Self { scope, prefix }
    }

    /// Keys used when a caller does not name a feature
    pub fn for_capability(capability: Capability) -> Self {
        match capability {
            Capability::MediaLibrary => Self::new("camera_roll", "alert"),
            Capability::Camera => Self::new("image_picker", "alert.camera"),
            Capability::MediaPicker => Self::new("image_picker", "alert.media_library"),
            Capability::ForegroundLocation => Self::new("geolocation", "alert"),
        }
    }

    fn key(&self, leaf: &str) -> String {
        format!("{}.{}", self.prefix, leaf)
    }
}

/// Presents the "open settings" dialog for denied capabilities
#[derive(Clone)]
pub struct DenialRecovery {
    presenter: Arc<dyn RecoveryPresenter>,
    settings: Arc<dyn SettingsLauncher>,
    strings: Arc<dyn StringResolver>,
    audit: Arc<dyn AuditSink>,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DenialRecovery {
    pub fn new(
        presenter: Arc<dyn RecoveryPresenter>,
        settings: Arc<dyn SettingsLauncher>,
        strings: Arc<dyn StringResolver>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            presenter,
            settings,
            strings,
            audit,
            in_flight: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Resolve the dialog texts for `capability`
    pub fn prompt_for(&self, capability: Capability, keys: AlertKeys) -> RecoveryPrompt {
        let text = |leaf: &str| self.strings.resolve(&keys.key(leaf), keys.scope);
        RecoveryPrompt {
            capability,
            title: text("title"),
            description: text("description"),
            deny_label: text("deny"),
            allow_label: text("allow"),
        }
    }

    /// Show the dialog in the background
    ///
    /// Each call is independent: nothing is remembered between dialogs.
    pub fn present(&self, capability: Capability, keys: AlertKeys) {
        let prompt = self.prompt_for(capability, keys);
        let this = self.clone();
        let handle = tokio::spawn(async move { this.run(prompt).await });

        let mut in_flight = self.lock_in_flight();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    async fn run(&self, prompt: RecoveryPrompt) {
        let capability = prompt.capability;
        audit::emit(
            self.audit.as_ref(),
            audit::recovery_presented(capability, &prompt.title),
        );

        match self.presenter.present(&prompt).await {
            Ok(choice) if choice.opens_settings() => {
                audit::emit(self.audit.as_ref(), audit::settings_opened(capability));
                if let Err(e) = self.settings.open_settings().await {
                    tracing::warn!(capability = %capability, error = %e, "Failed to open settings");
                }
            }
            Ok(_) => {
                tracing::debug!(capability = %capability, "Recovery dismissed");
            }
            Err(e) => {
                tracing::warn!(capability = %capability, error = %e, "Recovery dialog failed");
            }
        }
    }

    /// Wait for every dialog dispatched so far to finish
    pub async fn settle(&self) {
        let pending: Vec<JoinHandle<()>> = self.lock_in_flight().drain(..).collect();
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Recovery dialog task failed");
            }
        }
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DenialRecovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenialRecovery")
            .field("interactive", &self.presenter.is_interactive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEventType, MemoryAuditSink};
    use crate::permission::prompt::{PromptError, RecordingRecoveryPresenter, RecoveryChoice};
    use crate::permission::settings::RecordingSettingsLauncher;
    use crate::strings::StringTable;

    struct Fixture {
        presenter: Arc<RecordingRecoveryPresenter>,
        settings: Arc<RecordingSettingsLauncher>,
        audit: Arc<MemoryAuditSink>,
        recovery: DenialRecovery,
    }

    fn fixture(choice: RecoveryChoice) -> Fixture {
        let presenter = Arc::new(RecordingRecoveryPresenter::new(choice));
        let settings = Arc::new(RecordingSettingsLauncher::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let recovery = DenialRecovery::new(
            presenter.clone(),
            settings.clone(),
            Arc::new(StringTable::english()),
            audit.clone(),
        );
        Fixture {
            presenter,
            settings,
            audit,
            recovery,
        }
    }

    #[test]
    fn test_prompt_texts() {
        let f = fixture(RecoveryChoice::Deny);
        let prompt = f.recovery.prompt_for(
            Capability::Camera,
            AlertKeys::for_capability(Capability::Camera),
        );
        assert_eq!(prompt.title, "Camera access needed");
        assert_eq!(prompt.allow_label, "Open Settings");
        assert_eq!(prompt.deny_label, "Not now");
    }

    #[tokio::test]
    async fn test_allow_opens_settings() {
        let f = fixture(RecoveryChoice::Allow);
        f.recovery.present(
            Capability::MediaLibrary,
            AlertKeys::for_capability(Capability::MediaLibrary),
        );
        f.recovery.settle().await;

        assert_eq!(f.presenter.prompt_count(), 1);
        assert_eq!(f.settings.open_count(), 1);
        assert_eq!(
            f.audit.sequence(),
            vec![AuditEventType::RecoveryPresented, AuditEventType::SettingsOpened]
        );
    }

    #[tokio::test]
    async fn test_deny_is_noop() {
        let f = fixture(RecoveryChoice::Deny);
        let keys = AlertKeys::for_capability(Capability::ForegroundLocation);
        f.recovery.present(Capability::ForegroundLocation, keys);
        f.recovery.present(Capability::ForegroundLocation, keys);
        f.recovery.settle().await;

        assert_eq!(f.presenter.prompt_count(), 2);
        assert_eq!(f.settings.open_count(), 0);
    }

    struct PanickingPresenter;

    #[async_trait::async_trait]
    impl RecoveryPresenter for PanickingPresenter {
        async fn present(&self, _prompt: &RecoveryPrompt) -> Result<RecoveryChoice, PromptError> {
            panic!("presenter crashed");
        }

        fn is_interactive(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_settle_survives_crashed_dialog() {
        let settings = Arc::new(RecordingSettingsLauncher::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let recovery = DenialRecovery::new(
            Arc::new(PanickingPresenter),
            settings.clone(),
            Arc::new(StringTable::english()),
            audit.clone(),
        );
        let keys = AlertKeys::for_capability(Capability::Camera);

        recovery.present(Capability::Camera, keys);
        recovery.settle().await;
        recovery.present(Capability::Camera, keys);
        recovery.settle().await;

        assert!(recovery.lock_in_flight().is_empty());
        assert_eq!(audit.find_by_type(AuditEventType::RecoveryPresented).len(), 2);
        assert_eq!(settings.open_count(), 0);
    }
}

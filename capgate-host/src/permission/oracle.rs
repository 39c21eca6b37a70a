//! Permission resolution
//!
//! One pass per call: read the status, prompt once if undetermined, hand
//! denials to [`DenialRecovery`]. Nothing is cached; the provider is the
//! only source of truth.

use capgate_api::{Capability, PermissionStatus};
use std::sync::Arc;

use super::recovery::{AlertKeys, DenialRecovery};
use crate::audit::{self, AuditSink};
use crate::backend::PermissionProvider;
use crate::error::BackendResult;

/// Decides whether a capability may be used right now
#[derive(Clone)]
pub struct PermissionOracle {
    provider: Arc<dyn PermissionProvider>,
    recovery: DenialRecovery,
    audit: Arc<dyn AuditSink>,
}

impl PermissionOracle {
    pub fn new(
        provider: Arc<dyn PermissionProvider>,
        recovery: DenialRecovery,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            provider,
            recovery,
            audit,
        }
    }

    /// Resolve `capability`, using its default alert texts on denial
    pub async fn check_and_maybe_request(&self, capability: Capability) -> BackendResult<bool> {
        self.check_with_alert(capability, AlertKeys::for_capability(capability))
            .await
    }

    /// Resolve `capability`, showing the alert under `keys` on denial
    ///
    /// - Granted: `true`, no prompt
    /// - Undetermined: one OS prompt, its answer returned as-is
    /// - Denied: recovery dialog dispatched, `false` returned without waiting
    ///
    /// A failing status read or request is returned as `Err`.
    pub async fn check_with_alert(
        &self,
        capability: Capability,
        keys: AlertKeys,
    ) -> BackendResult<bool> {
        let current = self.provider.status(capability).await?;
        tracing::debug!(capability = %capability, status = %current.status, "Permission status");
        audit::emit(
            self.audit.as_ref(),
            audit::permission_checked(capability, current.status),
        );

        match current.status {
            PermissionStatus::Granted => Ok(true),
            PermissionStatus::Undetermined => {
                audit::emit(self.audit.as_ref(), audit::permission_requested(capability));
                let answer = self.provider.request(capability).await?;
                tracing::info!(
                    capability = %capability,
                    granted = answer.granted,
                    "Permission request answered"
                );
                audit::emit(
                    self.audit.as_ref(),
                    audit::permission_resolved(capability, answer.status, answer.granted, true),
                );
                Ok(answer.granted)
            }
            PermissionStatus::Denied => {
                tracing::warn!(capability = %capability, "Permission denied, offering settings");
                audit::emit(
                    self.audit.as_ref(),
                    audit::permission_resolved(capability, current.status, false, false),
                );
                self.recovery.present(capability, keys);
                Ok(false)
            }
        }
    }

    pub fn recovery(&self) -> &DenialRecovery {
        &self.recovery
    }
}

impl std::fmt::Debug for PermissionOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionOracle")
            .field("recovery", &self.recovery)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEventType, MemoryAuditSink};
    use crate::backend::MemoryPermissionProvider;
    use crate::permission::prompt::{RecordingRecoveryPresenter, RecoveryChoice};
    use crate::permission::settings::RecordingSettingsLauncher;
    use crate::strings::StringTable;

    fn oracle(
        provider: Arc<MemoryPermissionProvider>,
    ) -> (PermissionOracle, Arc<RecordingRecoveryPresenter>, Arc<MemoryAuditSink>) {
        let presenter = Arc::new(RecordingRecoveryPresenter::new(RecoveryChoice::Deny));
        let audit = Arc::new(MemoryAuditSink::new());
        let recovery = DenialRecovery::new(
            presenter.clone(),
            Arc::new(RecordingSettingsLauncher::new()),
            Arc::new(StringTable::english()),
            audit.clone(),
        );
        (
            PermissionOracle::new(provider, recovery, audit.clone()),
            presenter,
            audit,
        )
    }

    #[tokio::test]
    async fn test_granted_skips_request() {
        for cap in Capability::ALL {
            let provider =
                Arc::new(MemoryPermissionProvider::new().with_status(cap, PermissionStatus::Granted));
            let (oracle, presenter, _) = oracle(provider.clone());

            assert!(oracle.check_and_maybe_request(cap).await.unwrap());
            assert_eq!(provider.request_count(cap), 0);
            assert_eq!(presenter.prompt_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_undetermined_requests_once() {
        for cap in Capability::ALL {
            for answer in [PermissionStatus::Granted, PermissionStatus::Denied] {
                let provider = Arc::new(MemoryPermissionProvider::new().answering(cap, answer));
                let (oracle, presenter, audit) = oracle(provider.clone());

                let granted = oracle.check_and_maybe_request(cap).await.unwrap();
                assert_eq!(granted, answer == PermissionStatus::Granted);
                assert_eq!(provider.request_count(cap), 1);
                assert_eq!(provider.status_count(cap), 1);
                // A prompt answered "no" is not followed by the recovery dialog
                assert_eq!(presenter.prompt_count(), 0);
                assert_eq!(audit.find_by_type(AuditEventType::PermissionRequested).len(), 1);
            }
        }
    }

    #[tokio::test]
    async fn test_denied_presents_recovery() {
        for cap in Capability::ALL {
            let provider =
                Arc::new(MemoryPermissionProvider::new().with_status(cap, PermissionStatus::Denied));
            let (oracle, presenter, _) = oracle(provider.clone());

            for round in 1..=2 {
                assert!(!oracle.check_and_maybe_request(cap).await.unwrap());
                presenter.wait_for(round).await;
            }
            oracle.recovery().settle().await;

            assert_eq!(presenter.prompt_count(), 2);
            assert_eq!(provider.request_count(cap), 0);
            assert!(presenter.prompts().iter().all(|p| p.capability == cap));
        }
    }

    #[tokio::test]
    async fn test_denied_location_prompt_title() {
        let provider = Arc::new(
            MemoryPermissionProvider::new()
                .with_status(Capability::ForegroundLocation, PermissionStatus::Denied),
        );
        let (oracle, presenter, _) = oracle(provider);

        assert!(!oracle
            .check_and_maybe_request(Capability::ForegroundLocation)
            .await
            .unwrap());
        oracle.recovery().settle().await;
        assert_eq!(presenter.prompts()[0].title, "Location access needed");
    }

    #[tokio::test]
    async fn test_status_failure_propagates() {
        let provider = Arc::new(MemoryPermissionProvider::new());
        provider.fail_status_reads(true);
        let (oracle, presenter, _) = oracle(provider.clone());

        let err = oracle
            .check_and_maybe_request(Capability::MediaLibrary)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::BackendError::Unavailable(Capability::MediaLibrary)
        ));
        assert_eq!(provider.request_count(Capability::MediaLibrary), 0);
        assert_eq!(presenter.prompt_count(), 0);
    }
}

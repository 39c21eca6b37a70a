//! The permission-gated action wrapper
//!
//! [`Guard::run`] is what every feature entry point is built from:
//!
//! 1. resolve the capability through the [`PermissionOracle`]
//! 2. on refusal return `Ok(None)` without touching anything else
//! 3. otherwise optionally dispatch a "starting" toast
//! 4. run the action and return whatever it produced
//!
//! Errors from the action are passed through untouched.

use capgate_api::Capability;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::audit::{self, AuditSink};
use crate::error::BackendResult;
use crate::permission::{AlertKeys, PermissionOracle};
use crate::strings::{StringResolver, TOAST_SCOPE};
use crate::toast::Notifier;

/// Default time a toast stays visible
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_millis(3000);

/// Runs capability actions behind a permission check
#[derive(Clone)]
pub struct Guard {
    oracle: PermissionOracle,
    notifier: Arc<dyn Notifier>,
    strings: Arc<dyn StringResolver>,
    audit: Arc<dyn AuditSink>,
    notice_duration: Duration,
}

impl Guard {
    pub fn new(
        oracle: PermissionOracle,
        notifier: Arc<dyn Notifier>,
        strings: Arc<dyn StringResolver>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            oracle,
            notifier,
            strings,
            audit,
            notice_duration: DEFAULT_NOTICE_DURATION,
        }
    }

    pub fn with_notice_duration(mut self, duration: Duration) -> Self {
        self.notice_duration = duration;
        self
    }

    /// Run `action` if `capability` resolves to granted
    ///
    /// `notice` names a toast key shown right before the action starts.
    /// `name` identifies the entry point in logs and audit records.
    pub async fn run<T, F, Fut>(
        &self,
        capability: Capability,
        alert: AlertKeys,
        notice: Option<&str>,
        name: &str,
        action: F,
    ) -> BackendResult<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BackendResult<Option<T>>>,
    {
        if !self.oracle.check_with_alert(capability, alert).await? {
            tracing::debug!(capability = %capability, action = name, "Action skipped, not granted");
            return Ok(None);
        }

        if let Some(key) = notice {
            self.notifier
                .info(&self.strings.resolve(key, TOAST_SCOPE), self.notice_duration);
        }

        tracing::debug!(capability = %capability, action = name, "Running guarded action");
        audit::emit(self.audit.as_ref(), audit::capability_used(capability, name));
        action().await
    }

    pub fn oracle(&self) -> &PermissionOracle {
        &self.oracle
    }

    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    /// Wait for recovery dialogs dispatched by earlier calls
    pub async fn settle(&self) {
        self.oracle.recovery().settle().await
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("oracle", &self.oracle)
            .field("notice_duration", &self.notice_duration)
            .finish()
    }
}

//! Audit trail for permission and capability events
//!
//! Every status read, OS prompt, recovery dialog and guarded action can be
//! reported to an [`AuditSink`]. Sinks never influence control flow: a sink
//! failure is logged and the operation carries on.

use capgate_api::{Capability, PermissionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::recording::Recorder;

/// Audit event for one step of a guarded operation
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Capability involved, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<Capability>,
    pub details: AuditDetails,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, details: AuditDetails) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            capability: None,
            details,
        }
    }

    pub fn for_capability(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }
}

/// Type of audit event
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Current status was read
    PermissionChecked,
    /// OS prompt was shown
    PermissionRequested,
    /// Access was granted (already, or by the prompt)
    PermissionGranted,
    /// Access was denied (already, or by the prompt)
    PermissionDenied,
    /// Recovery dialog was shown
    RecoveryPresented,
    /// User chose to open system settings
    SettingsOpened,
    /// A guarded action ran
    CapabilityUsed,
    /// A new asset list was published
    AssetsPublished,
}

/// Details about the audit event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AuditDetails {
    Permission {
        status: PermissionStatus,
        /// Whether an OS prompt produced this status
        prompted: bool,
    },
    Recovery {
        /// Dialog title as shown
        title: String,
    },
    Action {
        /// Entry point name (e.g. `save_from_url`)
        action: String,
    },
    Assets {
        count: usize,
    },
    Settings,
}

/// Error type for audit sinks
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit event could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for audit events
///
/// ```rust
/// use capgate::audit::{AuditError, AuditEvent, AuditSink};
///
/// struct StderrSink;
///
/// impl AuditSink for StderrSink {
///     fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
///         eprintln!("{:?} {:?}", event.event_type, event.capability);
///         Ok(())
///     }
/// }
/// ```
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;

    /// Push buffered events to their destination
    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Record an event, logging (not propagating) sink failures
pub(crate) fn emit(sink: &dyn AuditSink, event: AuditEvent) {
    if let Err(e) = sink.record(&event) {
        tracing::warn!(event = ?event.event_type, error = %e, "Failed to record audit event");
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Appends one JSON object per line to a file
///
/// Each line is written with a single `write_all` and is visible to readers
/// as soon as `record` returns.
pub struct FileAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Open `path` for appending, creating parent directories
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), "Audit log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(&line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sync_data()?;
        Ok(())
    }
}

impl fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("path", &self.path)
            .finish()
    }
}

/// Keeps every event in memory, for tests
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Recorder<AuditEvent>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.items()
    }

    pub fn count(&self) -> usize {
        self.events.len()
    }

    pub fn find_by_type(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        self.matching(|e| e.event_type == event_type)
    }

    pub fn find_by_capability(&self, capability: Capability) -> Vec<AuditEvent> {
        self.matching(|e| e.capability == Some(capability))
    }

    /// Event types in recording order
    pub fn sequence(&self) -> Vec<AuditEventType> {
        self.events().into_iter().map(|e| e.event_type).collect()
    }

    /// Wait until at least `count` events have been recorded
    pub async fn wait_for(&self, count: usize) {
        self.events.wait_for(count).await
    }

    fn matching(&self, keep: impl Fn(&AuditEvent) -> bool) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|e| keep(e)).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events.push(event.clone());
        Ok(())
    }
}

impl fmt::Debug for MemoryAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAuditSink")
            .field("count", &self.count())
            .finish()
    }
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}

// ============================================================================
// Event constructors
// ============================================================================

pub fn permission_checked(capability: Capability, status: PermissionStatus) -> AuditEvent {
    AuditEvent::new(
        AuditEventType::PermissionChecked,
        AuditDetails::Permission {
            status,
            prompted: false,
        },
    )
    .for_capability(capability)
}

pub fn permission_requested(capability: Capability) -> AuditEvent {
    AuditEvent::new(
        AuditEventType::PermissionRequested,
        AuditDetails::Permission {
            status: PermissionStatus::Undetermined,
            prompted: true,
        },
    )
    .for_capability(capability)
}

/// Final decision, granted or denied, after a read or a prompt
pub fn permission_resolved(
    capability: Capability,
    status: PermissionStatus,
    granted: bool,
    prompted: bool,
) -> AuditEvent {
    let event_type = if granted {
        AuditEventType::PermissionGranted
    } else {
        AuditEventType::PermissionDenied
    };
    AuditEvent::new(event_type, AuditDetails::Permission { status, prompted })
        .for_capability(capability)
}

pub fn recovery_presented(capability: Capability, title: &str) -> AuditEvent {
    AuditEvent::new(
        AuditEventType::RecoveryPresented,
        AuditDetails::Recovery {
            title: title.to_string(),
        },
    )
    .for_capability(capability)
}

pub fn settings_opened(capability: Capability) -> AuditEvent {
    AuditEvent::new(AuditEventType::SettingsOpened, AuditDetails::Settings)
        .for_capability(capability)
}

pub fn capability_used(capability: Capability, action: &str) -> AuditEvent {
    AuditEvent::new(
        AuditEventType::CapabilityUsed,
        AuditDetails::Action {
            action: action.to_string(),
        },
    )
    .for_capability(capability)
}

pub fn assets_published(count: usize) -> AuditEvent {
    AuditEvent::new(AuditEventType::AssetsPublished, AuditDetails::Assets { count })
        .for_capability(Capability::MediaLibrary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink() {
        let sink = MemoryAuditSink::new();
        sink.record(&permission_requested(Capability::Camera)).unwrap();
        sink.record(&assets_published(4)).unwrap();

        assert_eq!(sink.count(), 2);
        let events = sink.find_by_type(AuditEventType::PermissionRequested);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].capability, Some(Capability::Camera));
        assert_eq!(sink.find_by_capability(Capability::MediaLibrary).len(), 1);
        assert_eq!(
            sink.sequence(),
            vec![
                AuditEventType::PermissionRequested,
                AuditEventType::AssetsPublished
            ]
        );
    }

    #[test]
    fn test_resolved_event_type() {
        let granted = permission_resolved(
            Capability::MediaLibrary,
            PermissionStatus::Granted,
            true,
            true,
        );
        assert_eq!(granted.event_type, AuditEventType::PermissionGranted);

        let denied = permission_resolved(
            Capability::MediaLibrary,
            PermissionStatus::Denied,
            false,
            false,
        );
        assert_eq!(denied.event_type, AuditEventType::PermissionDenied);
    }

    #[test]
    fn test_event_serialization() {
        let event = capability_used(Capability::ForegroundLocation, "read_current_location");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"capability_used\""));
        assert!(json.contains("\"capability\":\"foreground_location\""));
        assert!(json.contains("read_current_location"));

        let json = serde_json::to_string(&assets_published(3)).unwrap();
        assert!(json.contains("\"details\":{\"type\":\"assets\",\"count\":3}"));
    }

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("events.jsonl");

        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&permission_checked(
            Capability::MediaPicker,
            PermissionStatus::Denied,
        ))
        .unwrap();
        sink.record(&settings_opened(Capability::MediaPicker)).unwrap();
        sink.flush().unwrap();

        // Reopening appends instead of truncating
        let reopened = FileAuditSink::new(&path).unwrap();
        reopened.record(&assets_published(0)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"status\":\"denied\""));
        assert!(lines[1].contains("settings_opened"));
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullAuditSink;
        assert!(sink.record(&settings_opened(Capability::Camera)).is_ok());
        assert!(sink.flush().is_ok());
    }
}

//! Failures raised by the platform collaborators
//!
//! Permission denial and user cancellation are not errors: guarded entry
//! points report them as `Ok(None)`. Everything in [`BackendError`] is a
//! transport, filesystem, hardware or query failure and is handed to the
//! caller untouched.

use capgate_api::Capability;
use thiserror::Error;

/// Convenience alias for collaborator results
pub type BackendResult<T> = Result<T, BackendError>;

/// Error type for OS/library collaborator calls
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode payload: {0}")]
    Decode(String),

    #[error("Capability not available on this device: {0}")]
    Unavailable(Capability),

    #[error("Library query failed: {0}")]
    Query(String),

    #[error("Asset {0} no longer exists")]
    AssetGone(String),

    #[error("Failed to watch library: {0}")]
    Watch(#[source] notify::Error),

    #[error("Backend task failed: {0}")]
    Task(String),
}

impl BackendError {
    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Check if the asset was removed after it was listed
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::AssetGone(_))
    }

    /// Check if this failure came from the network or filesystem
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Http { .. })
    }
}

impl From<tokio::task::JoinError> for BackendError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let io = BackendError::from(std::io::Error::other("disk gone"));
        assert!(io.is_transport());
        assert!(!BackendError::query("bad album").is_transport());
        assert!(!BackendError::Unavailable(Capability::Camera).is_transport());
        assert!(BackendError::AssetGone("a.jpg".into()).is_gone());
        assert!(!BackendError::query("bad album").is_gone());
    }

    #[test]
    fn test_display() {
        let err = BackendError::Unavailable(Capability::ForegroundLocation);
        assert_eq!(
            err.to_string(),
            "Capability not available on this device: foreground_location"
        );
    }
}

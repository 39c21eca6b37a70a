//! Temporary file naming
//!
//! Temp files bridge a remote URL or an encoded payload into the library
//! save. They are never removed here: the cache directory is owned by the
//! platform and cleaned up externally.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Generates unique paths inside a cache directory
#[derive(Debug, Clone)]
pub struct TempFiles {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl TempFiles {
    /// `image_<uuid>.jpeg` files inside `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "image".to_string(),
            extension: "jpeg".to_string(),
        }
    }

    /// Change the file name prefix and extension
    pub fn named(mut self, prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.extension = extension.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh path that no previous call has returned
    pub fn next_path(&self) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.{}",
            self.prefix,
            Uuid::new_v4(),
            self.extension
        ))
    }
}

//! Localized string lookup
//!
//! Alert and toast texts are resolved by `(key, scope)` through a
//! [`StringResolver`]. [`StringTable`] is the built-in implementation: an
//! English table that a JSON file can extend or override.
//!
//! ```json
//! { "camera_roll": { "alert.title": "Fotos" }, "toast": { "downloading_photos": "..." } }
//! ```

use std::collections::HashMap;
use std::path::Path;

use crate::config::ConfigError;

/// Scope of toast messages
pub const TOAST_SCOPE: &str = "toast";

/// Toast shown when a library save starts
pub const DOWNLOADING_PHOTOS: &str = "downloading_photos";

/// Resolves a message key within a scope
pub trait StringResolver: Send + Sync {
    /// Look up `key` in `scope`; never fails
    fn resolve(&self, key: &str, scope: &str) -> String;
}

/// Scoped string table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    scopes: HashMap<String, HashMap<String, String>>,
}

impl StringTable {
    /// Table with no entries; every lookup falls back to `scope.key`
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in English texts for every alert and toast
    pub fn english() -> Self {
        let mut table = Self::empty();

        table.insert_alert(
            "camera_roll",
            "alert",
            "Photo library access needed",
            "Allow access to your photo library in Settings to save images.",
        );
        table.insert_alert(
            "geolocation",
            "alert",
            "Location access needed",
            "Allow location access in Settings to use your current position.",
        );
        table.insert_alert(
            "image_picker",
            "alert.camera",
            "Camera access needed",
            "Allow camera access in Settings to take a photo.",
        );
        table.insert_alert(
            "image_picker",
            "alert.media_library",
            "Photo library access needed",
            "Allow photo library access in Settings to choose an image.",
        );
        table.insert_alert(
            "media_picker",
            "alert.media_library",
            "Photo library access needed",
            "Allow photo library access in Settings to show your recent photos.",
        );
        table.insert(TOAST_SCOPE, DOWNLOADING_PHOTOS, "Downloading photos...");

        table
    }

    fn insert_alert(&mut self, scope: &str, prefix: &str, title: &str, description: &str) {
        self.insert(scope, format!("{}.title", prefix), title);
        self.insert(scope, format!("{}.description", prefix), description);
        self.insert(scope, format!("{}.deny", prefix), "Not now");
        self.insert(scope, format!("{}.allow", prefix), "Open Settings");
    }

    /// Add or replace one entry
    pub fn insert(
        &mut self,
        scope: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.scopes
            .entry(scope.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str, scope: &str) -> Option<&str> {
        self.scopes
            .get(scope)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Parse a `{ scope: { key: text } }` JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let scopes: HashMap<String, HashMap<String, String>> = serde_json::from_str(json)?;
        Ok(Self { scopes })
    }

    /// Load a JSON table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(ConfigError::Parse)
    }

    /// Overlay `other` on this table; its entries win
    pub fn merged(mut self, other: StringTable) -> Self {
        for (scope, entries) in other.scopes {
            self.scopes.entry(scope).or_default().extend(entries);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.scopes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StringResolver for StringTable {
    fn resolve(&self, key: &str, scope: &str) -> String {
        match self.get(key, scope) {
            Some(text) => text.to_string(),
            None => {
                tracing::debug!(scope = %scope, key = %key, "Missing string");
                format!("{}.{}", scope, key)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_covers_alerts() {
        let table = StringTable::english();
        for (scope, prefix) in [
            ("camera_roll", "alert"),
            ("geolocation", "alert"),
            ("image_picker", "alert.camera"),
            ("image_picker", "alert.media_library"),
            ("media_picker", "alert.media_library"),
        ] {
            for leaf in ["title", "description", "deny", "allow"] {
                let key = format!("{}.{}", prefix, leaf);
                assert!(table.get(&key, scope).is_some(), "missing {}:{}", scope, key);
            }
        }
        assert_eq!(
            table.resolve(DOWNLOADING_PHOTOS, TOAST_SCOPE),
            "Downloading photos..."
        );
    }

    #[test]
    fn test_missing_key_falls_back() {
        let table = StringTable::empty();
        assert_eq!(table.resolve("alert.title", "camera_roll"), "camera_roll.alert.title");
        assert!(table.is_empty());
    }

    #[test]
    fn test_json_overrides() {
        let overrides =
            StringTable::from_json(r#"{"camera_roll": {"alert.allow": "Einstellungen"}}"#)
                .unwrap();
        let table = StringTable::english().merged(overrides);
        assert_eq!(table.resolve("alert.allow", "camera_roll"), "Einstellungen");
        assert_eq!(table.resolve("alert.deny", "camera_roll"), "Not now");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strings.json");
        std::fs::write(&path, r#"{"toast": {"downloading_photos": "Saving..."}}"#).unwrap();

        let table = StringTable::load(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(DOWNLOADING_PHOTOS, TOAST_SCOPE), "Saving...");

        assert!(matches!(
            StringTable::load(dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}

//! Catalog persistence
//!
//! The catalog is stored as a single JSON array and always rewritten as a
//! whole. Writes go to a sibling temporary file that is renamed over the
//! catalog, so a crash mid-write leaves the previous checkpoint intact.

use super::CatalogEntry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the catalog file
    #[error("Failed to read catalog {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write the catalog file
    #[error("Failed to write catalog {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The catalog file does not contain a valid entry list
    #[error("Failed to deserialize catalog {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize entries
    #[error("Failed to serialize catalog: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// JSON file backed storage for the catalog
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all persisted entries
    ///
    /// A missing file yields an empty catalog. A file that exists but cannot
    /// be read or parsed is an error, since overwriting it would lose data.
    pub fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No catalog found, starting fresh");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| CatalogError::ReadFailed {
            path: self.path.clone(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<CatalogEntry> =
            serde_json::from_str(&content).map_err(|e| CatalogError::DeserializationFailed {
                path: self.path.clone(),
                source: e,
            })?;

        debug!(path = %self.path.display(), count = entries.len(), "Catalog loaded");
        Ok(entries)
    }

    /// Overwrites the catalog with the given entries
    pub fn save(&self, entries: &[CatalogEntry]) -> Result<(), CatalogError> {
        let content = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CatalogError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut temp_path = self.path.as_os_str().to_owned();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        fs::write(&temp_path, content).map_err(|e| CatalogError::WriteFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        // Rename is atomic on the same filesystem
        fs::rename(&temp_path, &self.path).map_err(|e| CatalogError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry {
                id: "abc".to_string(),
                title: "Pilot".to_string(),
                url: "https://www.youtube.com/watch?v=abc".to_string(),
                season: "01".to_string(),
                episode: "01".to_string(),
                description: "The first one".to_string(),
                published_at: "2020-01-02T03:04:05Z".to_string(),
                channel_title: "Channel".to_string(),
                thumbnail_url: "https://i.ytimg.com/vi/abc/maxresdefault.jpg".to_string(),
                image_saved: true,
                downloaded: false,
                last_error: "network down".to_string(),
            },
            CatalogEntry {
                id: "def".to_string(),
                title: "Second".to_string(),
                season: "01".to_string(),
                episode: "02".to_string(),
                downloaded: true,
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = CatalogStore::new(temp.path().join("missing.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = CatalogStore::new(temp.path().join("catalog.json"));
        let entries = sample_entries();

        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn test_save_overwrites_previous_content() {
        let temp = TempDir::new().unwrap();
        let store = CatalogStore::new(temp.path().join("catalog.json"));

        store.save(&sample_entries()).unwrap();
        store.save(&sample_entries()[..1]).unwrap();

        assert_eq!(store.load().unwrap().len(), 1);
        assert!(!temp.path().join("catalog.json.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let store = CatalogStore::new(temp.path().join("nested").join("catalog.json"));

        store.save(&sample_entries()).unwrap();
        assert!(store.path().is_file());
    }

    #[test]
    fn test_load_corrupt_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.json");
        fs::write(&path, "{ not json").unwrap();

        let result = CatalogStore::new(&path).load();
        assert!(matches!(
            result,
            Err(CatalogError::DeserializationFailed { .. })
        ));
    }

    #[test]
    fn test_load_tolerates_missing_progress_flags() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.json");
        fs::write(
            &path,
            r#"[{"id":"x","title":"T","url":"u","season":"01","episode":"02",
                "description":"","publishedAt":"2021-01-01T00:00:00Z",
                "channelTitle":"C","thumbnailUrl":""}]"#,
        )
        .unwrap();

        let entries = CatalogStore::new(&path).load().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].downloaded);
        assert!(!entries[0].image_saved);
        assert!(entries[0].last_error.is_empty());
    }
}

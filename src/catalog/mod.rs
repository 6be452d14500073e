/// The catalog of known episodes and its reconciliation with remote items.
///
/// A catalog is the ordered list of every entry ever discovered for a show.
/// New remote items are merged into it by title, never by position.
mod store;

pub use store::{CatalogError, CatalogStore};

use crate::file_operations::{episode_filename, episode_filepath};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// One tracked video with its episode identity and acquisition progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Remote video id, stable across runs
    pub id: String,
    /// Display title after episode parsing
    pub title: String,
    /// Canonical watch URL
    pub url: String,
    /// Two-digit season designator, empty when unknown
    pub season: String,
    /// Two-digit episode designator, empty when unknown
    pub episode: String,
    pub description: String,
    /// ISO-8601 publish timestamp as reported by the remote API
    pub published_at: String,
    pub channel_title: String,
    /// Largest available thumbnail
    pub thumbnail_url: String,
    /// Thumbnail stored next to the episode
    #[serde(default)]
    pub image_saved: bool,
    /// Merged media file stored in the library
    #[serde(default)]
    pub downloaded: bool,
    /// Description of the last acquisition failure, empty when none
    #[serde(default)]
    pub last_error: String,
}

impl CatalogEntry {
    /// File stem of this episode, `S<SS>E<EE> - <title>`
    pub fn filename(&self) -> String {
        episode_filename(&self.season, &self.episode, &self.title)
    }

    /// Library-relative path without extension
    pub fn filepath(&self, show_name: &str) -> String {
        episode_filepath(show_name, &self.season, &self.episode, &self.title)
    }

    /// Whether nothing is left to acquire for this entry
    pub fn is_complete(&self) -> bool {
        self.image_saved && self.downloaded
    }
}

/// Canonicalizes a title for equality comparison
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Returns the fresh entries whose titles are not yet part of the catalog
///
/// Duplicates inside `fresh` are collapsed as well; the first occurrence
/// wins. Input order is preserved.
pub fn reconcile(existing: &[CatalogEntry], fresh: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut known: HashSet<String> = existing
        .iter()
        .map(|entry| normalize_title(&entry.title))
        .collect();

    fresh
        .into_iter()
        .filter(|entry| {
            let is_new = known.insert(normalize_title(&entry.title));
            if !is_new {
                debug!(title = %entry.title, "Entry already in catalog");
            }
            is_new
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, title: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            title: title.to_string(),
            season: "01".to_string(),
            episode: "01".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Hello World "), "hello world");
        assert_eq!(normalize_title("HELLO WORLD"), "hello world");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn test_normalize_title_ignores_case_and_outer_whitespace() {
        let variants = ["My Title", "  my title", "MY TITLE\t", "\nMy TiTlE  "];
        for variant in variants {
            assert_eq!(normalize_title(variant), normalize_title("My Title"));
        }
    }

    #[test]
    fn test_normalize_title_keeps_inner_whitespace() {
        assert_ne!(normalize_title("My  Title"), normalize_title("My Title"));
    }

    #[test]
    fn test_reconcile_skips_known_titles() {
        let existing = vec![entry("a", "First Video")];
        let fresh = vec![entry("a", " first video "), entry("b", "Second Video")];

        let added = reconcile(&existing, fresh);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].id, "b");
    }

    #[test]
    fn test_reconcile_collapses_duplicates_within_batch() {
        let fresh = vec![
            entry("a", "Same"),
            entry("b", "SAME"),
            entry("c", "Other"),
        ];

        let added = reconcile(&[], fresh);
        let ids: Vec<_> = added.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let batch = vec![entry("a", "One"), entry("b", "Two"), entry("c", "Three")];

        let mut catalog = Vec::new();
        let added = reconcile(&catalog, batch.clone());
        assert_eq!(added.len(), 3);
        catalog.extend(added);

        assert!(reconcile(&catalog, batch).is_empty());
    }

    #[test]
    fn test_derived_paths() {
        let mut e = entry("a", "Pilot");
        e.season = "02".to_string();
        e.episode = "05".to_string();

        assert_eq!(e.filename(), "S02E05 - Pilot");
        assert_eq!(e.filepath("Show"), "Show/Season 02/S02E05 - Pilot");

        // Paths follow the classification fields
        e.episode = "06".to_string();
        assert_eq!(e.filename(), "S02E06 - Pilot");
    }

    #[test]
    fn test_entry_json_field_names() {
        let e = CatalogEntry {
            image_saved: true,
            last_error: "boom".to_string(),
            ..entry("a", "Pilot")
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["imageSaved"], true);
        assert_eq!(json["lastError"], "boom");
        assert_eq!(json["publishedAt"], "");
        assert!(json.get("filepath").is_none());
    }
}

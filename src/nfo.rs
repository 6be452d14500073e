//! Episode metadata sidecar
//!
//! Media servers (Kodi, Jellyfin, Emby) read an `.nfo` XML file next to each
//! episode. We render a fixed `<episodedetails>` document from the catalog
//! entry and never touch an existing file, so manual edits survive.

use crate::catalog::CatalogEntry;
use quick_xml::escape::escape;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing a sidecar
#[derive(Debug, Error)]
pub enum NfoError {
    /// Failed to write the sidecar file
    #[error("Failed to write sidecar {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// Outcome of a sidecar write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarStatus {
    Written,
    AlreadyPresent,
}

/// Renders the episode details document for an entry
pub fn render_episode_nfo(entry: &CatalogEntry, show_name: &str) -> String {
    let aired = entry.published_at.get(..10).unwrap_or(&entry.published_at);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<episodedetails>
  <title>{title}</title>
  <originaltitle>{title}</originaltitle>
  <showtitle>{show}</showtitle>
  <season>{season}</season>
  <episode>{episode}</episode>
  <displayseason>-1</displayseason>
  <displayepisode>-1</displayepisode>
  <id>{id}</id>
  <uniqueid type="youtube" default="true">{id}</uniqueid>
  <plot>{plot}</plot>
  <runtime>0</runtime>
  <premiered>{aired}</premiered>
  <aired>{aired}</aired>
  <studio>{channel}</studio>
  <watched>false</watched>
  <playcount>0</playcount>
  <fileinfo>
    <streamdetails>
      <video>
        <aspect>1.78</aspect>
        <width>1280</width>
        <height>720</height>
      </video>
    </streamdetails>
  </fileinfo>
  <source>{url}</source>
  <original_filename>{filename}.mp4</original_filename>
</episodedetails>
"#,
        title = escape(entry.title.as_str()),
        show = escape(show_name),
        season = escape(entry.season.as_str()),
        episode = escape(entry.episode.as_str()),
        id = escape(entry.id.as_str()),
        plot = escape(entry.description.as_str()),
        aired = escape(aired),
        channel = escape(entry.channel_title.as_str()),
        url = escape(entry.url.as_str()),
        filename = escape(entry.filename().as_str()),
    )
}

/// Writes the sidecar for an entry unless the file already exists
pub fn write_episode_nfo(
    path: &Path,
    entry: &CatalogEntry,
    show_name: &str,
) -> Result<SidecarStatus, NfoError> {
    if path.exists() {
        return Ok(SidecarStatus::AlreadyPresent);
    }

    fs::write(path, render_episode_nfo(entry, show_name)).map_err(|e| NfoError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(SidecarStatus::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            id: "abc".to_string(),
            title: "Fish & Chips <live>".to_string(),
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            season: "02".to_string(),
            episode: "07".to_string(),
            description: "Plot".to_string(),
            published_at: "2021-06-05T10:00:00Z".to_string(),
            channel_title: "Kitchen".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_escapes_and_fills_fields() {
        let xml = render_episode_nfo(&entry(), "Cooking Show");

        assert!(xml.contains("<title>Fish &amp; Chips &lt;live&gt;</title>"));
        assert!(xml.contains("<showtitle>Cooking Show</showtitle>"));
        assert!(xml.contains("<season>02</season>"));
        assert!(xml.contains("<episode>07</episode>"));
        assert!(xml.contains("<aired>2021-06-05</aired>"));
        assert!(xml.contains("<source>https://www.youtube.com/watch?v=abc</source>"));
        assert!(xml.contains("<original_filename>S02E07 - Fish &amp; Chips -live-.mp4"));
    }

    #[test]
    fn test_write_skips_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("episode.nfo");

        assert_eq!(
            write_episode_nfo(&path, &entry(), "Show").unwrap(),
            SidecarStatus::Written
        );
        fs::write(&path, "edited by hand").unwrap();

        assert_eq!(
            write_episode_nfo(&path, &entry(), "Show").unwrap(),
            SidecarStatus::AlreadyPresent
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "edited by hand");
    }
}

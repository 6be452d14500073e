//! Configuration module
//!
//! This module turns loosely provided settings (CLI flags, environment,
//! `.env` file) into a validated `Config` value that is constructed once and
//! passed to every component.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default delay between two discovery page requests
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(5);

/// Default upper bound of discovery pages fetched per run
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Errors that can occur while validating configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required settings are absent
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Channel and playlist were both given
    #[error("YT_CHANNEL_ID and YT_PLAYLIST_ID are mutually exclusive, set only one of them")]
    ConflictingSource,

    /// The season start year is not a number
    #[error("SEASON_START_YEAR must be a year, got {0:?}")]
    InvalidSeasonStartYear(String),
}

/// Which remote collection is mirrored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelector {
    /// All uploads of a channel (search endpoint)
    Channel(String),
    /// All items of a playlist (playlistItems endpoint)
    Playlist(String),
}

/// Settings needed to discover remote items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Credential for the remote discovery API
    pub api_key: String,
    /// The channel or playlist to mirror
    pub source: SourceSelector,
    /// First year of season one for inferred numbering
    pub season_start_year: i32,
    /// Pause between page requests
    pub page_delay: Duration,
    /// Maximum number of pages fetched in a single run
    pub max_pages: usize,
}

/// Settings describing the local library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Display name of the show, also the top-level library folder
    pub show_name: String,
    /// Root directory the show folder is placed in
    pub output_dir: PathBuf,
    /// Location of the persisted catalog
    pub catalog_path: PathBuf,
    /// Program used to list media formats
    pub yt_dlp_path: PathBuf,
}

/// Complete configuration for a full sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub library: LibraryConfig,
}

/// Raw, unvalidated configuration values
///
/// Every value is optional here; `validate_*` decides which ones are
/// required for a given kind of run.
#[derive(Debug, Clone, Default)]
pub struct ConfigInput {
    pub api_key: Option<String>,
    pub channel_id: Option<String>,
    pub playlist_id: Option<String>,
    pub show_name: Option<String>,
    pub season_start_year: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub page_delay: Option<Duration>,
    pub max_pages: Option<usize>,
    pub yt_dlp_path: Option<PathBuf>,
}

impl ConfigInput {
    /// Validates everything required for discovery plus acquisition
    ///
    /// All missing fields are collected and reported together.
    pub fn validate(self) -> Result<Config, ConfigError> {
        let mut missing = Vec::new();

        let api_key = present(self.api_key.clone());
        if api_key.is_none() {
            missing.push("YT_API_KEY");
        }

        let channel_id = present(self.channel_id.clone());
        let playlist_id = present(self.playlist_id.clone());
        let source = match (channel_id, playlist_id) {
            (Some(_), Some(_)) => Some(Err(ConfigError::ConflictingSource)),
            (Some(channel), None) => Some(Ok(SourceSelector::Channel(channel))),
            (None, Some(playlist)) => Some(Ok(SourceSelector::Playlist(playlist))),
            (None, None) => {
                missing.push("YT_CHANNEL_ID or YT_PLAYLIST_ID");
                None
            }
        };

        if present(self.show_name.clone()).is_none() {
            missing.push("YT_CHANNEL_NAME");
        }

        let season_start_year = present(self.season_start_year.clone());
        if season_start_year.is_none() {
            missing.push("SEASON_START_YEAR");
        }

        let (Some(api_key), Some(source), Some(raw_year), true) =
            (api_key, source, season_start_year, missing.is_empty())
        else {
            return Err(ConfigError::MissingFields(missing));
        };
        let source = source?;

        let season_start_year = raw_year
            .parse::<i32>()
            .map_err(|_| ConfigError::InvalidSeasonStartYear(raw_year.clone()))?;

        let discovery = DiscoveryConfig {
            api_key,
            source,
            season_start_year,
            page_delay: self.page_delay.unwrap_or(DEFAULT_PAGE_DELAY),
            max_pages: self.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
        };

        let library = self.validate_library()?;

        Ok(Config { discovery, library })
    }

    /// Validates only what is needed to work on an existing catalog
    pub fn validate_library(self) -> Result<LibraryConfig, ConfigError> {
        let show_name =
            present(self.show_name).ok_or(ConfigError::MissingFields(vec!["YT_CHANNEL_NAME"]))?;

        let output_dir = self.output_dir.unwrap_or_else(|| PathBuf::from("."));
        let catalog_path = self
            .catalog_path
            .unwrap_or_else(|| output_dir.join(format!("{}.json", show_name)));

        Ok(LibraryConfig {
            show_name,
            output_dir,
            catalog_path,
            yt_dlp_path: self.yt_dlp_path.unwrap_or_else(|| PathBuf::from("yt-dlp")),
        })
    }
}

/// Treats empty or whitespace-only values as absent
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> ConfigInput {
        ConfigInput {
            api_key: Some("key".to_string()),
            channel_id: Some("UC123".to_string()),
            show_name: Some("My Show".to_string()),
            season_start_year: Some("2020".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_complete_input() {
        let config = complete_input().validate().unwrap();
        assert_eq!(
            config.discovery.source,
            SourceSelector::Channel("UC123".to_string())
        );
        assert_eq!(config.discovery.season_start_year, 2020);
        assert_eq!(config.discovery.page_delay, DEFAULT_PAGE_DELAY);
        assert_eq!(config.discovery.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.library.output_dir, PathBuf::from("."));
        assert_eq!(config.library.catalog_path, PathBuf::from("./My Show.json"));
    }

    #[test]
    fn test_validate_reports_all_missing_fields() {
        let err = ConfigInput::default().validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingFields(vec![
                "YT_API_KEY",
                "YT_CHANNEL_ID or YT_PLAYLIST_ID",
                "YT_CHANNEL_NAME",
                "SEASON_START_YEAR",
            ])
        );
        assert!(err.to_string().contains("YT_API_KEY, YT_CHANNEL_ID"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let input = ConfigInput {
            api_key: Some("   ".to_string()),
            ..complete_input()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ConfigError::MissingFields(vec!["YT_API_KEY"])
        );
    }

    #[test]
    fn test_channel_and_playlist_conflict() {
        let input = ConfigInput {
            playlist_id: Some("PL1".to_string()),
            ..complete_input()
        };
        assert_eq!(input.validate().unwrap_err(), ConfigError::ConflictingSource);
    }

    #[test]
    fn test_playlist_source() {
        let input = ConfigInput {
            channel_id: None,
            playlist_id: Some("PL1".to_string()),
            ..complete_input()
        };
        let config = input.validate().unwrap();
        assert_eq!(
            config.discovery.source,
            SourceSelector::Playlist("PL1".to_string())
        );
    }

    #[test]
    fn test_invalid_season_start_year() {
        let input = ConfigInput {
            season_start_year: Some("twenty".to_string()),
            ..complete_input()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ConfigError::InvalidSeasonStartYear("twenty".to_string())
        );
    }

    #[test]
    fn test_validate_library_only_needs_show_name() {
        let input = ConfigInput {
            show_name: Some("Show".to_string()),
            output_dir: Some(PathBuf::from("/media/tv")),
            ..Default::default()
        };
        let library = input.validate_library().unwrap();
        assert_eq!(library.catalog_path, PathBuf::from("/media/tv/Show.json"));
        assert_eq!(library.yt_dlp_path, PathBuf::from("yt-dlp"));
    }
}

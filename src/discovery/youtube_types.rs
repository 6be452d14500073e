/// YouTube Data API v3 response types for deserialization.
///
/// These structures mirror the JSON returned by the `search` and
/// `playlistItems` endpoints. Only the fields we read are declared.
use super::RemoteItem;
use serde::Deserialize;
use std::collections::HashMap;

/// A single thumbnail rendition
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Response of the search endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResultItem>,
    pub next_page_token: Option<String>,
}

/// A single search hit (video, channel or playlist)
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResultItem {
    #[serde(default)]
    pub id: SearchResultId,
    #[serde(default)]
    pub snippet: Snippet,
}

/// Identifier of a search hit; only video hits carry a video id
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    pub video_id: Option<String>,
}

/// Response of the playlistItems endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
}

/// A single entry of a playlist
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub snippet: Snippet,
}

/// Descriptive part shared by search hits and playlist entries
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snippet {
    pub published_at: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub thumbnails: HashMap<String, Thumbnail>,
    /// Only present on playlist entries
    pub resource_id: Option<ResourceId>,
}

/// Reference to the video a playlist entry points at
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceId {
    pub video_id: String,
}

impl RemoteItem for SearchResultItem {
    fn video_id(&self) -> Option<&str> {
        self.id.video_id.as_deref()
    }

    fn title(&self) -> &str {
        &self.snippet.title
    }

    fn description(&self) -> &str {
        &self.snippet.description
    }

    fn published_at(&self) -> &str {
        &self.snippet.published_at
    }

    fn channel_title(&self) -> &str {
        &self.snippet.channel_title
    }

    fn thumbnails(&self) -> &HashMap<String, Thumbnail> {
        &self.snippet.thumbnails
    }
}

impl RemoteItem for PlaylistItem {
    fn video_id(&self) -> Option<&str> {
        self.snippet
            .resource_id
            .as_ref()
            .map(|resource| resource.video_id.as_str())
    }

    fn title(&self) -> &str {
        &self.snippet.title
    }

    fn description(&self) -> &str {
        &self.snippet.description
    }

    fn published_at(&self) -> &str {
        &self.snippet.published_at
    }

    fn channel_title(&self) -> &str {
        &self.snippet.channel_title
    }

    fn thumbnails(&self) -> &HashMap<String, Thumbnail> {
        &self.snippet.thumbnails
    }
}

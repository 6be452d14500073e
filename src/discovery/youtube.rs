/// YouTube Data API discovery source.
use super::youtube_types::{PlaylistItemListResponse, SearchListResponse};
use super::{DiscoveryError, Page, RemoteItem, RemoteVideo, VideoSource, drain_pages};
use crate::config::{DiscoveryConfig, SourceSelector};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Items requested per page (the API maximum)
const PAGE_SIZE: &str = "50";

/// Discovery source for a YouTube channel or playlist.
///
/// Channels are enumerated through the `search` endpoint ordered by date,
/// playlists through the `playlistItems` endpoint.
pub struct YouTubeSource {
    client: reqwest::blocking::Client,
    base_url: String,
    config: DiscoveryConfig,
}

impl YouTubeSource {
    /// Creates a new source for the configured channel or playlist.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            config,
        }
    }

    /// Requests one page from an endpoint and decodes it.
    fn get_page<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        id_param: &str,
        id_value: &str,
        page_token: Option<&str>,
    ) -> Result<R, DiscoveryError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut query = vec![
            ("key", self.config.api_key.as_str()),
            (id_param, id_value),
            ("part", "snippet,id"),
            ("order", "date"),
            ("maxResults", PAGE_SIZE),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .map_err(|e| DiscoveryError::RequestError(e.without_url().to_string()))?;

        // Ensure request was successful
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(DiscoveryError::HttpStatus { status, body });
        }

        response
            .json()
            .map_err(|e| DiscoveryError::ParseError(e.to_string()))
    }

    /// Converts raw items, dropping those that do not reference a video.
    fn to_videos<I: RemoteItem>(items: Vec<I>) -> Vec<RemoteVideo> {
        items
            .iter()
            .filter_map(|item| {
                let video = RemoteVideo::from_item(item);
                if video.is_none() {
                    warn!(title = item.title(), "Item does not have a video id");
                }
                video
            })
            .collect()
    }
}

impl VideoSource for YouTubeSource {
    fn fetch_videos(&self) -> Result<Vec<RemoteVideo>, DiscoveryError> {
        let max_pages = self.config.max_pages;
        let delay = self.config.page_delay;

        match &self.config.source {
            SourceSelector::Channel(channel_id) => {
                let items = drain_pages(max_pages, delay, |token| {
                    let response: SearchListResponse =
                        self.get_page("search", "channelId", channel_id, token)?;
                    Ok(Page {
                        items: response.items,
                        next_page_token: response.next_page_token,
                    })
                })?;
                Ok(Self::to_videos(items))
            }
            SourceSelector::Playlist(playlist_id) => {
                let items = drain_pages(max_pages, delay, |token| {
                    let response: PlaylistItemListResponse =
                        self.get_page("playlistItems", "playlistId", playlist_id, token)?;
                    Ok(Page {
                        items: response.items,
                        next_page_token: response.next_page_token,
                    })
                })?;
                Ok(Self::to_videos(items))
            }
        }
    }
}

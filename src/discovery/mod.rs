/// Discovery of remote items and their conversion into catalog entries.
///
/// This module provides the accessor contract shared by every remote item
/// shape, the single routine that extracts our own representation from it,
/// and the trait implemented by sources that enumerate a whole channel or
/// playlist.
mod youtube;
mod youtube_types;

pub use youtube::YouTubeSource;
pub use youtube_types::Thumbnail;

use crate::catalog::CatalogEntry;
use crate::episode::{ResolverState, resolve};
use quick_xml::escape::unescape;
use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during discovery.
///
/// Any of these aborts discovery as a whole; a partial remote set is never
/// returned.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Request to the discovery API failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The API answered with a non-success status
    #[error("API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Failed to parse the API's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

/// Accessors every remote item shape exposes.
///
/// Search results and playlist items carry the same information in slightly
/// different places; implementing this trait lets both flow through
/// [`RemoteVideo::from_item`].
pub trait RemoteItem {
    /// The video id, if the item refers to a video at all
    fn video_id(&self) -> Option<&str>;
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn published_at(&self) -> &str;
    fn channel_title(&self) -> &str;
    /// Thumbnails keyed by resolution name (`default`, `high`, `maxres`, ...)
    fn thumbnails(&self) -> &HashMap<String, Thumbnail>;
}

/// A discovered video, independent of the API shape it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVideo {
    pub id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub published_at: String,
    pub channel_title: String,
    pub thumbnail_url: String,
}

impl RemoteVideo {
    /// Extracts a video from any remote item shape.
    ///
    /// Returns `None` for items that do not reference a video.
    pub fn from_item(item: &impl RemoteItem) -> Option<Self> {
        let id = item.video_id().filter(|id| !id.is_empty())?;

        Some(Self {
            id: id.to_string(),
            url: watch_url(id),
            title: decode_references(item.title()).trim().to_string(),
            description: decode_references(item.description()),
            published_at: item.published_at().to_string(),
            channel_title: item.channel_title().to_string(),
            thumbnail_url: best_thumbnail(item.thumbnails()).unwrap_or_default(),
        })
    }
}

/// Decodes character references such as `&amp;` or `&#39;`
///
/// Everything else, including markup-like text, is kept verbatim. Text that
/// cannot be decoded (a bare `&`, an unknown entity) is returned unchanged.
fn decode_references(text: &str) -> String {
    match unescape(text) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Canonical watch URL of a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Picks the thumbnail URL with the greatest reported height
pub fn best_thumbnail(thumbnails: &HashMap<String, Thumbnail>) -> Option<String> {
    thumbnails
        .values()
        .filter(|thumb| !thumb.url.is_empty())
        .max_by_key(|thumb| thumb.height)
        .map(|thumb| thumb.url.clone())
}

/// A source that enumerates every video of a channel or playlist.
pub trait VideoSource {
    /// Fetches all remote videos, draining every page.
    ///
    /// # Returns
    ///
    /// Every discovered video, or a DiscoveryError if any page failed
    fn fetch_videos(&self) -> Result<Vec<RemoteVideo>, DiscoveryError>;
}

/// One page of a paginated listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Follows a page-token chain until it ends or `max_pages` is reached.
///
/// `fetch_page` receives the token of the page to load (`None` for the
/// first). The delay is applied between requests, not after the last one.
/// The first failing page aborts the whole listing.
pub fn drain_pages<T, F>(
    max_pages: usize,
    delay: Duration,
    mut fetch_page: F,
) -> Result<Vec<T>, DiscoveryError>
where
    F: FnMut(Option<&str>) -> Result<Page<T>, DiscoveryError>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;

    for page_number in 1..=max_pages {
        let page = fetch_page(token.as_deref())?;
        debug!(page = page_number, items = page.items.len(), "Fetched page");
        items.extend(page.items);

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) if page_number < max_pages => {
                token = Some(next);
                thread::sleep(delay);
            }
            Some(_) => {
                warn!(max_pages, "Page limit reached, remaining pages are ignored");
                break;
            }
            None => break,
        }
    }

    info!(count = items.len(), "Total items fetched");
    Ok(items)
}

/// Turns discovered videos into fully classified catalog entries.
///
/// Videos are numbered in ascending publish order, whatever order the
/// source delivered them in. Items with a malformed publish date are
/// skipped. The returned entries keep that chronological order.
pub fn extract_entries(mut videos: Vec<RemoteVideo>, season_start_year: i32) -> Vec<CatalogEntry> {
    // ISO-8601 timestamps in a single format sort lexicographically
    videos.sort_by(|a, b| a.published_at.cmp(&b.published_at));

    let mut state = ResolverState::default();
    let mut entries = Vec::with_capacity(videos.len());

    for video in videos {
        let (assignment, next_state) =
            match resolve(&video.title, &video.published_at, season_start_year, state) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(title = %video.title, url = %video.url, error = %e, "Skipping item");
                    continue;
                }
            };
        state = next_state;

        debug!(
            title = %assignment.title,
            season = %assignment.season,
            episode = %assignment.episode,
            "Resolved episode"
        );

        entries.push(CatalogEntry {
            id: video.id,
            title: assignment.title,
            url: video.url,
            season: assignment.season,
            episode: assignment.episode,
            description: video.description,
            published_at: video.published_at,
            channel_title: video.channel_title,
            thumbnail_url: video.thumbnail_url,
            ..Default::default()
        });
    }

    entries
}

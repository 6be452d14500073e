//! Channel Archivist - Mirror a video channel into a season/episode library
//!
//! This library discovers the videos of a channel or playlist, assigns every
//! video a stable season and episode number, and acquires thumbnail, metadata
//! sidecar and merged media file for each of them. Progress is persisted in a
//! JSON catalog after every entry, so interrupted runs resume where they
//! stopped.

mod acquisition;
mod catalog;
mod config;
mod discovery;
mod episode;
mod file_operations;
mod nfo;

use acquisition::AcquisitionPipeline;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

// Re-export error types
pub use acquisition::{AcquisitionError, DownloadError, MediaError, RemuxError};
pub use catalog::CatalogError;
pub use config::ConfigError;
pub use discovery::DiscoveryError;
pub use episode::ResolveError;
pub use nfo::NfoError;

// Re-export the building blocks
pub use acquisition::{
    AcquisitionSummary, FfmpegRemuxer, HttpThumbnailFetcher, MediaFormat, MediaSource, Remuxer,
    ThumbnailFetcher, YtDlpSource,
};
pub use catalog::{CatalogEntry, CatalogStore, normalize_title, reconcile};
pub use config::{
    Config, ConfigInput, DEFAULT_MAX_PAGES, DEFAULT_PAGE_DELAY, DiscoveryConfig, LibraryConfig,
    SourceSelector,
};
pub use discovery::{RemoteVideo, VideoSource, YouTubeSource, extract_entries};
pub use episode::{EpisodeAssignment, NumberingPolicy, ResolverState, resolve};
pub use file_operations::{LibraryLayout, sanitize_filename};

/// Which of the two separately downloaded streams an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
        }
    }
}

/// Progress event emitted during a run
///
/// These events allow library users to track progress and provide feedback
/// while the catalog is updated and entries are acquired.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A run started
    Started {
        show_name: String,
        catalog_path: PathBuf,
    },

    /// The persisted catalog was read
    CatalogLoaded { entry_count: usize },

    /// Listing the remote channel or playlist
    FetchingRemote,

    /// All remote pages were fetched
    RemoteFetched { item_count: usize },

    /// Fresh items were merged into the catalog
    CatalogReconciled {
        new_entries: usize,
        total_entries: usize,
    },

    /// Processing a specific catalog entry
    ProcessingEntry {
        index: usize,
        total: usize,
        title: String,
    },

    /// Entry has thumbnail and media already
    EntryAlreadyComplete { title: String },

    /// A season folder was created
    FolderCreated { path: PathBuf },

    /// The metadata sidecar was written
    SidecarWritten { path: PathBuf },

    /// The metadata sidecar could not be written
    SidecarFailed { path: PathBuf, error: String },

    /// Fetching the thumbnail image
    DownloadingThumbnail { url: String },

    /// Thumbnail stored on disk
    ThumbnailSaved { path: PathBuf, bytes: u64 },

    /// Thumbnail could not be fetched, will be retried next run
    ThumbnailFailed {
        title: String,
        url: String,
        error: String,
    },

    /// A video and an audio format were chosen
    FormatsSelected {
        video_format: String,
        audio_format: String,
    },

    /// Downloading one of the streams into a temporary file
    DownloadingStream { kind: StreamKind, path: PathBuf },

    /// A stream finished downloading
    StreamDownloaded { kind: StreamKind, bytes: u64 },

    /// Merging the streams into the final file
    Merging { output: PathBuf },

    /// The merged media file is in place
    MediaSaved { path: PathBuf },

    /// Media acquisition failed, recorded on the entry
    MediaFailed {
        title: String,
        url: String,
        error: String,
    },

    /// The catalog could not be persisted
    CheckpointFailed { path: PathBuf, error: String },

    /// Acquisition finished
    Complete { summary: AcquisitionSummary },
}

/// Top-level error type for Channel Archivist operations
///
/// Only fatal conditions end up here. Per-entry failures are recorded in the
/// catalog and reported through [`ProgressEvent`]s.
#[derive(Debug, Error)]
pub enum ArchivistError {
    /// Error in the supplied configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error reading the persisted catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error listing the remote channel or playlist
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Error setting up a network client
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Fatal error during acquisition
    #[error("Acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),
}

/// Result of updating the catalog from the remote source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// The complete catalog, existing entries first
    pub catalog: Vec<CatalogEntry>,
    /// Number of entries appended in this run
    pub new_entries: usize,
}

/// Updates the persisted catalog with the videos of a remote source
///
/// Loads the catalog, fetches every remote video, numbers them and appends
/// those whose title is not yet known. The merged catalog is written back;
/// a failed write is reported but not fatal.
///
/// # Arguments
///
/// * `source` - The remote listing to fetch videos from
/// * `store` - Location of the persisted catalog
/// * `season_start_year` - Year of season one for inferred numbering
/// * `progress_callback` - Closure called with progress events
///
/// # Errors
///
/// Fails if the existing catalog cannot be read or any remote page fails.
pub fn discover_catalog<F>(
    source: &dyn VideoSource,
    store: &CatalogStore,
    season_start_year: i32,
    mut progress_callback: F,
) -> Result<DiscoveryOutcome, ArchivistError>
where
    F: FnMut(ProgressEvent),
{
    let mut catalog = store.load()?;
    progress_callback(ProgressEvent::CatalogLoaded {
        entry_count: catalog.len(),
    });

    progress_callback(ProgressEvent::FetchingRemote);
    let videos = source.fetch_videos()?;
    progress_callback(ProgressEvent::RemoteFetched {
        item_count: videos.len(),
    });

    let fresh = extract_entries(videos, season_start_year);
    let new_entries = reconcile(&catalog, fresh);
    let new_count = new_entries.len();
    catalog.extend(new_entries);

    info!(new_entries = new_count, total = catalog.len(), "Catalog reconciled");
    progress_callback(ProgressEvent::CatalogReconciled {
        new_entries: new_count,
        total_entries: catalog.len(),
    });

    if let Err(e) = store.save(&catalog) {
        warn!(path = %store.path().display(), error = %e, "Failed to save catalog");
        progress_callback(ProgressEvent::CheckpointFailed {
            path: store.path().to_path_buf(),
            error: e.to_string(),
        });
    }

    Ok(DiscoveryOutcome {
        catalog,
        new_entries: new_count,
    })
}

/// Acquires every pending entry of a catalog into the library
///
/// Uses yt-dlp for media formats and streams, HTTP for thumbnails and
/// ffmpeg for merging.
///
/// # Errors
///
/// Fails if no qualifying format pair exists for an entry; entries processed
/// before that stay persisted.
pub fn acquire_catalog<F>(
    library: &LibraryConfig,
    store: &CatalogStore,
    catalog: &mut [CatalogEntry],
    mut progress_callback: F,
) -> Result<AcquisitionSummary, ArchivistError>
where
    F: FnMut(ProgressEvent),
{
    let media = YtDlpSource::new(&library.yt_dlp_path);
    let thumbnails = HttpThumbnailFetcher::new()?;
    let remuxer = FfmpegRemuxer::new();
    let layout = LibraryLayout::new(&library.output_dir, &library.show_name);

    let pipeline = AcquisitionPipeline::new(layout, store, &media, &thumbnails, &remuxer);
    let summary = pipeline.run(catalog, &mut progress_callback)?;

    info!(
        downloaded = summary.downloaded,
        failed = summary.failed,
        already_complete = summary.already_complete,
        "Acquisition finished"
    );
    progress_callback(ProgressEvent::Complete { summary });

    Ok(summary)
}

/// Runs discovery followed by acquisition
///
/// # Examples
///
/// ```no_run
/// use channel_archivist::{ConfigInput, ProgressEvent, sync_channel};
///
/// let config = ConfigInput {
///     api_key: Some("my-api-key".to_string()),
///     channel_id: Some("UCxxxxxxxx".to_string()),
///     show_name: Some("Cooking Show".to_string()),
///     season_start_year: Some("2019".to_string()),
///     ..Default::default()
/// }
/// .validate()
/// .unwrap();
///
/// let summary = sync_channel(&config, |event| {
///     if let ProgressEvent::ProcessingEntry { index, total, title } = event {
///         println!("[{}/{}] {}", index + 1, total, title);
///     }
/// })
/// .unwrap();
/// println!("Downloaded {} episode(s)", summary.downloaded);
/// ```
pub fn sync_channel<F>(config: &Config, mut progress_callback: F) -> Result<AcquisitionSummary, ArchivistError>
where
    F: FnMut(ProgressEvent),
{
    let store = CatalogStore::new(&config.library.catalog_path);
    progress_callback(ProgressEvent::Started {
        show_name: config.library.show_name.clone(),
        catalog_path: store.path().to_path_buf(),
    });

    let source = YouTubeSource::new(config.discovery.clone());
    let mut outcome = discover_catalog(
        &source,
        &store,
        config.discovery.season_start_year,
        &mut progress_callback,
    )?;

    acquire_catalog(
        &config.library,
        &store,
        &mut outcome.catalog,
        progress_callback,
    )
}

/// Only updates the catalog, acquiring nothing
pub fn discover_channel<F>(
    config: &Config,
    mut progress_callback: F,
) -> Result<DiscoveryOutcome, ArchivistError>
where
    F: FnMut(ProgressEvent),
{
    let store = CatalogStore::new(&config.library.catalog_path);
    progress_callback(ProgressEvent::Started {
        show_name: config.library.show_name.clone(),
        catalog_path: store.path().to_path_buf(),
    });

    let source = YouTubeSource::new(config.discovery.clone());
    discover_catalog(
        &source,
        &store,
        config.discovery.season_start_year,
        progress_callback,
    )
}

/// Only acquires entries of the existing catalog, without contacting the
/// discovery API
pub fn download_catalog<F>(
    library: &LibraryConfig,
    mut progress_callback: F,
) -> Result<AcquisitionSummary, ArchivistError>
where
    F: FnMut(ProgressEvent),
{
    let store = CatalogStore::new(&library.catalog_path);
    progress_callback(ProgressEvent::Started {
        show_name: library.show_name.clone(),
        catalog_path: store.path().to_path_buf(),
    });

    let mut catalog = store.load()?;
    progress_callback(ProgressEvent::CatalogLoaded {
        entry_count: catalog.len(),
    });

    acquire_catalog(library, &store, &mut catalog, progress_callback)
}

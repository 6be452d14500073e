/// Acquisition of catalog entries into the local library.
///
/// For every entry the pipeline provisions the season folder, writes the
/// metadata sidecar, fetches the thumbnail and finally downloads the video
/// and audio streams and merges them. Progress flags on the entry gate each
/// step, and the whole catalog is persisted after every entry so an
/// interrupted run resumes where it stopped.
mod artifacts;
mod download;
mod media;
mod remux;
mod ytdlp;

pub use download::{DownloadError, HttpThumbnailFetcher, ThumbnailFetcher};
pub use media::{MediaError, MediaFormat, MediaSource};
pub use remux::{FfmpegRemuxer, RemuxError, Remuxer};
pub use ytdlp::YtDlpSource;

use crate::catalog::{CatalogEntry, CatalogStore};
use crate::file_operations::{EntryPaths, LibraryLayout, ensure_dir};
use crate::nfo::{SidecarStatus, write_episode_nfo};
use crate::{ProgressEvent, StreamKind};
use artifacts::MediaArtifacts;
use download::{stream_to_file, stream_to_file_atomic};
use media::select_formats;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that can occur while acquiring a single entry.
///
/// Only [`AcquisitionError::is_fatal`] errors stop a run; all others are
/// recorded on the entry and retried on the next run.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// A folder or file in the library could not be prepared
    #[error("Failed to prepare {path}: {source}")]
    Filesystem { path: PathBuf, source: io::Error },

    /// The entry has no thumbnail URL to fetch
    #[error("No thumbnail URL known")]
    MissingThumbnailUrl,

    /// Fetching bytes failed
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    /// The media source failed or offered no usable formats
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Merging the streams failed
    #[error("Merge failed: {0}")]
    Remux(#[from] RemuxError),
}

impl AcquisitionError {
    /// Whether this error must abort the whole run
    ///
    /// A video without a qualifying format pair has no defined fallback,
    /// so processing stops instead of skipping it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Media(MediaError::NoSuitableFormats { .. }))
    }
}

/// Counters describing an acquisition run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionSummary {
    /// Entries that needed work in this run
    pub processed: usize,
    /// Entries that were already fully acquired
    pub already_complete: usize,
    pub thumbnails_saved: usize,
    pub downloaded: usize,
    /// Entries whose media acquisition failed
    pub failed: usize,
}

/// The per-entry acquisition pipeline
pub struct AcquisitionPipeline<'a> {
    layout: LibraryLayout,
    store: &'a CatalogStore,
    media: &'a dyn MediaSource,
    thumbnails: &'a dyn ThumbnailFetcher,
    remuxer: &'a dyn Remuxer,
}

impl<'a> AcquisitionPipeline<'a> {
    pub fn new(
        layout: LibraryLayout,
        store: &'a CatalogStore,
        media: &'a dyn MediaSource,
        thumbnails: &'a dyn ThumbnailFetcher,
        remuxer: &'a dyn Remuxer,
    ) -> Self {
        Self {
            layout,
            store,
            media,
            thumbnails,
            remuxer,
        }
    }

    /// Processes every entry of the catalog in order
    ///
    /// The catalog is written to the store after each entry that needed
    /// work. Entries that are already complete are not touched, so no
    /// checkpoint is written for them. Recoverable failures are recorded in
    /// the entry's `last_error`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error. Checkpoints written for earlier
    /// entries stay in place.
    pub fn run<F>(
        &self,
        catalog: &mut [CatalogEntry],
        mut progress_callback: F,
    ) -> Result<AcquisitionSummary, AcquisitionError>
    where
        F: FnMut(ProgressEvent),
    {
        let progress: &mut dyn FnMut(ProgressEvent) = &mut progress_callback;
        let mut summary = AcquisitionSummary::default();
        let total = catalog.len();

        for index in 0..total {
            progress(ProgressEvent::ProcessingEntry {
                index,
                total,
                title: catalog[index].title.clone(),
            });

            if catalog[index].is_complete() {
                summary.already_complete += 1;
                progress(ProgressEvent::EntryAlreadyComplete {
                    title: catalog[index].title.clone(),
                });
                continue;
            }

            summary.processed += 1;
            self.process_entry(catalog, index, &mut summary, progress)?;
            self.checkpoint(catalog, progress);
        }

        Ok(summary)
    }

    /// Runs every pending step for a single entry
    fn process_entry(
        &self,
        catalog: &mut [CatalogEntry],
        index: usize,
        summary: &mut AcquisitionSummary,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), AcquisitionError> {
        let paths = self.layout.paths_for(&catalog[index]);

        match ensure_dir(&paths.season_dir) {
            Ok(true) => progress(ProgressEvent::FolderCreated {
                path: paths.season_dir.clone(),
            }),
            Ok(false) => {}
            Err(e) => {
                let e = AcquisitionError::Filesystem {
                    path: paths.season_dir.clone(),
                    source: e,
                };
                self.record_media_failure(&mut catalog[index], e, summary, progress);
                return Ok(());
            }
        }

        self.write_sidecar(&catalog[index], &paths, progress);

        if !catalog[index].image_saved {
            match self.fetch_thumbnail(&catalog[index], &paths, progress) {
                Ok(bytes) => {
                    catalog[index].image_saved = true;
                    summary.thumbnails_saved += 1;
                    progress(ProgressEvent::ThumbnailSaved {
                        path: paths.thumbnail.clone(),
                        bytes,
                    });
                    self.checkpoint(catalog, progress);
                }
                Err(e) => {
                    let entry = &catalog[index];
                    warn!(title = %entry.title, url = %entry.thumbnail_url, error = %e, "Thumbnail download failed");
                    progress(ProgressEvent::ThumbnailFailed {
                        title: entry.title.clone(),
                        url: entry.thumbnail_url.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !catalog[index].downloaded {
            match self.acquire_media(&catalog[index], &paths, progress) {
                Ok(path) => {
                    let entry = &mut catalog[index];
                    entry.downloaded = true;
                    entry.last_error.clear();
                    summary.downloaded += 1;
                    info!(title = %entry.title, path = %path.display(), "Media saved");
                    progress(ProgressEvent::MediaSaved { path });
                }
                Err(e) if e.is_fatal() => {
                    let entry = &catalog[index];
                    error!(title = %entry.title, url = %entry.url, error = %e, "Aborting run");
                    return Err(e);
                }
                Err(e) => self.record_media_failure(&mut catalog[index], e, summary, progress),
            }
        }

        Ok(())
    }

    fn record_media_failure(
        &self,
        entry: &mut CatalogEntry,
        e: AcquisitionError,
        summary: &mut AcquisitionSummary,
        progress: &mut dyn FnMut(ProgressEvent),
    ) {
        warn!(title = %entry.title, url = %entry.url, error = %e, "Media acquisition failed");
        entry.last_error = e.to_string();
        summary.failed += 1;
        progress(ProgressEvent::MediaFailed {
            title: entry.title.clone(),
            url: entry.url.clone(),
            error: entry.last_error.clone(),
        });
    }

    /// Writes the metadata sidecar unless one exists; failures are only logged
    fn write_sidecar(
        &self,
        entry: &CatalogEntry,
        paths: &EntryPaths,
        progress: &mut dyn FnMut(ProgressEvent),
    ) {
        match write_episode_nfo(&paths.sidecar, entry, self.layout.show_name()) {
            Ok(SidecarStatus::Written) => progress(ProgressEvent::SidecarWritten {
                path: paths.sidecar.clone(),
            }),
            Ok(SidecarStatus::AlreadyPresent) => {}
            Err(e) => {
                warn!(title = %entry.title, error = %e, "Failed to write sidecar");
                progress(ProgressEvent::SidecarFailed {
                    path: paths.sidecar.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn fetch_thumbnail(
        &self,
        entry: &CatalogEntry,
        paths: &EntryPaths,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<u64, AcquisitionError> {
        if entry.thumbnail_url.is_empty() {
            return Err(AcquisitionError::MissingThumbnailUrl);
        }

        progress(ProgressEvent::DownloadingThumbnail {
            url: entry.thumbnail_url.clone(),
        });
        let mut image = self.thumbnails.fetch(&entry.thumbnail_url)?;
        Ok(stream_to_file_atomic(image.as_mut(), &paths.thumbnail)?)
    }

    /// Downloads both streams and merges them
    ///
    /// All media files of the entry are removed again unless every step
    /// succeeded, so a retry never mistakes a broken merge for a result.
    fn acquire_media(
        &self,
        entry: &CatalogEntry,
        paths: &EntryPaths,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<PathBuf, AcquisitionError> {
        let formats = self.media.formats(&entry.url)?;
        let selection = select_formats(&entry.url, &formats)?;
        progress(ProgressEvent::FormatsSelected {
            video_format: selection.video.id.clone(),
            audio_format: selection.audio.id.clone(),
        });

        let artifacts =
            MediaArtifacts::begin(paths).map_err(|e| AcquisitionError::Filesystem {
                path: paths.base.clone(),
                source: e,
            })?;

        self.download_stream(
            entry,
            &selection.video,
            StreamKind::Video,
            artifacts.video_part(),
            progress,
        )?;
        self.download_stream(
            entry,
            &selection.audio,
            StreamKind::Audio,
            artifacts.audio_part(),
            progress,
        )?;

        progress(ProgressEvent::Merging {
            output: artifacts.merged().to_path_buf(),
        });
        self.remuxer.merge(
            artifacts.video_part(),
            artifacts.audio_part(),
            artifacts.merged(),
        )?;

        Ok(artifacts.commit())
    }

    fn download_stream(
        &self,
        entry: &CatalogEntry,
        format: &MediaFormat,
        kind: StreamKind,
        path: &std::path::Path,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<u64, AcquisitionError> {
        progress(ProgressEvent::DownloadingStream {
            kind,
            path: path.to_path_buf(),
        });

        let mut stream = self.media.open_stream(&entry.url, format)?;
        let bytes = stream_to_file(stream.as_mut(), path)?;

        progress(ProgressEvent::StreamDownloaded { kind, bytes });
        Ok(bytes)
    }

    /// Persists the catalog; a failure is reported but never aborts the run
    fn checkpoint(&self, catalog: &[CatalogEntry], progress: &mut dyn FnMut(ProgressEvent)) {
        if let Err(e) = self.store.save(catalog) {
            warn!(path = %self.store.path().display(), error = %e, "Failed to save catalog");
            progress(ProgressEvent::CheckpointFailed {
                path: self.store.path().to_path_buf(),
                error: e.to_string(),
            });
        }
    }
}

//! Media artifact tracking
//!
//! The media sub-pipeline produces two temporary stream files and a merged
//! output. Until the merge succeeded none of them can be trusted, so they
//! are guarded and removed together unless the guard is committed.

use crate::file_operations::{EntryPaths, remove_if_exists};
use std::io;
use std::path::{Path, PathBuf};

/// Guard over all media files of one entry that cleans them up on drop
#[derive(Debug)]
pub(crate) struct MediaArtifacts {
    video_part: PathBuf,
    audio_part: PathBuf,
    merged: PathBuf,
    committed: bool,
}

impl MediaArtifacts {
    /// Starts tracking the media files of an entry
    ///
    /// Leftovers of an earlier, interrupted attempt are removed first, so
    /// every attempt starts from a clean slate.
    pub(crate) fn begin(paths: &EntryPaths) -> io::Result<Self> {
        let artifacts = Self {
            video_part: paths.video_part.clone(),
            audio_part: paths.audio_part.clone(),
            merged: paths.merged.clone(),
            committed: false,
        };
        artifacts.remove_all()?;
        Ok(artifacts)
    }

    pub(crate) fn video_part(&self) -> &Path {
        &self.video_part
    }

    pub(crate) fn audio_part(&self) -> &Path {
        &self.audio_part
    }

    pub(crate) fn merged(&self) -> &Path {
        &self.merged
    }

    /// Keeps the merged output and removes the temporary stream files
    pub(crate) fn commit(mut self) -> PathBuf {
        self.committed = true;
        if let Err(e) = remove_if_exists(&self.video_part) {
            tracing::warn!(path = %self.video_part.display(), error = %e, "Failed to remove temporary file");
        }
        if let Err(e) = remove_if_exists(&self.audio_part) {
            tracing::warn!(path = %self.audio_part.display(), error = %e, "Failed to remove temporary file");
        }
        self.merged.clone()
    }

    fn remove_all(&self) -> io::Result<()> {
        remove_if_exists(&self.video_part)?;
        remove_if_exists(&self.audio_part)?;
        remove_if_exists(&self.merged)?;
        Ok(())
    }
}

impl Drop for MediaArtifacts {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.remove_all() {
                tracing::warn!(path = %self.merged.display(), error = %e, "Failed to clean up media files");
            }
        }
    }
}

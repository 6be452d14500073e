//! Merging separate video and audio streams
//!
//! The video stream is copied as-is, the audio stream is transcoded to AAC
//! so the result plays everywhere an mp4 does.

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while merging streams
#[derive(Debug, Error)]
pub enum RemuxError {
    /// ffmpeg could not be started or observed
    #[error("Failed to run ffmpeg: {0}")]
    SpawnFailed(String),

    /// ffmpeg ran but did not succeed
    #[error("ffmpeg failed to merge into {output}: {details}")]
    MergeFailed { output: PathBuf, details: String },
}

/// Something that can combine a video-only and an audio-only file
pub trait Remuxer {
    /// Merges `video` and `audio` into `output`, overwriting it
    fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), RemuxError>;
}

/// Remuxer running ffmpeg through ffmpeg-sidecar
#[derive(Debug, Default)]
pub struct FfmpegRemuxer;

impl FfmpegRemuxer {
    pub fn new() -> Self {
        Self
    }
}

impl Remuxer for FfmpegRemuxer {
    fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), RemuxError> {
        let mut child = FfmpegCommand::new()
            .hide_banner()
            .overwrite()
            .input(video)
            .input(audio)
            .codec_video("copy")
            .codec_audio("aac")
            .args(["-strict", "experimental"])
            .output(output)
            .spawn()
            .map_err(|e| RemuxError::SpawnFailed(e.to_string()))?;

        // Draining the event stream keeps ffmpeg from blocking on a full pipe
        let mut errors = Vec::new();
        let events = child
            .iter()
            .map_err(|e| RemuxError::SpawnFailed(e.to_string()))?;
        for event in events {
            match event {
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line)
                | FfmpegEvent::Error(line) => {
                    tracing::debug!(%line, "ffmpeg");
                    errors.push(line);
                }
                _ => {}
            }
        }

        let status = child
            .wait()
            .map_err(|e| RemuxError::SpawnFailed(e.to_string()))?;

        if !status.success() {
            let details = if errors.is_empty() {
                format!("exited with {}", status)
            } else {
                errors.join("; ")
            };
            return Err(RemuxError::MergeFailed {
                output: output.to_path_buf(),
                details,
            });
        }

        Ok(())
    }
}

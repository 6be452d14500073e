//! yt-dlp backed media source
//!
//! Format listing uses `yt-dlp -J`, streams are read from `yt-dlp -o -`.
//! yt-dlp takes care of the site specific signature and throttling
//! handling, we only consume bytes.

use super::media::{AudioQuality, MediaError, MediaFormat, MediaSource};
use serde::Deserialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};

/// Subset of the `yt-dlp -J` output we rely on
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    format_note: Option<String>,
    #[serde(default)]
    ext: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    protocol: Option<String>,
}

impl YtDlpFormat {
    fn into_media_format(self) -> MediaFormat {
        let has_video = has_codec(&self.vcodec);
        let has_audio = has_codec(&self.acodec);
        let note = self.format_note.unwrap_or_default();

        MediaFormat {
            id: self.format_id,
            quality_label: has_video.then(|| note.clone()),
            has_video,
            has_audio,
            audio_quality: if has_audio {
                AudioQuality::from_note(&note)
            } else {
                None
            },
            extension: self.ext,
        }
    }

    /// Manifest based formats would stream playlists instead of media
    fn is_direct(&self) -> bool {
        matches!(self.protocol.as_deref(), None | Some("https") | Some("http"))
    }
}

fn has_codec(codec: &Option<String>) -> bool {
    codec
        .as_deref()
        .is_some_and(|c| !c.is_empty() && c != "none")
}

/// Media source driving the external `yt-dlp` program
pub struct YtDlpSource {
    program: PathBuf,
}

impl YtDlpSource {
    /// Creates a source using the given yt-dlp executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Parses the JSON document printed by `yt-dlp -J`
    fn parse_formats(json: &[u8]) -> Result<Vec<MediaFormat>, serde_json::Error> {
        let info: YtDlpInfo = serde_json::from_slice(json)?;
        Ok(info
            .formats
            .into_iter()
            .filter(YtDlpFormat::is_direct)
            .map(YtDlpFormat::into_media_format)
            .collect())
    }
}

impl MediaSource for YtDlpSource {
    fn formats(&self, watch_url: &str) -> Result<Vec<MediaFormat>, MediaError> {
        let listing_failed = |message: String| MediaError::ListingFailed {
            url: watch_url.to_string(),
            message,
        };

        let output = Command::new(&self.program)
            .args(["-J", "--no-warnings", "--no-playlist", watch_url])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                listing_failed(format!("Failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(listing_failed(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Self::parse_formats(&output.stdout).map_err(|e| listing_failed(e.to_string()))
    }

    fn open_stream(
        &self,
        watch_url: &str,
        format: &MediaFormat,
    ) -> Result<Box<dyn Read>, MediaError> {
        let mut child = Command::new(&self.program)
            .args([
                "--quiet",
                "--no-warnings",
                "--no-playlist",
                "--no-part",
                "-f",
                format.id.as_str(),
                "-o",
                "-",
                watch_url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MediaError::StreamFailed {
                format_id: format.id.clone(),
                message: format!("Failed to run {}: {}", self.program.display(), e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| MediaError::StreamFailed {
            format_id: format.id.clone(),
            message: "yt-dlp stdout was not captured".to_string(),
        })?;

        Ok(Box::new(ProcessStream {
            child,
            stdout,
            finished: false,
        }))
    }
}

/// Stdout of a running process, reporting a failed exit as a read error
///
/// The exit status is only known at end of stream, so a download that was
/// cut short is detected there instead of looking like a complete file.
struct ProcessStream {
    child: Child,
    stdout: ChildStdout,
    finished: bool,
}

impl Read for ProcessStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }

        let n = self.stdout.read(buf)?;
        if n == 0 {
            self.finished = true;
            let status = self.child.wait()?;
            if !status.success() {
                return Err(io::Error::other(format!("yt-dlp exited with {}", status)));
            }
        }
        Ok(n)
    }
}

impl Drop for ProcessStream {
    fn drop(&mut self) {
        if !self.finished {
            // Reader was abandoned mid-stream
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

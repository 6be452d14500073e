//! Media formats and their selection
//!
//! A media source lists the encodings available for a video and opens a byte
//! stream for one of them. Video and audio are fetched as separate streams
//! and merged afterwards.

use std::io::Read;
use thiserror::Error;

/// Resolution tier of the video stream we download
pub const TARGET_VIDEO_QUALITY: &str = "720p";

/// Quality tier of the audio stream we download
pub const TARGET_AUDIO_QUALITY: AudioQuality = AudioQuality::Medium;

/// Errors that can occur while talking to a media source
#[derive(Debug, Error)]
pub enum MediaError {
    /// Available formats could not be determined
    #[error("Failed to list formats for {url}: {message}")]
    ListingFailed { url: String, message: String },

    /// A format stream could not be opened
    #[error("Failed to open stream for format {format_id}: {message}")]
    StreamFailed { format_id: String, message: String },

    /// No qualifying video-only and audio-only pair exists
    #[error(
        "No suitable formats for {url} (video {}: {}, audio {:?}: {})",
        TARGET_VIDEO_QUALITY,
        found(.video_found),
        TARGET_AUDIO_QUALITY,
        found(.audio_found)
    )]
    NoSuitableFormats {
        url: String,
        video_found: bool,
        audio_found: bool,
    },
}

fn found(flag: &bool) -> &'static str {
    if *flag { "found" } else { "missing" }
}

/// Audio quality tiers as reported by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AudioQuality {
    UltraLow,
    Low,
    Medium,
    High,
}

impl AudioQuality {
    /// Parses a free-form quality note such as `"medium"` or `"Default, low"`
    pub fn from_note(note: &str) -> Option<Self> {
        let note = note.to_lowercase();
        if note.contains("ultralow") {
            Some(Self::UltraLow)
        } else if note.contains("low") {
            Some(Self::Low)
        } else if note.contains("medium") {
            Some(Self::Medium)
        } else if note.contains("high") {
            Some(Self::High)
        } else {
            None
        }
    }
}

/// One encoding of a video offered by a media source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFormat {
    /// Source specific identifier used to open the stream
    pub id: String,
    /// Resolution label of video streams, e.g. `"720p"`
    pub quality_label: Option<String>,
    pub has_video: bool,
    pub has_audio: bool,
    /// Quality tier of audio streams
    pub audio_quality: Option<AudioQuality>,
    /// Container extension, e.g. `"mp4"`
    pub extension: String,
}

impl MediaFormat {
    fn is_target_video(&self) -> bool {
        self.has_video
            && !self.has_audio
            && self
                .quality_label
                .as_deref()
                .is_some_and(|label| label.starts_with(TARGET_VIDEO_QUALITY))
    }

    fn is_target_audio(&self) -> bool {
        self.has_audio && !self.has_video && self.audio_quality == Some(TARGET_AUDIO_QUALITY)
    }
}

/// Something that knows the formats of a video and can stream them
pub trait MediaSource {
    /// Lists every format available for the video at `watch_url`
    fn formats(&self, watch_url: &str) -> Result<Vec<MediaFormat>, MediaError>;

    /// Opens the byte stream of one format
    ///
    /// Errors of the underlying transport surface as `io::Error` while
    /// reading from the returned stream.
    fn open_stream(
        &self,
        watch_url: &str,
        format: &MediaFormat,
    ) -> Result<Box<dyn Read>, MediaError>;
}

/// The video-only and audio-only formats chosen for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    pub video: MediaFormat,
    pub audio: MediaFormat,
}

/// Chooses the first video-only format of the target tier and the first
/// audio-only format of the target quality, in listing order
///
/// # Errors
///
/// `MediaError::NoSuitableFormats` when either one is missing. There is no
/// lower quality fallback.
pub fn select_formats(watch_url: &str, formats: &[MediaFormat]) -> Result<FormatSelection, MediaError> {
    let video = formats.iter().find(|f| f.is_target_video());
    let audio = formats.iter().find(|f| f.is_target_audio());

    match (video, audio) {
        (Some(video), Some(audio)) => Ok(FormatSelection {
            video: video.clone(),
            audio: audio.clone(),
        }),
        (video, audio) => Err(MediaError::NoSuitableFormats {
            url: watch_url.to_string(),
            video_found: video.is_some(),
            audio_found: audio.is_some(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, label: &str) -> MediaFormat {
        MediaFormat {
            id: id.to_string(),
            quality_label: Some(label.to_string()),
            has_video: true,
            has_audio: false,
            audio_quality: None,
            extension: "mp4".to_string(),
        }
    }

    fn audio(id: &str, quality: AudioQuality) -> MediaFormat {
        MediaFormat {
            id: id.to_string(),
            quality_label: None,
            has_video: false,
            has_audio: true,
            audio_quality: Some(quality),
            extension: "m4a".to_string(),
        }
    }

    fn muxed(id: &str) -> MediaFormat {
        MediaFormat {
            id: id.to_string(),
            quality_label: Some("720p".to_string()),
            has_video: true,
            has_audio: true,
            audio_quality: Some(AudioQuality::Medium),
            extension: "mp4".to_string(),
        }
    }

    #[test]
    fn test_audio_quality_from_note() {
        assert_eq!(AudioQuality::from_note("medium"), Some(AudioQuality::Medium));
        assert_eq!(AudioQuality::from_note("Default, low"), Some(AudioQuality::Low));
        assert_eq!(AudioQuality::from_note("ultralow"), Some(AudioQuality::UltraLow));
        assert_eq!(AudioQuality::from_note("720p"), None);
    }

    #[test]
    fn test_select_first_matching_pair() {
        let formats = vec![
            audio("139", AudioQuality::Low),
            muxed("22"),
            video("136", "720p"),
            audio("140", AudioQuality::Medium),
            video("247", "720p"),
            audio("251", AudioQuality::Medium),
            video("137", "1080p"),
        ];

        let selection = select_formats("url", &formats).unwrap();
        assert_eq!(selection.video.id, "136");
        assert_eq!(selection.audio.id, "140");
    }

    #[test]
    fn test_select_accepts_high_frame_rate_label() {
        let formats = vec![video("298", "720p60"), audio("140", AudioQuality::Medium)];
        assert_eq!(select_formats("url", &formats).unwrap().video.id, "298");
    }

    #[test]
    fn test_select_fails_without_video() {
        let formats = vec![video("137", "1080p"), audio("140", AudioQuality::Medium), muxed("22")];

        match select_formats("url", &formats) {
            Err(MediaError::NoSuitableFormats {
                video_found,
                audio_found,
                ..
            }) => {
                assert!(!video_found);
                assert!(audio_found);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_select_fails_without_audio() {
        let formats = vec![video("136", "720p"), audio("139", AudioQuality::Low)];
        let err = select_formats("url", &formats).unwrap_err();
        assert!(err.to_string().contains("audio Medium: missing"));
    }
}

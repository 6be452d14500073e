use crate::catalog::CatalogEntry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sanitizes a string for use in filenames by replacing problematic characters
///
/// Replaces characters that are invalid or problematic in filenames across platforms:
/// - Path separators: / \
/// - Reserved characters: : * ? " < > |
/// - Control characters
/// - Trim leading/trailing whitespace and dots
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    // Trim whitespace and dots from start/end
    sanitized.trim_matches(|c: char| c.is_whitespace() || c == '.').to_string()
}

/// Formats the episode file stem `S<SS>E<EE> - <title>`
pub fn episode_filename(season: &str, episode: &str, title: &str) -> String {
    format!("S{}E{} - {}", season, episode, sanitize_filename(title))
}

/// Formats the season folder relative to the library root
pub fn season_folder(show_name: &str, season: &str) -> String {
    format!("{}/Season {}", sanitize_filename(show_name), season)
}

/// Formats the library-relative path of an episode without extension
///
/// The result has the shape `<show>/Season <SS>/S<SS>E<EE> - <title>`.
pub fn episode_filepath(show_name: &str, season: &str, episode: &str, title: &str) -> String {
    format!(
        "{}/{}",
        season_folder(show_name, season),
        episode_filename(season, episode, title)
    )
}

/// Maps catalog entries onto concrete paths below the output directory
#[derive(Debug, Clone)]
pub struct LibraryLayout {
    root: PathBuf,
    show_name: String,
}

/// All on-disk locations belonging to a single entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPaths {
    /// Season folder containing every other path
    pub season_dir: PathBuf,
    /// Base path without extension
    pub base: PathBuf,
    /// Thumbnail image `<base>-thumb.jpg`
    pub thumbnail: PathBuf,
    /// Metadata sidecar `<base>.nfo`
    pub sidecar: PathBuf,
    /// Temporary video-only stream `<base>_video.mp4`
    pub video_part: PathBuf,
    /// Temporary audio-only stream `<base>_audio.mp4`
    pub audio_part: PathBuf,
    /// Final merged file `<base>.mp4`
    pub merged: PathBuf,
}

impl LibraryLayout {
    pub fn new(root: impl Into<PathBuf>, show_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            show_name: show_name.into(),
        }
    }

    pub fn show_name(&self) -> &str {
        &self.show_name
    }

    /// Resolves every path of the given entry
    pub fn paths_for(&self, entry: &CatalogEntry) -> EntryPaths {
        let base = self.root.join(entry.filepath(&self.show_name));
        let season_dir = self.root.join(season_folder(&self.show_name, &entry.season));

        EntryPaths {
            season_dir,
            thumbnail: with_suffix(&base, "-thumb.jpg"),
            sidecar: with_suffix(&base, ".nfo"),
            video_part: with_suffix(&base, "_video.mp4"),
            audio_part: with_suffix(&base, "_audio.mp4"),
            merged: with_suffix(&base, ".mp4"),
            base,
        }
    }
}

/// Appends a suffix to the final path component
///
/// `Path::with_extension` cannot be used because titles may contain dots.
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut os = base.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Creates a directory and its parents, tolerating existing ones
///
/// Returns `true` when the directory had to be created.
pub fn ensure_dir(path: &Path) -> io::Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path)?;
    Ok(true)
}

/// Removes a file if present, ignoring a missing file
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

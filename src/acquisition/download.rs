//! Streaming downloads
//!
//! Copies byte streams (HTTP bodies, process output) into files without
//! holding them in memory, and fetches thumbnails over HTTP.

use crate::file_operations::remove_if_exists;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Size of the copy buffer
const BUFFER_SIZE: usize = 8192;

/// Errors that can occur while downloading
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HTTP request could not be completed
    #[error("Failed to fetch {url}: {message}")]
    RequestFailed { url: String, message: String },

    /// The server answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// Reading from the source stream failed
    #[error("Failed to read stream for {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Writing to the destination failed
    #[error("Failed to write file {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The stream ended without delivering any data
    #[error("Stream for {0} was empty")]
    Empty(PathBuf),
}

/// Something that can fetch thumbnail images
pub trait ThumbnailFetcher {
    /// Opens the image behind `url` as a byte stream
    fn fetch(&self, url: &str) -> Result<Box<dyn Read>, DownloadError>;
}

/// Thumbnail fetcher using a blocking HTTP client
pub struct HttpThumbnailFetcher {
    client: reqwest::blocking::Client,
}

impl HttpThumbnailFetcher {
    pub fn new() -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DownloadError::RequestFailed {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl ThumbnailFetcher for HttpThumbnailFetcher {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read>, DownloadError> {
        let response =
            self.client
                .get(url)
                .send()
                .map_err(|e| DownloadError::RequestFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(Box::new(response))
    }
}

/// Streams `reader` into a newly created file at `path`
///
/// Returns the number of bytes written. An empty stream is an error, since
/// an empty media or image file is never a valid result.
pub fn stream_to_file(reader: &mut dyn Read, path: &Path) -> Result<u64, DownloadError> {
    let mut file = File::create(path).map_err(|e| DownloadError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut written: u64 = 0;
    let mut buffer = [0; BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break, // EOF
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(DownloadError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| DownloadError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        written += bytes_read as u64;
    }

    file.flush().map_err(|e| DownloadError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    if written == 0 {
        return Err(DownloadError::Empty(path.to_path_buf()));
    }

    Ok(written)
}

/// Streams `reader` into `path` through a `.part` file
///
/// The target only appears once the download is complete; on failure the
/// partial file is removed and an existing target is left untouched.
pub fn stream_to_file_atomic(reader: &mut dyn Read, path: &Path) -> Result<u64, DownloadError> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let written = match stream_to_file(reader, &part) {
        Ok(written) => written,
        Err(e) => {
            let _ = remove_if_exists(&part);
            return Err(e);
        }
    };

    fs::rename(&part, path).map_err(|e| DownloadError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Reader that fails after yielding some data
    struct BrokenReader {
        served: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.served = true;
            buf[..4].copy_from_slice(b"data");
            Ok(4)
        }
    }

    #[test]
    fn test_stream_to_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.bin");
        let data = vec![7u8; BUFFER_SIZE * 3 + 5];

        let written = stream_to_file(&mut Cursor::new(data.clone()), &path).unwrap();
        assert_eq!(written, data.len() as u64);
        assert_eq!(fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_stream_to_file_rejects_empty_stream() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.bin");

        let result = stream_to_file(&mut io::empty(), &path);
        assert!(matches!(result, Err(DownloadError::Empty(_))));
    }

    #[test]
    fn test_atomic_download_leaves_no_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("thumb.jpg");

        let result = stream_to_file_atomic(&mut BrokenReader { served: false }, &path);
        assert!(matches!(result, Err(DownloadError::ReadFailed { .. })));
        assert!(!path.exists());
        assert!(!temp.path().join("thumb.jpg.part").exists());
    }

    #[test]
    fn test_atomic_download_renames_into_place() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("thumb.jpg");

        let written = stream_to_file_atomic(&mut Cursor::new(b"jpeg".to_vec()), &path).unwrap();
        assert_eq!(written, 4);
        assert_eq!(fs::read(&path).unwrap(), b"jpeg");
    }
}

//! Fetching of the MNIST archives.
//!
//! Archives are downloaded once into a working directory and reused from there on.
//! Nothing is checksummed or re-validated; a file that exists is trusted.

use crate::error::MnistError;
use log::info;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of remote archive bytes.
pub trait Downloader {
    /// Streams the body found at `url` into `writer`, returning the number of bytes written.
    fn download(&self, url: &str, writer: &mut dyn Write) -> Result<u64, MnistError>;
}

/// Blocking HTTP downloader.
///
/// Requests carry no total timeout: a slow transfer of a large archive runs to completion
/// and a stalled one blocks.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, MnistError> {
        Self::with_timeout(None)
    }

    /// Downloader whose requests fail after `timeout`, or never time out if `None`.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, MnistError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, writer: &mut dyn Write) -> Result<u64, MnistError> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let bytes = response.copy_to(writer)?;
        Ok(bytes)
    }
}

/// Resolves archive filenames against a base URL and caches them locally.
#[derive(Debug, Clone)]
pub struct Fetcher<D = HttpDownloader> {
    base_url: String,
    downloader: D,
}

impl Fetcher<HttpDownloader> {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MnistError> {
        Ok(Self::with_downloader(base_url, HttpDownloader::new()?))
    }
}

impl<D: Downloader> Fetcher<D> {
    pub fn with_downloader(base_url: impl Into<String>, downloader: D) -> Self {
        Self {
            base_url: base_url.into(),
            downloader,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Full remote URL of `filename`.
    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), filename)
    }

    /// Ensures `filename` exists inside `work_dir`, downloading it if absent.
    ///
    /// # Arguments
    /// * `filename` - Archive name, appended to the base URL
    /// * `work_dir` - Local cache directory, created if missing
    ///
    /// # Returns
    /// * `Ok(PathBuf)` with the local path of the archive
    /// * `Err(MnistError)` if the directory, the request or the write fails.
    ///   A failed download may leave a partial file behind.
    pub fn maybe_download(
        &self,
        filename: &str,
        work_dir: impl AsRef<Path>,
    ) -> Result<PathBuf, MnistError> {
        let work_dir = work_dir.as_ref();
        if !work_dir.exists() {
            fs::create_dir_all(work_dir)?;
        }

        let filepath = work_dir.join(filename);
        if filepath.exists() {
            return Ok(filepath);
        }

        let mut file = File::create(&filepath)?;
        let size = self.downloader.download(&self.url_for(filename), &mut file)?;
        file.flush()?;
        info!("Successfully downloaded {filename} {size} bytes.");

        Ok(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::cell::RefCell;

    /// Serves a fixed body and remembers every requested URL.
    struct RecordingDownloader {
        body: Vec<u8>,
        requests: RefCell<Vec<String>>,
    }

    impl RecordingDownloader {
        fn new(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl Downloader for RecordingDownloader {
        fn download(&self, url: &str, writer: &mut dyn Write) -> Result<u64, MnistError> {
            self.requests.borrow_mut().push(url.to_string());
            writer.write_all(&self.body)?;
            Ok(self.body.len() as u64)
        }
    }

    struct FailingDownloader;

    impl Downloader for FailingDownloader {
        fn download(&self, _url: &str, _writer: &mut dyn Write) -> Result<u64, MnistError> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "offline").into())
        }
    }

    #[test]
    fn test_existing_file_skips_download() -> Result<(), Box<dyn std::error::Error>> {
        let temp = assert_fs::TempDir::new()?;
        temp.child("train-labels-idx1-ubyte.gz").write_binary(b"dummy")?;

        let fetcher = Fetcher::with_downloader(
            "http://example.invalid/mnist/",
            RecordingDownloader::new(b"fresh"),
        );
        let path = fetcher.maybe_download("train-labels-idx1-ubyte.gz", temp.path())?;
        let again = fetcher.maybe_download("train-labels-idx1-ubyte.gz", temp.path())?;

        assert_eq!(path, temp.path().join("train-labels-idx1-ubyte.gz"));
        assert_eq!(path, again);
        assert!(fetcher.downloader().requests.borrow().is_empty());
        assert_eq!(std::fs::read(path)?, b"dummy");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_downloaded_once() -> Result<(), Box<dyn std::error::Error>> {
        let temp = assert_fs::TempDir::new()?;
        let work_dir = temp.child("nested").child("mnist");

        let fetcher = Fetcher::with_downloader(
            "http://example.invalid/mnist/",
            RecordingDownloader::new(b"archive bytes"),
        );
        let path = fetcher.maybe_download("t10k-images-idx3-ubyte.gz", work_dir.path())?;
        fetcher.maybe_download("t10k-images-idx3-ubyte.gz", work_dir.path())?;

        assert_eq!(
            *fetcher.downloader().requests.borrow(),
            vec!["http://example.invalid/mnist/t10k-images-idx3-ubyte.gz".to_string()]
        );
        assert_eq!(std::fs::read(path)?, b"archive bytes");
        Ok(())
    }

    #[test]
    fn test_download_error_propagates() -> Result<(), Box<dyn std::error::Error>> {
        let temp = assert_fs::TempDir::new()?;
        let fetcher = Fetcher::with_downloader("http://example.invalid", FailingDownloader);

        let result = fetcher.maybe_download("train-images-idx3-ubyte.gz", temp.path());
        assert!(matches!(result, Err(MnistError::Io(_))));
        Ok(())
    }

    #[test]
    fn test_http_downloader_has_no_timeout() -> Result<(), MnistError> {
        assert_eq!(HttpDownloader::new()?.timeout(), None);
        assert_eq!(Fetcher::new("http://example.invalid")?.downloader().timeout(), None);

        let bounded = HttpDownloader::with_timeout(Some(Duration::from_secs(5)))?;
        assert_eq!(bounded.timeout(), Some(Duration::from_secs(5)));
        Ok(())
    }

    #[test]
    fn test_url_for_joins_with_single_slash() -> Result<(), MnistError> {
        let with_slash = Fetcher::new("http://example.invalid/mnist/")?;
        let without_slash = Fetcher::new("http://example.invalid/mnist")?;

        assert_eq!(
            with_slash.url_for("a.gz"),
            "http://example.invalid/mnist/a.gz"
        );
        assert_eq!(with_slash.url_for("a.gz"), without_slash.url_for("a.gz"));
        assert_eq!(with_slash.base_url(), "http://example.invalid/mnist/");
        Ok(())
    }
}

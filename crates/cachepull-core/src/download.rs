//! Cache archive download.
//!
//! A download is either a single GET against the archive URL or, when only
//! the cache API is known, a GET against the API to learn that URL first.
//! The HTTP layer sits behind [`HttpClient`] so the pipeline can be driven
//! without a network.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::RestoreError;
use crate::Result;
use crate::io::copy_with_progress;
use crate::report::DownloadProgress;

/// Largest error body kept for diagnostics.
const MAX_ERROR_BODY: u64 = 64 * 1024;

/// Response of a GET request with the body not yet read.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Length` header, if any.
    pub content_length: Option<u64>,
    /// Response body.
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Creates a response from an in-memory body.
    #[must_use]
    pub fn from_bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_length: Some(body.len() as u64),
            body: Box::new(std::io::Cursor::new(body)),
        }
    }

    /// Returns `true` for 200 OK.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Reads the whole body as text, lossily.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the body cannot be read.
    pub fn text(self) -> Result<String> {
        Self::read_lossy(self.body)
    }

    /// Reads at most the first 64 KiB of the body as text, lossily.
    ///
    /// Used for bodies that only end up in error messages.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the body cannot be read.
    pub fn error_text(self) -> Result<String> {
        Self::read_lossy(self.body.take(MAX_ERROR_BODY))
    }

    fn read_lossy(mut body: impl Read) -> Result<String> {
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Minimal blocking HTTP client.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production client
/// - in-memory fakes in tests
pub trait HttpClient {
    /// Sends a GET request.
    ///
    /// A response with any status is `Ok`; only failing to get a response
    /// at all is an error. `timeout` bounds the whole request when set.
    ///
    /// # Errors
    ///
    /// Returns `Transport` on connection, TLS or timeout failures.
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse> {
        (**self).get(url, timeout)
    }
}

/// [`HttpClient`] backed by `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with a connect timeout only.
    ///
    /// Overall timeouts are passed per request, so the API lookup and the
    /// archive download can be bounded differently.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(None::<Duration>)
            .user_agent(concat!("cachepull/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(std::io::Error::other)?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().map_err(|e| RestoreError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}

#[derive(Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    download_url: String,
}

/// Resolves and fetches cache archives.
#[derive(Debug)]
pub struct Downloader<C> {
    client: C,
    retry_backoff: Duration,
    api_timeout: Duration,
    download_timeout: Duration,
    debug: bool,
}

impl<C: HttpClient> Downloader<C> {
    /// Creates a downloader with a 3 second retry pause, a 20 second API
    /// timeout and a 30 minute download timeout.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self {
            client,
            retry_backoff: Duration::from_secs(3),
            api_timeout: Duration::from_secs(20),
            download_timeout: Duration::from_secs(30 * 60),
            debug: false,
        }
    }

    /// Sets the pause before the retry.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Sets the cache API timeout.
    #[must_use]
    pub fn with_api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = timeout;
        self
    }

    /// Sets the timeout of each download attempt, body included.
    #[must_use]
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Sets debug mode.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Asks the cache API for the archive URL.
    ///
    /// # Errors
    ///
    /// - `CacheNotInitialized` for a status outside `200..=202`
    /// - `InvalidResolveResponse` for a body that is not JSON or has an
    ///   empty `download_url`
    /// - `Transport` when the API cannot be reached
    pub fn resolve_download_url(&self, endpoint: &str) -> Result<String> {
        debug!(endpoint, "requesting download URL from cache API");
        let response = self.client.get(endpoint, Some(self.api_timeout))?;
        let status = response.status;

        if !(200..=202).contains(&status) {
            let body = response.error_text()?;
            debug!(status, body = %body, "cache API rejected the request");
            return Err(RestoreError::CacheNotInitialized { status });
        }
        let body = response.text()?;

        let parsed: ResolveResponse =
            serde_json::from_str(&body).map_err(|e| RestoreError::InvalidResolveResponse {
                status,
                reason: e.to_string(),
                body: body.clone(),
            })?;

        if parsed.download_url.is_empty() {
            return Err(RestoreError::InvalidResolveResponse {
                status,
                reason: "download_url is empty".to_string(),
                body,
            });
        }

        if self.debug {
            info!(url = %parsed.download_url, "resolved download URL");
        } else {
            debug!(url = %parsed.download_url, "resolved download URL");
        }
        Ok(parsed.download_url)
    }

    /// Downloads `url` into `path`, replacing any previous content.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadStatus` with the response body for any status but
    /// 200, `Transport` when no response arrives and an I/O error when the
    /// body cannot be streamed to disk.
    pub fn fetch(
        &self,
        url: &str,
        path: &Path,
        progress: &mut dyn DownloadProgress,
    ) -> Result<u64> {
        let response = self.client.get(url, Some(self.download_timeout))?;
        if !response.is_ok() {
            let status = response.status;
            let body = response.error_text()?;
            return Err(RestoreError::DownloadStatus { status, body });
        }

        progress.on_start(response.content_length);
        let mut body = response.body;
        let mut writer = BufWriter::new(File::create(path)?);
        let written = copy_with_progress(&mut body, &mut writer, progress)?;
        writer.flush()?;
        progress.on_complete();

        debug!(bytes = written, path = %path.display(), "archive downloaded");
        Ok(written)
    }

    /// [`fetch`](Self::fetch), retried once after the configured pause.
    ///
    /// # Errors
    ///
    /// Returns the error of the second attempt unchanged.
    pub fn fetch_with_retry(
        &self,
        url: &str,
        path: &Path,
        progress: &mut dyn DownloadProgress,
    ) -> Result<u64> {
        match self.fetch(url, path, progress) {
            Ok(written) => Ok(written),
            Err(err) if err.is_retryable() => {
                warn!(
                    error = %err,
                    backoff_ms = self.retry_backoff.as_millis() as u64,
                    "download failed, retrying once"
                );
                thread::sleep(self.retry_backoff);
                self.fetch(url, path, progress)
            }
            Err(err) => Err(err),
        }
    }
}

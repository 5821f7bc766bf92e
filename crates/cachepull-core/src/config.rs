//! Configuration for cache restore operations.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::extraction::ExtractStrategy;

/// Where the cache archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSource {
    /// URL of the archive itself.
    Direct(String),
    /// Cache API endpoint that answers with the archive URL.
    Api(String),
}

impl CacheSource {
    /// Picks a source from the two optional settings.
    ///
    /// Empty strings count as unset. A direct URL wins over an API endpoint.
    ///
    /// # Examples
    ///
    /// ```
    /// use cachepull_core::CacheSource;
    ///
    /// assert_eq!(CacheSource::from_urls(None, Some(String::new())), None);
    /// assert_eq!(
    ///     CacheSource::from_urls(Some("https://a/b.tar".into()), Some("https://api".into())),
    ///     Some(CacheSource::Direct("https://a/b.tar".into()))
    /// );
    /// ```
    #[must_use]
    pub fn from_urls(direct: Option<String>, api: Option<String>) -> Option<Self> {
        let direct = direct.filter(|url| !url.is_empty());
        let api = api.filter(|url| !url.is_empty());
        direct.map(Self::Direct).or_else(|| api.map(Self::Api))
    }

    /// Returns the configured URL.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Direct(url) | Self::Api(url) => url,
        }
    }
}

impl fmt::Display for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(url) => write!(f, "download URL {url}"),
            Self::Api(url) => write!(f, "cache API {url}"),
        }
    }
}

/// Configuration for a single restore run.
///
/// Built once, then passed to [`restore_cache`](crate::restore_cache) by
/// reference. Nothing in the pipeline reads process-wide state instead.
///
/// # Examples
///
/// ```
/// use cachepull_core::CacheSource;
/// use cachepull_core::RestoreConfig;
///
/// let config = RestoreConfig::default()
///     .with_cache_source(Some(CacheSource::Direct("https://cache/x.tar".into())))
///     .with_current_stack_id(Some("linux-docker".into()))
///     .with_allow_fallback(true);
/// assert!(config.allow_fallback);
/// ```
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Archive source. `None` makes the restore a no-op.
    ///
    /// Default: `None`.
    pub cache_source: Option<CacheSource>,

    /// Log per-item detail at info level.
    ///
    /// Default: `false`.
    pub debug_mode: bool,

    /// Continue when the archive was built on a different stack.
    ///
    /// Default: `false`.
    pub allow_fallback: bool,

    /// Place absolute archive entries under the current working directory
    /// instead of at their recorded location.
    ///
    /// Forces the manual extractor. Default: `false`.
    pub extract_relative: bool,

    /// Stack of the running machine. `None` skips the stack check.
    ///
    /// Default: `None`.
    pub current_stack_id: Option<String>,

    /// How entries are written to disk.
    ///
    /// Default: [`ExtractStrategy::Auto`].
    pub strategy: ExtractStrategy,

    /// Pause before the single download retry.
    ///
    /// Default: 3 seconds.
    pub retry_backoff: Duration,

    /// Timeout of the cache API request.
    ///
    /// Default: 20 seconds.
    pub api_timeout: Duration,

    /// Timeout of one archive download attempt, body included.
    ///
    /// Default: 30 minutes.
    pub download_timeout: Duration,

    /// Directory that absolute paths are rebased under when
    /// `extract_relative` is set.
    ///
    /// Default: `None` (the process working directory).
    pub relative_base: Option<PathBuf>,

    /// Parent directory for the download and extraction directories.
    ///
    /// Default: `None` (system temp directory).
    pub work_dir: Option<PathBuf>,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            cache_source: None,
            debug_mode: false,
            allow_fallback: false,
            extract_relative: false,
            current_stack_id: None,
            strategy: ExtractStrategy::Auto,
            retry_backoff: Duration::from_secs(3),
            api_timeout: Duration::from_secs(20),
            download_timeout: Duration::from_secs(30 * 60),
            relative_base: None,
            work_dir: None,
        }
    }
}

impl RestoreConfig {
    /// Creates a `RestoreConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the archive source.
    #[must_use]
    pub fn with_cache_source(mut self, source: Option<CacheSource>) -> Self {
        self.cache_source = source;
        self
    }

    /// Sets debug mode.
    #[must_use]
    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    /// Sets whether a stack mismatch is tolerated.
    #[must_use]
    pub fn with_allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }

    /// Sets whether absolute entries are relocated under the working
    /// directory.
    #[must_use]
    pub fn with_extract_relative(mut self, relative: bool) -> Self {
        self.extract_relative = relative;
        self
    }

    /// Sets the current stack identity.
    #[must_use]
    pub fn with_current_stack_id(mut self, stack_id: Option<String>) -> Self {
        self.current_stack_id = stack_id;
        self
    }

    /// Sets the extraction strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ExtractStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the pause before the download retry.
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

    /// Sets the timeout of each archive download attempt.
    #[must_use]
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Sets the directory absolute paths are rebased under.
    #[must_use]
    pub fn with_relative_base(mut self, base: Option<PathBuf>) -> Self {
        self.relative_base = base;
        self
    }

    /// Sets the parent of temporary directories.
    #[must_use]
    pub fn with_work_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.work_dir = dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RestoreConfig::default();
        assert!(config.cache_source.is_none());
        assert!(!config.allow_fallback);
        assert!(!config.extract_relative);
        assert_eq!(config.strategy, ExtractStrategy::Auto);
        assert_eq!(config.retry_backoff, Duration::from_secs(3));
        assert_eq!(config.api_timeout, Duration::from_secs(20));
        assert_eq!(config.download_timeout, Duration::from_secs(1800));
        assert!(config.relative_base.is_none());
    }

    #[test]
    fn test_builders() {
        let config = RestoreConfig::new()
            .with_debug_mode(true)
            .with_extract_relative(true)
            .with_strategy(ExtractStrategy::Manual)
            .with_retry_backoff(Duration::ZERO)
            .with_download_timeout(Duration::from_secs(5))
            .with_relative_base(Some(PathBuf::from("/tmp/base")))
            .with_work_dir(Some(PathBuf::from("/tmp/work")));
        assert!(config.debug_mode);
        assert!(config.extract_relative);
        assert_eq!(config.strategy, ExtractStrategy::Manual);
        assert_eq!(config.retry_backoff, Duration::ZERO);
        assert_eq!(config.download_timeout, Duration::from_secs(5));
        assert_eq!(config.relative_base, Some(PathBuf::from("/tmp/base")));
        assert_eq!(config.work_dir, Some(PathBuf::from("/tmp/work")));
    }

    #[test]
    fn test_source_selection() {
        assert_eq!(CacheSource::from_urls(None, None), None);
        assert_eq!(
            CacheSource::from_urls(Some(String::new()), Some("https://api/x".into())),
            Some(CacheSource::Api("https://api/x".into()))
        );
        let direct = CacheSource::Direct("https://s3/x.tar".into());
        assert_eq!(direct.url(), "https://s3/x.tar");
        assert!(direct.to_string().contains("download URL"));
    }
}

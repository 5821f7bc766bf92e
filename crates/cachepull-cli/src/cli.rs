//! CLI argument parsing using clap.

use cachepull_core::CacheSource;
use cachepull_core::ExtractStrategy;
use cachepull_core::RestoreConfig;
use clap::Parser;
use clap::Subcommand;
use clap::builder::BoolishValueParser;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cachepull")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, extract and place a build cache archive
    Restore(RestoreArgs),
    /// Inspect a local cache archive without extracting it
    Inspect(InspectArgs),
}

#[derive(clap::Args)]
pub struct RestoreArgs {
    /// Direct download URL of the cache archive
    #[arg(long = "cache-url", env = "cache_download_url", value_name = "URL")]
    pub cache_url: Option<String>,

    /// Cache API endpoint that resolves the download URL
    #[arg(
        long = "cache-api-url",
        env = "cache_api_url",
        value_name = "URL",
        conflicts_with = "cache_url"
    )]
    pub cache_api_url: Option<String>,

    /// Stack identity of the current environment
    #[arg(long, env = "stack_id", value_name = "ID")]
    pub stack_id: Option<String>,

    /// Restore even if the cache was created on a different stack
    #[arg(
        long,
        env = "allow_fallback",
        action = clap::ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub allow_fallback: bool,

    /// Extract absolute paths relative to the current directory
    #[arg(
        long = "extract-relative",
        env = "extract_to_relative_path",
        action = clap::ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub extract_relative: bool,

    /// Log resolved URLs, moved items and extractor output
    #[arg(
        long,
        env = "is_debug_mode",
        action = clap::ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub debug: bool,

    /// Extraction strategy: auto, delegated or manual
    #[arg(long, value_name = "STRATEGY", default_value = "auto")]
    pub strategy: ExtractStrategy,

    /// Timeout of each archive download attempt, in seconds
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 1800,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub download_timeout: u64,

    /// Directory that holds temporary download and extraction directories
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
}

impl RestoreArgs {
    /// Builds the core restore configuration from the parsed arguments.
    ///
    /// With `--extract-relative`, paths are rebased under the current
    /// directory.
    pub fn to_config(&self) -> RestoreConfig {
        let relative_base = if self.extract_relative {
            env::current_dir().ok()
        } else {
            None
        };

        RestoreConfig::new()
            .with_cache_source(CacheSource::from_urls(
                self.cache_url.clone(),
                self.cache_api_url.clone(),
            ))
            .with_current_stack_id(self.stack_id.clone().filter(|id| !id.is_empty()))
            .with_allow_fallback(self.allow_fallback)
            .with_extract_relative(self.extract_relative)
            .with_relative_base(relative_base)
            .with_download_timeout(Duration::from_secs(self.download_timeout))
            .with_debug_mode(self.debug)
            .with_strategy(self.strategy)
            .with_work_dir(self.work_dir.clone())
    }
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Evaluate the stack gate against this stack identity
    #[arg(long, env = "stack_id", value_name = "ID")]
    pub stack_id: Option<String>,

    /// Evaluate the stack gate with fallback allowed
    #[arg(
        long,
        env = "allow_fallback",
        action = clap::ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub allow_fallback: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn restore_args(args: &[&str]) -> RestoreArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Restore(args) => args,
            Commands::Inspect(_) => panic!("expected restore"),
        }
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_restore_args_to_config() {
        let args = restore_args(&[
            "cachepull",
            "restore",
            "--cache-url",
            "https://cache/a.tar",
            "--stack-id",
            "linux",
            "--allow-fallback",
            "--strategy",
            "manual",
        ]);
        let config = args.to_config();

        assert_eq!(
            config.cache_source,
            Some(CacheSource::Direct("https://cache/a.tar".into()))
        );
        assert_eq!(config.current_stack_id.as_deref(), Some("linux"));
        assert!(config.allow_fallback);
        assert!(!config.extract_relative);
        assert_eq!(config.strategy, ExtractStrategy::Manual);
        assert!(config.relative_base.is_none());
        assert_eq!(config.download_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_extract_relative_uses_current_dir() {
        let args = restore_args(&[
            "cachepull",
            "restore",
            "--extract-relative",
            "--download-timeout",
            "60",
        ]);
        let config = args.to_config();

        assert!(config.extract_relative);
        assert_eq!(config.relative_base, Some(env::current_dir().unwrap()));
        assert_eq!(config.download_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_urls_conflict() {
        let result = Cli::try_parse_from([
            "cachepull",
            "restore",
            "--cache-url",
            "a",
            "--cache-api-url",
            "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_stack_id_is_unset() {
        let args = restore_args(&["cachepull", "restore", "--stack-id", ""]);
        assert!(args.to_config().current_stack_id.is_none());
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        let result = Cli::try_parse_from(["cachepull", "restore", "--strategy", "zip"]);
        assert!(result.is_err());
    }
}

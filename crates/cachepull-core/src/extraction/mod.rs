//! Archive extraction strategies.
//!
//! Two interchangeable extractors write archive entries to disk:
//!
//! - [`DelegatedExtractor`] runs the system `tar`
//! - [`ManualExtractor`] walks entries in process and can relocate
//!   absolute paths under another root
//!
//! [`select_extractor`] picks one from an [`ExtractStrategy`].

pub mod delegated;
pub mod manual;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;
use tracing::warn;

use crate::ExtractionReport;
use crate::Result;

pub use delegated::DelegatedExtractor;
pub use manual::ManualExtractor;
pub use manual::PathMode;

/// Writes the entries of a local archive below a root directory.
pub trait Extractor {
    /// Extracts `archive` into `dest_root`, creating the root if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be read or an entry cannot be
    /// written.
    fn extract(&self, archive: &Path, dest_root: &Path) -> Result<ExtractionReport>;

    /// Returns a short name for logs and reports.
    fn name(&self) -> &'static str;
}

/// How the extractor is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExtractStrategy {
    /// System `tar` when it works, otherwise the manual walker.
    #[default]
    Auto,
    /// Always the system `tar`.
    Delegated,
    /// Always the manual walker.
    Manual,
}

impl ExtractStrategy {
    /// Returns the strategy name as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Delegated => "delegated",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ExtractStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExtractStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "delegated" | "tar" => Ok(Self::Delegated),
            "manual" => Ok(Self::Manual),
            other => Err(format!(
                "unknown extraction strategy '{other}' (expected auto, delegated or manual)"
            )),
        }
    }
}

/// Builds the extractor for `strategy`.
///
/// Relocating entries is only possible with the manual walker, so
/// [`PathMode::Relocate`] always yields a [`ManualExtractor`].
#[must_use]
pub fn select_extractor(
    strategy: ExtractStrategy,
    path_mode: PathMode,
    debug: bool,
) -> Box<dyn Extractor> {
    let manual = || -> Box<dyn Extractor> { Box::new(ManualExtractor::new(path_mode, debug)) };

    if path_mode == PathMode::Relocate {
        if strategy == ExtractStrategy::Delegated {
            warn!("system tar cannot relocate absolute entries, using manual extraction");
        }
        return manual();
    }

    match strategy {
        ExtractStrategy::Manual => manual(),
        ExtractStrategy::Delegated => Box::new(DelegatedExtractor::new(debug)),
        ExtractStrategy::Auto => {
            let delegated = DelegatedExtractor::new(debug);
            if delegated.is_available() {
                Box::new(delegated)
            } else {
                debug!("system tar not available, using manual extraction");
                manual()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!("auto".parse::<ExtractStrategy>().unwrap(), ExtractStrategy::Auto);
        assert_eq!(
            "Delegated".parse::<ExtractStrategy>().unwrap(),
            ExtractStrategy::Delegated
        );
        assert_eq!("tar".parse::<ExtractStrategy>().unwrap(), ExtractStrategy::Delegated);
        assert_eq!("manual".parse::<ExtractStrategy>().unwrap(), ExtractStrategy::Manual);
        assert!("zip".parse::<ExtractStrategy>().is_err());
    }

    #[test]
    fn test_strategy_display_round_trips() {
        for strategy in [
            ExtractStrategy::Auto,
            ExtractStrategy::Delegated,
            ExtractStrategy::Manual,
        ] {
            assert_eq!(strategy.to_string().parse::<ExtractStrategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_relocation_forces_manual() {
        let extractor = select_extractor(ExtractStrategy::Delegated, PathMode::Relocate, false);
        assert_eq!(extractor.name(), "manual");
    }

    #[test]
    fn test_explicit_strategies() {
        let manual = select_extractor(ExtractStrategy::Manual, PathMode::PreserveAbsolute, false);
        assert_eq!(manual.name(), "manual");

        let delegated =
            select_extractor(ExtractStrategy::Delegated, PathMode::PreserveAbsolute, false);
        assert_eq!(delegated.name(), "tar");
    }
}

//! Stack compatibility gate.
//!
//! A cache built on one machine image can carry paths and binaries that are
//! wrong for another. The archive records the stack it was built on; the
//! gate compares that against the current stack before anything is placed.

use crate::RestoreError;
use crate::Result;

/// Outcome of comparing the archive's stack with the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Stacks match, or either side is unknown.
    Proceed,
    /// Stacks differ and fallback is allowed.
    ProceedWithMismatch {
        /// Stack recorded in the archive.
        archive: String,
        /// Stack of the running machine.
        current: String,
    },
    /// Stacks differ and fallback is not allowed. Nothing is placed.
    Abort {
        /// Stack recorded in the archive.
        archive: String,
        /// Stack of the running machine.
        current: String,
    },
}

impl GateDecision {
    /// Returns `true` unless the decision is [`GateDecision::Abort`].
    #[must_use]
    pub const fn proceeds(&self) -> bool {
        !matches!(self, Self::Abort { .. })
    }

    /// Returns `true` when the stacks were found to differ.
    #[must_use]
    pub const fn is_mismatch(&self) -> bool {
        !matches!(self, Self::Proceed)
    }

    /// Converts an abort into [`RestoreError::StackMismatch`].
    ///
    /// # Errors
    ///
    /// Returns `StackMismatch` for [`GateDecision::Abort`].
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::Abort { archive, current } => {
                Err(RestoreError::StackMismatch { archive, current })
            }
            other => Ok(other),
        }
    }
}

/// Decides whether a restore may continue.
///
/// An empty string counts as unset. If either side is unset the check is
/// skipped.
///
/// # Examples
///
/// ```
/// use cachepull_core::stack::GateDecision;
/// use cachepull_core::stack::check;
///
/// assert_eq!(check(Some("linux-docker"), None, false), GateDecision::Proceed);
/// assert!(!check(Some("osx-12"), Some("osx-13"), false).proceeds());
/// assert!(check(Some("osx-12"), Some("osx-13"), true).proceeds());
/// ```
#[must_use]
pub fn check(archive: Option<&str>, current: Option<&str>, allow_fallback: bool) -> GateDecision {
    let (Some(archive), Some(current)) = (non_empty(archive), non_empty(current)) else {
        return GateDecision::Proceed;
    };

    if archive == current {
        return GateDecision::Proceed;
    }

    let archive = archive.to_string();
    let current = current.to_string();
    if allow_fallback {
        GateDecision::ProceedWithMismatch { archive, current }
    } else {
        GateDecision::Abort { archive, current }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_stacks_proceed() {
        assert_eq!(check(Some("a"), Some("a"), false), GateDecision::Proceed);
        assert_eq!(check(Some("a"), Some("a"), true), GateDecision::Proceed);
    }

    #[test]
    fn test_unset_side_skips_check() {
        for (archive, current) in [
            (None, Some("b")),
            (Some("a"), None),
            (None, None),
            (Some(""), Some("b")),
            (Some("a"), Some("")),
        ] {
            assert_eq!(check(archive, current, false), GateDecision::Proceed);
        }
    }

    #[test]
    fn test_mismatch_without_fallback_aborts() {
        let decision = check(Some("osx-12"), Some("osx-13"), false);
        assert_eq!(
            decision,
            GateDecision::Abort {
                archive: "osx-12".to_string(),
                current: "osx-13".to_string(),
            }
        );
        assert!(decision.is_mismatch());

        let err = decision.into_result().unwrap_err();
        assert!(matches!(err, RestoreError::StackMismatch { .. }));
    }

    #[test]
    fn test_mismatch_with_fallback_proceeds() {
        let decision = check(Some("osx-12"), Some("osx-13"), true);
        assert!(decision.proceeds());
        assert!(decision.is_mismatch());
        assert_eq!(decision.clone().into_result().unwrap(), decision);
    }
}

//! Error handling and result types for depsaurus.
//!
//! Workflow plumbing uses `color-eyre` through the [`Result`] alias so errors
//! carry context as they propagate. Components that talk to the network, the
//! filesystem or a subprocess instead return an [`Outcome`], which keeps the
//! pipeline running on soft failures while still telling the caller which
//! path was taken.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::result::Outcome;
//!
//! let latest = registry.latest_version(&dependency).await;
//! if latest.is_degraded() {
//!     warn!("falling back to sentinel: {:?}", latest.reason());
//! }
//! let latest = latest.into_value();
//! ```

use color_eyre::eyre::Result as EyreResult;

use crate::error::DepsaurusError;

/// Standard result type used throughout depsaurus.
///
/// This is a type alias for `color_eyre::eyre::Result<T>`, providing enhanced
/// error reporting capabilities including colorized output and chain-able
/// error contexts using `.wrap_err()`.
pub type Result<T> = EyreResult<T>;

/// Three-way result of a component operation.
///
/// * `Success` - the operation produced a real value.
/// * `Degraded` - the operation failed softly; `value` holds the sentinel the
///   pipeline continues with and `reason` explains what went wrong.
/// * `Failed` - a hard failure the caller must report.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Degraded { value: T, reason: String },
    Failed(DepsaurusError),
}

impl<T> Outcome<T> {
    /// Build a soft failure carrying a sentinel value.
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Reason for a soft or hard failure, if any.
    pub fn reason(&self) -> Option<String> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason.clone()),
            Outcome::Failed(err) => Some(err.to_string()),
        }
    }

    /// Borrow the carried value for successes and soft failures.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) | Outcome::Degraded { value, .. } => {
                Some(value)
            }
            Outcome::Failed(_) => None,
        }
    }

    /// Convert into a standard result; soft failures count as success.
    pub fn into_result(self) -> std::result::Result<T, DepsaurusError> {
        match self {
            Outcome::Success(value) | Outcome::Degraded { value, .. } => {
                Ok(value)
            }
            Outcome::Failed(err) => Err(err),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
            Outcome::Failed(err) => Outcome::Failed(err),
        }
    }
}

impl<T> Outcome<T> {
    /// Collapse into the carried value, using `fallback` for hard failures.
    pub fn value_or(self, fallback: T) -> T {
        match self {
            Outcome::Success(value) | Outcome::Degraded { value, .. } => value,
            Outcome::Failed(_) => fallback,
        }
    }
}

impl<T: Default> Outcome<T> {
    /// Collapse into the carried value, using `T::default()` for hard
    /// failures.
    pub fn into_value(self) -> T {
        match self {
            Outcome::Success(value) | Outcome::Degraded { value, .. } => value,
            Outcome::Failed(_) => T::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_keeps_sentinel_and_reason() {
        let outcome = Outcome::degraded("unknown".to_string(), "timed out");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.reason().as_deref(), Some("timed out"));
        assert_eq!(outcome.value().map(String::as_str), Some("unknown"));
        assert_eq!(outcome.into_value(), "unknown");
    }

    #[test]
    fn failed_collapses_to_default() {
        let outcome: Outcome<Vec<String>> =
            Outcome::Failed(DepsaurusError::not_found("left-pad"));
        assert!(outcome.is_failed());
        assert!(outcome.value().is_none());
        assert!(outcome.into_value().is_empty());
    }

    #[test]
    fn value_or_replaces_only_hard_failures() {
        let failed: Outcome<String> =
            Outcome::Failed(DepsaurusError::not_found("left-pad"));
        assert_eq!(failed.value_or("unknown".into()), "unknown");
        assert_eq!(Outcome::degraded(1, "soft").value_or(0), 1);
        assert_eq!(Outcome::Success(2).value_or(0), 2);
    }

    #[test]
    fn map_preserves_variant() {
        let outcome = Outcome::Success(2).map(|v| v * 2);
        assert!(matches!(outcome, Outcome::Success(4)));

        let outcome = Outcome::degraded(1, "soft").map(|v| v + 1);
        assert!(matches!(outcome, Outcome::Degraded { value: 2, .. }));
    }

    #[test]
    fn into_result_reports_hard_failures_only() {
        assert_eq!(Outcome::degraded(3, "soft").into_result().unwrap(), 3);
        let failed: Outcome<u8> =
            Outcome::Failed(DepsaurusError::forge("boom"));
        assert!(failed.into_result().is_err());
    }
}

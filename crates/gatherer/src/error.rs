//! Error types for the gatherer library.
//!
//! Every failure the acquisition layer can hit is a [`GathererError`]. Errors are additionally
//! sorted into a small [`FailureKind`] taxonomy which decides how a batch reacts to them:
//!
//! - [`FailureKind::NotFound`]: the resource is absent (HTTP 404, zero matches). Never retried.
//! - [`FailureKind::Transient`]: network trouble or a malformed response. Retried where retries
//!   make sense (downloads), otherwise the single item is skipped.
//! - [`FailureKind::Corrupt`]: a transfer finished but the output is undersized or unreadable.
//! - [`FailureKind::Timeout`]: a bounded operation ran past its deadline.
//! - [`FailureKind::Configuration`]: the caller asked for something impossible (an empty term
//!   group, a backwards date range). These are the only errors that escape a batch call.
//!
//! # Examples
//!
//! ```
//! use gatherer::{
//!   error::{FailureKind, GathererError},
//!   query::TermGroup,
//! };
//!
//! let err = TermGroup::new(Vec::<String>::new()).unwrap_err();
//! assert!(matches!(err, GathererError::EmptyTermGroup));
//! assert_eq!(err.kind(), FailureKind::Configuration);
//! ```

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Error type alias used for the [`gatherer`](crate) crate.
pub type Result<T> = core::result::Result<T, GathererError>;

/// Errors that can occur while searching, downloading, or extracting papers.
#[derive(Error, Debug)]
pub enum GathererError {
  /// A term group with no terms was supplied.
  ///
  /// An empty group would make the Cartesian product empty, so it is rejected up front.
  #[error("Term groups must contain at least one term")]
  EmptyTermGroup,

  /// A combination search was requested without any term groups.
  #[error("At least one term group is required")]
  NoTermGroups,

  /// A date string was not a valid ISO calendar date (`YYYY-MM-DD`).
  #[error("Invalid date \"{0}\", expected YYYY-MM-DD")]
  InvalidDate(String),

  /// The start of a date range falls after its end.
  #[error("Invalid date range: {from} is after {to}")]
  InvalidDateRange {
    /// Start of the requested range
    from: String,
    /// End of the requested range
    to:   String,
  },

  /// A network request failed.
  ///
  /// This can occur when:
  /// - The network is unavailable
  /// - The server is unreachable
  /// - The request times out at the transport level
  /// - The response body stream is interrupted
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The server answered with a non-success status other than 404.
  #[error("Unexpected HTTP status {0}")]
  Status(u16),

  /// The requested resource does not exist.
  #[error("Resource not found")]
  NotFound,

  /// The search service returned something we could not understand, or reported an error in
  /// its own response body.
  #[error("API error: {0}")]
  ApiError(String),

  /// A bounded operation did not finish in time.
  #[error("Operation timed out after {0:?}")]
  Timeout(Duration),

  /// A download completed but the file is too small to be a real document.
  #[error("Downloaded file {} is corrupt ({size} bytes)", path.display())]
  Corrupt {
    /// Location of the (now deleted) file
    path: PathBuf,
    /// Size of the file when it was inspected
    size: u64,
  },

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// PDF parsing errors from the lopdf library.
  #[error(transparent)]
  Lopdf(#[from] lopdf::Error),

  /// A cached record or output could not be (de)serialized.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A configuration file could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// A URL could not be constructed from the configured endpoint.
  #[error(transparent)]
  Url(#[from] url::ParseError),

  /// The configuration holds an unusable value.
  #[error("{0}")]
  Config(String),
}

/// Coarse classification of a [`GathererError`], used to decide retry and degradation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// The resource is absent; retrying will not help.
  NotFound,
  /// A temporary failure which may succeed later.
  Transient,
  /// The transfer succeeded but produced an unusable file.
  Corrupt,
  /// A deadline was exceeded.
  Timeout,
  /// The request itself is invalid. Fatal at call time.
  Configuration,
}

impl GathererError {
  /// Classifies this error into the [`FailureKind`] taxonomy.
  pub fn kind(&self) -> FailureKind {
    match self {
      GathererError::NotFound | GathererError::Status(404) => FailureKind::NotFound,
      GathererError::Network(e) if e.status().is_some_and(|s| s.as_u16() == 404) =>
        FailureKind::NotFound,
      GathererError::Network(e) if e.is_timeout() => FailureKind::Timeout,
      GathererError::Timeout(_) => FailureKind::Timeout,
      GathererError::Corrupt { .. } | GathererError::Lopdf(_) => FailureKind::Corrupt,
      GathererError::EmptyTermGroup
      | GathererError::NoTermGroups
      | GathererError::InvalidDate(_)
      | GathererError::InvalidDateRange { .. }
      | GathererError::TomlDe(_)
      | GathererError::Url(_)
      | GathererError::Config(_) => FailureKind::Configuration,
      GathererError::Network(_)
      | GathererError::Status(_)
      | GathererError::ApiError(_)
      | GathererError::Path(_)
      | GathererError::Json(_) => FailureKind::Transient,
    }
  }

  /// Whether this error means the resource does not exist.
  pub fn is_not_found(&self) -> bool { self.kind() == FailureKind::NotFound }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_failure_kinds() {
    assert_eq!(GathererError::NotFound.kind(), FailureKind::NotFound);
    assert_eq!(GathererError::Status(404).kind(), FailureKind::NotFound);
    assert_eq!(GathererError::Status(503).kind(), FailureKind::Transient);
    assert_eq!(GathererError::ApiError("bad xml".into()).kind(), FailureKind::Transient);
    assert_eq!(GathererError::Timeout(Duration::from_secs(1)).kind(), FailureKind::Timeout);
    assert_eq!(
      GathererError::Corrupt { path: PathBuf::from("a.pdf"), size: 12 }.kind(),
      FailureKind::Corrupt
    );
    assert_eq!(GathererError::EmptyTermGroup.kind(), FailureKind::Configuration);
    assert!(GathererError::Status(404).is_not_found());
    assert!(!GathererError::Status(500).is_not_found());
  }
}

//! Error types for the gatherer command line.

use gatherer::error::GathererError;
use thiserror::Error;

/// Result alias for the CLI.
pub type Result<T> = core::result::Result<T, GathererdError>;

/// Everything that can stop a CLI run.
#[derive(Error, Debug)]
pub enum GathererdError {
  /// Errors bubbled up from the library. Only configuration problems reach this point.
  #[error(transparent)]
  Gatherer(#[from] GathererError),

  /// Reading input files or writing output failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// The paper list could not be written as JSON.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// Arguments that parse but do not make sense together.
  #[error("{0}")]
  Usage(String),
}

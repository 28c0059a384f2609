//! `gatherer cached`: finish papers saved by an earlier run.

use super::*;

/// Options for [`Commands::Cached`].
#[derive(Args, Clone, Debug)]
pub struct CachedOptions {
  /// JSON array of paper records
  pub records: PathBuf,

  /// Options shared by every command
  #[command(flatten)]
  pub common: CommonOptions,
}

impl CachedOptions {
  /// Reads the records file into a request.
  pub fn request(&self) -> Result<Request> {
    let records = CachedRecord::load_all(&self.records)?;
    debug!(count = records.len(), "loaded cached records");
    Ok(Request::cached(records))
  }
}

//! `gatherer terms`: one group of keywords.

use super::*;

/// Options for [`Commands::Terms`].
#[derive(Args, Clone, Debug)]
pub struct TermsOptions {
  /// Keywords to search for
  #[arg(required = true)]
  pub terms: Vec<String>,

  /// How the keywords are combined inside each field (and, or)
  #[arg(long, default_value_t = Logic::And)]
  pub logic: Logic,

  /// Options shared by every command
  #[command(flatten)]
  pub common: CommonOptions,
}

impl TermsOptions {
  /// Builds the single-group request.
  pub fn request(&self) -> Result<Request> {
    Ok(Request::terms(TermGroup::new(self.terms.iter().cloned())?, self.logic))
  }
}

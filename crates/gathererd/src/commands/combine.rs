//! `gatherer combine`: the Cartesian product of several keyword groups.

use super::*;

/// Options for [`Commands::Combine`].
#[derive(Args, Clone, Debug)]
pub struct CombineOptions {
  /// A comma separated group of alternative keywords; repeat for each group
  #[arg(long = "group", short, required = true)]
  pub groups: Vec<String>,

  /// Search each group on its own instead of combining them
  #[arg(long)]
  pub independent: bool,

  /// Operator inside each group when searching independently (and, or)
  #[arg(long, default_value_t = Logic::And)]
  pub logic: Logic,

  /// Options shared by every command
  #[command(flatten)]
  pub common: CommonOptions,
}

impl CombineOptions {
  /// Builds the multi-group request.
  pub fn request(&self) -> Result<Request> {
    let groups = self
      .groups
      .iter()
      .map(|group| TermGroup::parse(group))
      .collect::<core::result::Result<Vec<_>, _>>()?;
    Ok(if self.independent {
      Request::groups(groups, self.logic)
    } else {
      Request::combinations(groups)
    })
  }
}

//! Subcommands and the options they share.

use super::*;

pub mod cached;
pub mod combine;
pub mod terms;
pub mod titles;

pub use cached::CachedOptions;
pub use combine::CombineOptions;
pub use terms::TermsOptions;
pub use titles::TitlesOptions;

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Search one group of terms in titles and abstracts
  Terms(TermsOptions),

  /// Search every combination of terms drawn from several groups
  Combine(CombineOptions),

  /// Look papers up by (approximate) title
  Titles(TitlesOptions),

  /// Re-assemble papers from a JSON file written by an earlier run
  Cached(CachedOptions),
}

impl Commands {
  /// The library request for this command and where to write its output.
  pub fn request(&self) -> Result<(Request, Option<PathBuf>)> {
    let (request, common) = match self {
      Commands::Terms(options) => (options.request()?, &options.common),
      Commands::Combine(options) => (options.request()?, &options.common),
      Commands::Titles(options) => (options.request()?, &options.common),
      Commands::Cached(options) => (options.request()?, &options.common),
    };
    Ok((common.apply(request)?, common.output.clone()))
  }
}

/// Options every command accepts.
#[derive(Args, Clone, Debug, Default)]
pub struct CommonOptions {
  /// Maximum number of keyword search results
  #[arg(long, default_value_t = 100)]
  pub max_results: usize,

  /// Only papers submitted on this day (YYYY-MM-DD). Wins over --from/--to.
  #[arg(long)]
  pub date: Option<String>,

  /// Start of a submission date range (YYYY-MM-DD)
  #[arg(long, requires = "to")]
  pub from: Option<String>,

  /// End of a submission date range (YYYY-MM-DD)
  #[arg(long, requires = "from")]
  pub to: Option<String>,

  /// Write the paper list here instead of stdout
  #[arg(long, short)]
  pub output: Option<PathBuf>,

  /// Search only; do not download PDFs or extract text
  #[arg(long)]
  pub no_download: bool,
}

impl CommonOptions {
  /// Applies the shared options to `request`.
  pub fn apply(&self, request: Request) -> Result<Request> {
    if self.max_results == 0 {
      return Err(GathererdError::Usage("--max-results must be positive".into()));
    }
    let range = self.from.as_deref().zip(self.to.as_deref());
    let date = DateFilter::parse(self.date.as_deref(), range)?;
    Ok(request.with_max_results(self.max_results).with_date(date).with_download(!self.no_download))
  }
}

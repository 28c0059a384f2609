//! Console rendering of progress events and results.

use console::Term;

use super::*;

/// Prefix for information messages
pub static INFO_PREFIX: &str = "ℹ ";
/// Prefix for in-progress messages
pub static WORKING_PREFIX: &str = "» ";
/// Prefix for success messages
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for error messages
pub static ERROR_PREFIX: &str = "✗ ";
/// Prefix for warning messages
pub static WARNING_PREFIX: &str = "! ";
/// Relationship arrow
pub static ARROW: &str = "→";

/// Longest title shown before truncation.
const TITLE_WIDTH: usize = 60;

/// Final messages shown after (or instead of) a run.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// The run was aborted
  Error(&'a GathererdError),
  /// The run completed
  Summary(&'a Acquired),
  /// Anything else
  Info(&'a str),
}

/// Renders events on a terminal. Used on stderr so stdout can carry JSON.
pub struct ConsoleSink {
  /// Output terminal
  term: Term,
}

impl ConsoleSink {
  /// A sink writing to stderr.
  pub fn stderr() -> Self { Self { term: Term::stderr() } }

  /// Prints a final message.
  pub fn reply(&self, content: ResponseContent) {
    match content {
      ResponseContent::Error(error) =>
        self.line(format!("{} {}", style(ERROR_PREFIX).red(), style(error).red())),
      ResponseContent::Info(info) => self.line(format!("{} {info}", style(INFO_PREFIX).blue())),
      ResponseContent::Summary(acquired) => {
        let with_pdf = acquired.papers.iter().filter(|p| p.pdf_path.is_some()).count();
        self.line(format!(
          "{} {} papers ({} with PDF)",
          style(SUCCESS_PREFIX).green(),
          style(acquired.papers.len()).bold(),
          with_pdf
        ));
        if let Some(report) = acquired.titles {
          self.line(format!(
            "{} titles: {} searched, {} found, {} not found, {} timed out, {} failed",
            style(INFO_PREFIX).blue(),
            report.total,
            style(report.found).green(),
            report.not_found,
            report.timed_out,
            report.failed
          ));
        }
      },
    }
  }

  /// Writes one line, ignoring a closed terminal.
  fn line(&self, message: String) { let _ = self.term.write_line(&message); }
}

/// Shortens long titles for display.
fn short(title: &str) -> String {
  if title.chars().count() > TITLE_WIDTH {
    format!("{}...", title.chars().take(TITLE_WIDTH).collect::<String>())
  } else {
    title.to_string()
  }
}

impl EventSink for ConsoleSink {
  fn emit(&self, event: &Event) {
    trace!(?event, "console event");
    let message = match event {
      Event::CombinationsPlanned { count } =>
        format!("{} Searching {} term combinations", style(WORKING_PREFIX).cyan(), count),
      Event::CombinationSearched { label, found } =>
        format!("{} {}: {} papers", style(SUCCESS_PREFIX).green(), style(label).bold(), found),
      Event::CombinationFailed { label, error } =>
        format!("{} {}: {}", style(ERROR_PREFIX).red(), style(label).bold(), error),
      Event::TitleResolved { title, matched, elapsed } => format!(
        "{} {} ({:.1}s) {} {}",
        style(SUCCESS_PREFIX).green(),
        short(title),
        elapsed.as_secs_f64(),
        ARROW,
        style(short(matched)).dim()
      ),
      Event::TitleNotFound { title, elapsed } => format!(
        "{} No paper found for {} ({:.1}s)",
        style(ERROR_PREFIX).red(),
        short(title),
        elapsed.as_secs_f64()
      ),
      Event::TitleTimedOut { title, timeout } => format!(
        "{} Lookup of {} timed out after {}s",
        style(WARNING_PREFIX).yellow(),
        short(title),
        timeout.as_secs()
      ),
      Event::TitleFailed { title, error } =>
        format!("{} Lookup of {} failed: {}", style(ERROR_PREFIX).red(), short(title), error),
      Event::TitleProgress { done, total, found } if done % 10 == 0 || done == total =>
        format!("{} Searched {done}/{total} titles, found {found}", style(INFO_PREFIX).blue()),
      Event::DownloadSkipped { path } =>
        format!("{} Already downloaded {}", style(INFO_PREFIX).blue(), path.display()),
      Event::RetryScheduled { url, attempt, delay, error } => format!(
        "{} {url}: {error}; retry {attempt} in {:.1}s",
        style(WARNING_PREFIX).yellow(),
        delay.as_secs_f64()
      ),
      Event::DownloadSucceeded { path, bytes } => format!(
        "{} Downloaded {} ({} KiB)",
        style(SUCCESS_PREFIX).green(),
        path.display(),
        bytes / 1024
      ),
      Event::DownloadFailed { url, error } =>
        format!("{} Download of {url} failed: {error}", style(ERROR_PREFIX).red()),
      Event::CorruptFileRemoved { path, size } => format!(
        "{} Removed corrupt file {} ({size} bytes)",
        style(WARNING_PREFIX).yellow(),
        path.display()
      ),
      Event::PageSkipped { path, page, error } => format!(
        "{} Skipped page {page} of {}: {error}",
        style(WARNING_PREFIX).yellow(),
        path.display()
      ),
      _ => return,
    };
    self.line(message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_short_titles() {
    assert_eq!(short("Attention Is All You Need"), "Attention Is All You Need");
    let long = "x".repeat(80);
    assert_eq!(short(&long).chars().count(), TITLE_WIDTH + 3);
  }
}

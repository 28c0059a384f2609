//! Bounded-time lookup of papers by (approximate) title.
//!
//! A user supplied title is tidied (colons removed, whitespace collapsed), searched in the title
//! field only, and the candidate whose title is most similar to the tidied input wins. Each
//! lookup carries its own deadline through [`tokio::time::timeout`], so any number of lookups
//! can run side by side without interfering; a lookup that runs out of time is dropped and
//! reported as not found.

use futures::{stream, StreamExt};
use tokio::time::Instant;

use super::*;

/// Candidates requested per lookup when not configured otherwise.
pub const DEFAULT_CANDIDATES: usize = 20;

/// Outcome of a single title lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
  /// The best matching candidate
  Found(SearchResult),
  /// The service returned no candidates
  NotFound,
  /// The lookup exceeded its deadline
  TimedOut,
  /// The service call failed
  Failed(String),
}

impl Resolution {
  /// The matched result, if any. Every other outcome yields no paper.
  pub fn found(self) -> Option<SearchResult> {
    match self {
      Resolution::Found(result) => Some(result),
      _ => None,
    }
  }
}

/// Tallies of a title batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleReport {
  /// Titles looked up
  pub total:     usize,
  /// Titles matched to a paper
  pub found:     usize,
  /// Lookups with no candidates
  pub not_found: usize,
  /// Lookups that ran past the deadline
  pub timed_out: usize,
  /// Lookups the service rejected
  pub failed:    usize,
}

impl TitleReport {
  /// Counts one outcome.
  fn record(&mut self, resolution: &Resolution) {
    self.total += 1;
    match resolution {
      Resolution::Found(_) => self.found += 1,
      Resolution::NotFound => self.not_found += 1,
      Resolution::TimedOut => self.timed_out += 1,
      Resolution::Failed(_) => self.failed += 1,
    }
  }

  /// Titles that did not produce a paper, for whatever reason.
  pub fn missing(&self) -> usize { self.total - self.found }
}

/// Case-insensitive similarity of two titles in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
  strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Picks the candidate most similar to `title`; ties go to the earliest candidate.
pub fn best_match(title: &str, candidates: Vec<SearchResult>) -> Option<SearchResult> {
  let mut best: Option<(f64, SearchResult)> = None;
  for candidate in candidates {
    let score = similarity(title, &candidate.title);
    trace!(candidate = %candidate.title, score, "scored title candidate");
    if best.as_ref().map_or(true, |(top, _)| score > *top) {
      best = Some((score, candidate));
    }
  }
  best.map(|(_, candidate)| candidate)
}

/// Resolves free-text titles to search results.
#[derive(Clone)]
pub struct TitleResolver {
  /// Search backend
  client:      Arc<dyn SearchClient>,
  /// Progress subscriber
  events:      Arc<dyn EventSink>,
  /// Deadline per lookup
  timeout:     Duration,
  /// Results fetched per lookup
  candidates:  usize,
  /// Lookups in flight at once
  concurrency: usize,
}

impl TitleResolver {
  /// Creates a resolver bounding each lookup by `timeout`.
  pub fn new(client: Arc<dyn SearchClient>, events: Arc<dyn EventSink>, timeout: Duration) -> Self {
    Self { client, events, timeout, candidates: DEFAULT_CANDIDATES, concurrency: 1 }
  }

  /// Sets how many candidates each lookup fetches.
  pub fn with_candidates(mut self, candidates: usize) -> Self {
    self.candidates = candidates.max(1);
    self
  }

  /// Sets how many lookups run at once.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  /// Looks up a single title within this resolver's deadline.
  pub async fn resolve(&self, title: &str) -> Resolution {
    let tidy = normalize_title(title);
    let request = SearchRequest::new(title_query(title), self.candidates);
    let started = Instant::now();

    // Dropping the inner future on expiry cancels the request; nothing outlives this call.
    let resolution = match tokio::time::timeout(self.timeout, self.client.search(&request)).await
    {
      Err(_) => Resolution::TimedOut,
      Ok(Err(e)) => Resolution::Failed(e.to_string()),
      Ok(Ok(candidates)) => match best_match(&tidy, candidates) {
        Some(result) => Resolution::Found(result),
        None => Resolution::NotFound,
      },
    };

    let elapsed = started.elapsed();
    let title = title.to_string();
    match &resolution {
      Resolution::Found(result) =>
        self.events.emit(&Event::TitleResolved { title, matched: result.title.clone(), elapsed }),
      Resolution::NotFound => self.events.emit(&Event::TitleNotFound { title, elapsed }),
      Resolution::TimedOut =>
        self.events.emit(&Event::TitleTimedOut { title, timeout: self.timeout }),
      Resolution::Failed(error) =>
        self.events.emit(&Event::TitleFailed { title, error: error.clone() }),
    }
    resolution
  }

  /// Looks up every title, returning the found results (deduplicated, in input order) and a
  /// tally of outcomes.
  pub async fn resolve_all<S: AsRef<str>>(&self, titles: &[S]) -> (Vec<SearchResult>, TitleReport) {
    let total = titles.len();
    let mut report = TitleReport::default();
    let mut found = Vec::new();

    let mut resolutions =
      stream::iter(titles).map(|title| self.resolve(title.as_ref())).buffered(self.concurrency);

    while let Some(resolution) = resolutions.next().await {
      report.record(&resolution);
      if let Some(result) = resolution.found() {
        found.push(result);
      }
      self.events.emit(&Event::TitleProgress { done: report.total, total, found: report.found });
    }

    debug!(?report, "title batch finished");
    (dedup_results(found), report)
  }
}

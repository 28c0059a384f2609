//! Structured progress reporting.
//!
//! The core never prints. Everything a front-end might want to show (how many combinations were
//! planned, which title timed out, how long a download backs off) is published as an [`Event`]
//! to an [`EventSink`]. Sinks are shared as `Arc<dyn EventSink>` and must tolerate concurrent
//! emitters.
//!
//! # Examples
//!
//! ```
//! use gatherer::event::{Event, EventSink, RecordingSink};
//!
//! let sink = RecordingSink::default();
//! sink.emit(&Event::CombinationsPlanned { count: 4 });
//! assert_eq!(sink.events().len(), 1);
//! ```

use std::sync::Mutex;

use super::*;

/// Something noteworthy that happened while acquiring papers.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  /// The Cartesian product was computed
  CombinationsPlanned { count: usize },
  /// One combination's search returned
  CombinationSearched { label: String, found: usize },
  /// One combination's search failed and was skipped
  CombinationFailed { label: String, error: String },
  /// A title lookup picked a candidate
  TitleResolved { title: String, matched: String, elapsed: Duration },
  /// A title lookup returned no candidates
  TitleNotFound { title: String, elapsed: Duration },
  /// A title lookup ran past its deadline
  TitleTimedOut { title: String, timeout: Duration },
  /// A title lookup failed at the service
  TitleFailed { title: String, error: String },
  /// Running tally of a title batch
  TitleProgress { done: usize, total: usize, found: usize },
  /// A fetch attempt began
  DownloadStarted { url: String, path: PathBuf, attempt: u32 },
  /// A valid file already existed at the output path
  DownloadSkipped { path: PathBuf },
  /// A transient failure will be retried after `delay`
  RetryScheduled { url: String, attempt: u32, delay: Duration, error: String },
  /// The file was written and validated
  DownloadSucceeded { path: PathBuf, bytes: u64 },
  /// The download gave up
  DownloadFailed { url: String, error: String },
  /// An undersized file was deleted
  CorruptFileRemoved { path: PathBuf, size: u64 },
  /// A PDF page could not be read and contributed no text
  PageSkipped { path: PathBuf, page: u32, error: String },
  /// A paper record is final
  PaperAssembled { title: String, has_pdf: bool, text_chars: usize },
}

/// Receiver of [`Event`]s.
pub trait EventSink: Send + Sync {
  /// Handles one event. Called from whichever task produced it.
  fn emit(&self, event: &Event);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
  fn emit(&self, event: &Event) {
    match event {
      Event::CombinationFailed { label, error } =>
        warn!(combination = %label, %error, "combination search failed"),
      Event::TitleTimedOut { title, timeout } =>
        warn!(%title, ?timeout, "title search timed out"),
      Event::TitleFailed { title, error } => warn!(%title, %error, "title search failed"),
      Event::RetryScheduled { url, attempt, delay, error } =>
        warn!(%url, attempt, ?delay, %error, "download failed, retrying"),
      Event::DownloadFailed { url, error } => warn!(%url, %error, "download failed"),
      Event::CorruptFileRemoved { path, size } =>
        warn!(path = %path.display(), size, "removed corrupt file"),
      Event::PageSkipped { path, page, error } =>
        warn!(path = %path.display(), page, %error, "skipped unreadable page"),
      Event::DownloadStarted { .. } | Event::TitleProgress { .. } => debug!(?event),
      _ => info!(?event),
    }
  }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
  fn emit(&self, _event: &Event) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
  /// Everything emitted so far
  events: Mutex<Vec<Event>>,
}

impl RecordingSink {
  /// Snapshot of the events seen so far.
  pub fn events(&self) -> Vec<Event> {
    self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
  }

  /// Number of recorded events matching `predicate`.
  pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
    self.events().iter().filter(|event| predicate(event)).count()
  }

  /// Delays of every [`Event::RetryScheduled`], in order.
  pub fn retry_delays(&self) -> Vec<Duration> {
    self
      .events()
      .into_iter()
      .filter_map(|event| match event {
        Event::RetryScheduled { delay, .. } => Some(delay),
        _ => None,
      })
      .collect()
  }
}

impl EventSink for RecordingSink {
  fn emit(&self, event: &Event) {
    self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(event.clone());
  }
}

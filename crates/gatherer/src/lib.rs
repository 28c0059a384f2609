//! Scholarly paper acquisition from bibliographic search services.
//!
//! `gatherer` finds papers, fetches their PDFs and pulls out their text, while tolerating flaky
//! networks, partial failures and slow upstream calls. It provides:
//!
//! - Field-scoped query construction with date filters
//! - Multi-group keyword search over the Cartesian product of term groups
//! - Bounded-time fuzzy lookup of papers by title
//! - PDF downloads with exponential backoff and corruption detection
//! - Page-isolated PDF text extraction
//! - Normalization of live search results and cached JSON records into one [`Paper`] type
//!
//! Failures are scoped to the single item that hit them (one combination, one title, one
//! download) and never abort a batch. Only configuration mistakes such as an empty term group
//! are errors at call time. Progress is reported as structured [`event::Event`]s through an
//! [`EventSink`]; the library itself never prints.
//!
//! # Getting Started
//!
//! ```no_run
//! use gatherer::{
//!   config::Config,
//!   query::{DateFilter, TermGroup},
//!   Gatherer, Request,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let gatherer = Gatherer::new(Config::load(Config::default_path())?)?;
//!
//!   let groups = vec![TermGroup::parse("LLM,VLM")?, TermGroup::parse("games,agents")?];
//!   let request = Request::combinations(groups)
//!     .with_max_results(40)
//!     .with_date(DateFilter::parse(None, Some(("2025-01-01", "2025-06-30")))?);
//!
//!   let acquired = gatherer.acquire(&request).await?;
//!   for paper in &acquired.papers {
//!     println!("{} -> {:?}", paper.title, paper.pdf_path);
//!   }
//!   Ok(())
//! }
//! ```
//!
//! # Design Philosophy
//!
//! Every seam that touches the outside world is a trait: [`SearchClient`] for the search
//! service, [`extract::PdfBackend`] for PDF parsing and [`EventSink`] for progress reporting.
//! The [`Gatherer`] facade wires the production implementations together, and each can be
//! swapped independently in tests or by embedding applications.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  collections::HashSet,
  fmt::Display,
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod assemble;
pub mod combination;
pub mod config;
pub mod download;
pub mod error;
pub mod event;
pub mod extract;
pub mod paper;
pub mod query;
pub mod search;
pub mod title;

use crate::{
  assemble::*, combination::*, config::*, download::*, error::*, event::*, extract::*, paper::*,
  query::*, search::*, title::*,
};

/// Common traits and types for ergonomic imports.
///
/// ```
/// use gatherer::prelude::*;
///
/// fn check(result: Result<()>) -> bool { result.is_ok() }
/// ```
pub mod prelude {
  pub use crate::{
    error::{GathererError, Result},
    event::EventSink,
    extract::{PdfBackend, PdfDocument},
    search::SearchClient,
  };
}

/// The keyword part of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terms {
  /// One group searched as a whole with the given operator
  Group {
    /// Terms to search
    group: TermGroup,
    /// Operator joining the terms
    logic: Logic,
  },
  /// Several groups, each searched on its own, results concatenated
  Groups {
    /// Groups to search independently
    groups: Vec<TermGroup>,
    /// Operator joining the terms inside each group
    logic:  Logic,
  },
  /// Several groups expanded into their Cartesian product
  Combinations(Vec<TermGroup>),
}

/// Everything one acquisition run should fetch.
///
/// Terms, titles and cached records may be combined; results appear in that order and are
/// deduplicated by canonical URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
  /// Keyword search, if any
  pub terms:       Option<Terms>,
  /// Literal titles to resolve
  pub titles:      Vec<String>,
  /// Records from an earlier run
  pub cached:      Vec<CachedRecord>,
  /// Result cap for keyword searches
  pub max_results: usize,
  /// Submission date constraint for keyword searches
  pub date:        Option<DateFilter>,
  /// Whether to download PDFs and extract text
  pub download:    bool,
}

impl Default for Request {
  fn default() -> Self {
    Self {
      terms:       None,
      titles:      Vec::new(),
      cached:      Vec::new(),
      max_results: 100,
      date:        None,
      download:    true,
    }
  }
}

impl Request {
  /// Search a single term group.
  pub fn terms(group: TermGroup, logic: Logic) -> Self {
    Self { terms: Some(Terms::Group { group, logic }), ..Default::default() }
  }

  /// Search several groups independently.
  pub fn groups(groups: Vec<TermGroup>, logic: Logic) -> Self {
    Self { terms: Some(Terms::Groups { groups, logic }), ..Default::default() }
  }

  /// Search every combination of terms across `groups`.
  pub fn combinations(groups: Vec<TermGroup>) -> Self {
    Self { terms: Some(Terms::Combinations(groups)), ..Default::default() }
  }

  /// Resolve literal titles.
  pub fn titles<I, S>(titles: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    Self::default().with_titles(titles)
  }

  /// Re-assemble previously stored records.
  pub fn cached(records: Vec<CachedRecord>) -> Self {
    Self { cached: records, ..Default::default() }
  }

  /// Adds titles to look up after the term search.
  pub fn with_titles<I, S>(mut self, titles: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    self.titles.extend(titles.into_iter().map(Into::into));
    self
  }

  /// Sets the result cap.
  pub fn with_max_results(mut self, max_results: usize) -> Self {
    self.max_results = max_results;
    self
  }

  /// Restricts results to a submission date or range.
  pub fn with_date(mut self, date: Option<DateFilter>) -> Self {
    self.date = date;
    self
  }

  /// Turns PDF download and extraction on or off.
  pub fn with_download(mut self, download: bool) -> Self {
    self.download = download;
    self
  }
}

/// Result of [`Gatherer::acquire`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acquired {
  /// Assembled papers, unique by URL
  pub papers: Vec<Paper>,
  /// Title lookup tallies, when titles were requested
  pub titles: Option<TitleReport>,
}

/// Runs acquisition requests end to end.
#[derive(Clone)]
pub struct Gatherer {
  /// Settings shared by every component
  config: Config,
  /// Search backend
  client: Arc<dyn SearchClient>,
  /// Progress subscriber
  events: Arc<dyn EventSink>,
}

impl Gatherer {
  /// Creates a gatherer talking to the configured arXiv endpoint and logging events through
  /// `tracing`.
  pub fn new(config: Config) -> Result<Self> {
    config.validate()?;
    let client = Arc::new(ArxivClient::from_config(&config)?);
    Ok(Self { config, client, events: Arc::new(TracingSink) })
  }

  /// Replaces the search backend.
  pub fn with_client(mut self, client: Arc<dyn SearchClient>) -> Self {
    self.client = client;
    self
  }

  /// Replaces the event subscriber.
  pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
    self.events = events;
    self
  }

  /// The active configuration.
  pub fn config(&self) -> &Config { &self.config }

  /// Searches one term group, newest submissions first.
  pub async fn search_terms(
    &self,
    group: &TermGroup,
    logic: Logic,
    max_results: usize,
    date: Option<&DateFilter>,
  ) -> Result<Vec<SearchResult>> {
    let query = QueryBuilder::new(group.terms().iter().cloned()).logic(logic).date(date).build();
    debug!(%query, max_results, "searching term group");
    let request = SearchRequest::new(query, max_results).sort_by(SortOrder::SubmittedDate);
    self.client.search(&request).await
  }

  /// Searches each group on its own and returns the deduplicated concatenation.
  ///
  /// A group whose search fails contributes nothing.
  pub async fn search_groups(
    &self,
    groups: &[TermGroup],
    logic: Logic,
    max_results: usize,
    date: Option<&DateFilter>,
  ) -> Result<Vec<SearchResult>> {
    if groups.is_empty() {
      return Err(GathererError::NoTermGroups);
    }
    let mut results = Vec::new();
    for group in groups {
      match self.search_terms(group, logic, max_results, date).await {
        Ok(found) => results.extend(found),
        Err(e) => warn!(terms = ?group.terms(), error = %e, "term group search failed"),
      }
    }
    Ok(dedup_results(results))
  }

  /// Searches every combination of terms across `groups`.
  pub async fn search_combinations(
    &self,
    groups: &[TermGroup],
    max_results: usize,
    date: Option<&DateFilter>,
  ) -> Result<Vec<SearchResult>> {
    CombinationExpander::new(self.client.clone(), self.events.clone())
      .with_concurrency(self.config.concurrency)
      .expand(groups, max_results, date)
      .await
  }

  /// Resolves each title to its best match.
  pub async fn resolve_titles<S: AsRef<str>>(&self, titles: &[S]) -> (Vec<SearchResult>, TitleReport) {
    TitleResolver::new(self.client.clone(), self.events.clone(), self.config.title_timeout())
      .with_candidates(self.config.title_candidates)
      .with_concurrency(self.config.concurrency)
      .resolve_all(titles)
      .await
  }

  /// Turns sources into papers, downloading PDFs into the configured directory when `download`
  /// is set.
  pub async fn assemble(&self, sources: Vec<PaperSource>, download: bool) -> Result<Vec<Paper>> {
    let assembler = if download {
      let pdf_dir = ensure_pdf_dir(Some(&self.config.pdf_dir))?;
      let config = self.config.clone().with_pdf_dir(pdf_dir);
      PaperAssembler::from_config(&config, self.events.clone())?
    } else {
      PaperAssembler::from_config(&self.config, self.events.clone())?.metadata_only()
    };
    Ok(assembler.assemble_all(sources).await)
  }

  /// Runs a whole request: keyword search, title lookups, cached records, then assembly.
  ///
  /// Only configuration problems are errors; everything else degrades per item.
  pub async fn acquire(&self, request: &Request) -> Result<Acquired> {
    let date = request.date.as_ref();
    let mut found = match &request.terms {
      Some(Terms::Group { group, logic }) =>
        match self.search_terms(group, *logic, request.max_results, date).await {
          Ok(results) => results,
          Err(e) if e.kind() == FailureKind::Configuration => return Err(e),
          Err(e) => {
            warn!(error = %e, "term search failed");
            Vec::new()
          },
        },
      Some(Terms::Groups { groups, logic }) =>
        self.search_groups(groups, *logic, request.max_results, date).await?,
      Some(Terms::Combinations(groups)) =>
        self.search_combinations(groups, request.max_results, date).await?,
      None => Vec::new(),
    };

    let titles = if request.titles.is_empty() {
      None
    } else {
      let (resolved, report) = self.resolve_titles(&request.titles).await;
      found.extend(resolved);
      Some(report)
    };

    let mut seen = HashSet::new();
    let sources: Vec<PaperSource> = dedup_results(found)
      .into_iter()
      .map(PaperSource::Live)
      .chain(request.cached.iter().cloned().map(PaperSource::Cached))
      .filter(|source| source.url().is_empty() || seen.insert(source.url().to_string()))
      .collect();
    info!(papers = sources.len(), "assembling papers");

    let papers = self.assemble(sources, request.download).await?;
    Ok(Acquired { papers, titles })
  }
}

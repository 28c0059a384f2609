//! The single point of contact with the bibliographic search service.
//!
//! [`SearchClient`] turns a query string, a result cap and a sort order into a list of
//! [`SearchResult`]s. It never retries: a failed metadata search is cheap for the caller to
//! issue again, and both [`CombinationExpander`] and [`TitleResolver`] already scope failures
//! to the single query that produced them.
//!
//! The production implementation is [`arxiv::ArxivClient`].

use super::*;

pub mod arxiv;

pub use self::arxiv::ArxivClient;

/// A paper record as returned by the search service.
///
/// Immutable once returned; `entry_id` is the service's globally unique entry URL and is used
/// for deduplication everywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
  /// Canonical entry URL, e.g. `http://arxiv.org/abs/2301.07041v2`
  pub entry_id:  String,
  /// Title with whitespace collapsed
  pub title:     String,
  /// Author names in publication order
  pub authors:   Vec<String>,
  /// Abstract text
  pub summary:   String,
  /// First submission timestamp
  pub published: DateTime<Utc>,
  /// Free-form author comment (page counts, venue, ...)
  pub comment:   Option<String>,
  /// Direct link to the PDF, when the service provides one
  pub pdf_url:   Option<String>,
}

/// Ordering requested from the search service. Results always come back descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
  /// The service's own relevance ranking
  #[default]
  Relevance,
  /// Most recently submitted first
  SubmittedDate,
  /// Most recently updated first
  LastUpdatedDate,
}

impl SortOrder {
  /// Name of this ordering in the search API.
  pub fn as_param(self) -> &'static str {
    match self {
      SortOrder::Relevance => "relevance",
      SortOrder::SubmittedDate => "submittedDate",
      SortOrder::LastUpdatedDate => "lastUpdatedDate",
    }
  }
}

/// One request against the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
  /// Query in the service's field-scoped grammar
  pub query:       String,
  /// Upper bound on the number of results returned
  pub max_results: usize,
  /// Result ordering
  pub sort:        SortOrder,
}

impl SearchRequest {
  /// A request for up to `max_results` results, sorted by relevance.
  pub fn new(query: impl Into<String>, max_results: usize) -> Self {
    Self { query: query.into(), max_results, sort: SortOrder::default() }
  }

  /// Sets the result order.
  pub fn sort_by(mut self, sort: SortOrder) -> Self {
    self.sort = sort;
    self
  }
}

/// Executes queries against a bibliographic search backend.
///
/// Implementations surface transport and parse errors unchanged and must be safe to call
/// concurrently.
#[async_trait]
pub trait SearchClient: Send + Sync {
  /// Runs `request`, returning at most `request.max_results` matches in backend order.
  async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>>;
}

/// Drops results whose `entry_id` was already seen, keeping first occurrences in order.
pub fn dedup_results(results: impl IntoIterator<Item = SearchResult>) -> Vec<SearchResult> {
  let mut seen = HashSet::new();
  results.into_iter().filter(|result| seen.insert(result.entry_id.clone())).collect()
}

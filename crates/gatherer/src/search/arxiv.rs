//! Client for arXiv's Atom search API.
//!
//! Queries are sent to `http://export.arxiv.org/api/query` (configurable) and the Atom feed is
//! deserialized with `quick-xml`. Large caps are fetched in pages of `page_size` results until
//! the cap is met or the service returns a short page.
//!
//! arXiv throttles bursts, so every request made through one client (and its clones) is spaced
//! at least `search_interval_secs` after the previous one. Each request is also bounded by the
//! configured transport timeout.
//!
//! # Examples
//!
//! ```no_run
//! use gatherer::search::{ArxivClient, SearchClient, SearchRequest, SortOrder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArxivClient::default();
//! let request = SearchRequest::new("ti:\"diffusion\"", 10).sort_by(SortOrder::SubmittedDate);
//! for result in client.search(&request).await? {
//!   println!("{} ({})", result.title, result.entry_id);
//! }
//! # Ok(())
//! # }
//! ```

use quick_xml::de::from_str;
use tokio::{sync::Mutex as AsyncMutex, time::Instant};

use super::*;

/// Internal representation of the arXiv API's Atom feed response.
#[derive(Debug, Deserialize)]
struct Feed {
  /// A feed may contain any number of entries, including none
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

/// Internal representation of a paper entry from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Entry {
  /// Entry URL, or an `/api/errors#...` URL when the service reports a problem
  id:        String,
  /// Paper title (may wrap across lines)
  #[serde(default)]
  title:     String,
  /// Paper abstract
  #[serde(default)]
  summary:   String,
  /// First submission date; absent on error entries
  #[serde(default)]
  published: Option<DateTime<Utc>>,
  /// Last revision date
  #[serde(default)]
  updated:   Option<DateTime<Utc>>,
  /// Authors in byline order
  #[serde(rename = "author", default)]
  authors:   Vec<EntryAuthor>,
  /// Free-text author comment (page counts, venue)
  #[serde(rename = "comment", alias = "arxiv:comment", default)]
  comment:   Option<String>,
  /// Abstract page, PDF and DOI links
  #[serde(rename = "link", default)]
  links:     Vec<Link>,
}

/// An `<author>` element.
#[derive(Debug, Deserialize)]
struct EntryAuthor {
  /// Display name
  name: String,
}

/// A `<link>` element.
#[derive(Debug, Deserialize)]
struct Link {
  /// Target URL
  #[serde(rename = "@href")]
  href:  String,
  /// `pdf` on the PDF link
  #[serde(rename = "@title", default)]
  title: Option<String>,
  /// MIME type
  #[serde(rename = "@type", default)]
  kind:  Option<String>,
}

/// Upper bound on establishing a connection, whatever the request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the arXiv search API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
  /// Internal web client used to connect to the API.
  client:    reqwest::Client,
  /// Query endpoint
  api_url:   String,
  /// Maximum results requested per page
  page_size: usize,
  /// Minimum spacing between two requests
  interval:  Duration,
  /// When the last request was sent; shared by clones
  last_sent: Arc<AsyncMutex<Option<Instant>>>,
}

impl ArxivClient {
  /// Creates a client for the given query endpoint, with no request spacing.
  pub fn new(api_url: impl Into<String>) -> Self {
    Self {
      client:    reqwest::Client::new(),
      api_url:   api_url.into(),
      page_size: 100,
      interval:  Duration::ZERO,
      last_sent: Arc::new(AsyncMutex::new(None)),
    }
  }

  /// Creates a client from the endpoint, page size, timeout and request spacing in `config`.
  pub fn from_config(config: &Config) -> Result<Self> {
    let timeout = config.request_timeout();
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .connect_timeout(timeout.min(CONNECT_TIMEOUT))
      .build()?;
    Ok(Self {
      client,
      api_url: config.api_url.clone(),
      page_size: config.page_size.max(1),
      interval: config.search_interval(),
      last_sent: Arc::new(AsyncMutex::new(None)),
    })
  }

  /// Sets how many results are requested per page.
  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.max(1);
    self
  }

  /// Sets the minimum spacing between requests.
  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval;
    self
  }

  /// Waits until `interval` has passed since the previous request, then claims the slot.
  ///
  /// The lock is held while sleeping so concurrent callers queue up instead of firing together.
  async fn wait_turn(&self) {
    let mut last_sent = self.last_sent.lock().await;
    if let Some(previous) = *last_sent {
      let wait = (previous + self.interval).saturating_duration_since(Instant::now());
      if !wait.is_zero() {
        trace!(?wait, "spacing arXiv request");
        tokio::time::sleep(wait).await;
      }
    }
    *last_sent = Some(Instant::now());
  }

  /// Fetches a single page of results starting at offset `start`.
  async fn fetch_page(
    &self,
    request: &SearchRequest,
    start: usize,
    count: usize,
  ) -> Result<Vec<SearchResult>> {
    let (start, count) = (start.to_string(), count.to_string());
    let url = Url::parse_with_params(&self.api_url, &[
      ("search_query", request.query.as_str()),
      ("start", start.as_str()),
      ("max_results", count.as_str()),
      ("sortBy", request.sort.as_param()),
      ("sortOrder", "descending"),
    ])?;

    self.wait_turn().await;
    debug!("Fetching from arXiv via: {url}");

    let response = self.client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(GathererError::Status(status.as_u16()));
    }
    let body = response.text().await?;

    trace!("arXiv response: {body}");

    parse_feed(&body)
  }
}

impl Default for ArxivClient {
  fn default() -> Self { Self::new(DEFAULT_API_URL) }
}

#[async_trait]
impl SearchClient for ArxivClient {
  async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
    let mut results = Vec::new();
    let mut start = 0;

    while results.len() < request.max_results {
      let wanted = (request.max_results - results.len()).min(self.page_size);
      let page = self.fetch_page(request, start, wanted).await?;
      let received = page.len();
      results.extend(page);
      if received < wanted {
        break;
      }
      start += received;
    }

    results.truncate(request.max_results);
    debug!(query = %request.query, found = results.len(), "arXiv search finished");
    Ok(results)
  }
}

/// Parses an Atom feed body into search results.
fn parse_feed(body: &str) -> Result<Vec<SearchResult>> {
  let feed: Feed =
    from_str(body).map_err(|e| GathererError::ApiError(format!("Failed to parse XML: {e}")))?;

  feed.entries.into_iter().map(SearchResult::try_from).collect()
}

impl TryFrom<Entry> for SearchResult {
  type Error = GathererError;

  fn try_from(entry: Entry) -> Result<Self> {
    if entry.id.contains("/api/errors") {
      return Err(GathererError::ApiError(collapse_whitespace(&entry.summary)));
    }

    let published = entry.published.or(entry.updated).ok_or_else(|| {
      GathererError::ApiError(format!("Entry {} has no publication date", entry.id))
    })?;

    // Prefer the advertised PDF link, otherwise derive it from the abstract page URL.
    let pdf_url = entry
      .links
      .iter()
      .find(|link| {
        link.title.as_deref() == Some("pdf") || link.kind.as_deref() == Some("application/pdf")
      })
      .map(|link| link.href.clone())
      .or_else(|| derive_pdf_url(entry.id.trim()));

    Ok(SearchResult {
      title: collapse_whitespace(&entry.title),
      authors: entry.authors.into_iter().map(|author| author.name.trim().to_string()).collect(),
      summary: entry.summary.trim().to_string(),
      published,
      comment: entry.comment.map(|c| collapse_whitespace(&c)).filter(|c| !c.is_empty()),
      pdf_url,
      entry_id: entry.id.trim().to_string(),
    })
  }
}

/// Joins all whitespace runs into single spaces.
fn collapse_whitespace(text: &str) -> String { text.split_whitespace().collect::<Vec<_>>().join(" ") }

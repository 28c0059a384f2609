//! The assembled paper record and the input shapes it is built from.
//!
//! Papers reach the assembler in one of two shapes:
//!
//! - a live [`SearchResult`] fresh from the search service, or
//! - a [`CachedRecord`] read back from JSON written by an earlier run (or by hand).
//!
//! [`PaperSource`] tags which one we have, and each variant has its own adapter onto the
//! canonical [`Paper`] fields. Cached records are deliberately forgiving: every field is
//! optional, `authors` may be a list or one comma separated string, the abstract may be stored
//! as `summary` or `abstract`, and a record that only knows its arXiv identifier still gets a
//! PDF URL.
//!
//! # Examples
//!
//! ```
//! use gatherer::paper::{CachedRecord, PaperSource};
//!
//! let record: CachedRecord = serde_json::from_str(
//!   r#"{ "title": "Attention Is All You Need", "authors": "Vaswani, Shazeer", "arxiv_id": "1706.03762" }"#,
//! )
//! .unwrap();
//! let paper = PaperSource::Cached(record).into_paper();
//! assert_eq!(paper.authors, ["Vaswani", "Shazeer"]);
//! assert_eq!(paper.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1706.03762.pdf"));
//! ```

use chrono::{NaiveDateTime, TimeZone};

use super::*;

/// A fully assembled paper, handed on to report generation.
///
/// `url` is the canonical identifier and is unique within any sequence this crate returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
  /// Paper title
  pub title:     String,
  /// Author names in publication order
  pub authors:   Vec<String>,
  /// Abstract
  pub summary:   String,
  /// Canonical entry URL
  pub url:       String,
  /// Where the PDF can be fetched from
  pub pdf_url:   Option<String>,
  /// First submission timestamp, when known
  pub published: Option<DateTime<Utc>>,
  /// Free-form author comment
  pub comment:   Option<String>,
  /// Local copy of the PDF; `None` when the download failed or was not attempted
  pub pdf_path:  Option<PathBuf>,
  /// Extracted text; `None` without a local PDF, possibly empty when extraction found nothing
  pub pdf_text:  Option<String>,
}

impl Paper {
  /// Authors as one `", "` separated string.
  pub fn authors_joined(&self) -> String { self.authors.join(", ") }
}

/// Authors as stored in a cached record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedAuthors {
  /// One entry per author
  List(Vec<String>),
  /// `"Alice, Bob"`
  Joined(String),
}

impl Default for CachedAuthors {
  fn default() -> Self { CachedAuthors::List(Vec::new()) }
}

impl CachedAuthors {
  /// Individual, trimmed, non-empty author names.
  pub fn names(&self) -> Vec<String> {
    match self {
      CachedAuthors::List(names) => names
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect(),
      CachedAuthors::Joined(joined) => joined
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect(),
    }
  }
}

/// A paper record persisted as JSON. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachedRecord {
  /// Paper title
  pub title:     String,
  /// Author names
  pub authors:   CachedAuthors,
  /// Abstract
  #[serde(alias = "abstract")]
  pub summary:   String,
  /// Canonical entry URL
  #[serde(alias = "entry_id")]
  pub url:       String,
  /// Direct PDF link
  pub pdf_url:   Option<String>,
  /// arXiv identifier, used to build a PDF link when `pdf_url` is absent
  pub arxiv_id:  Option<String>,
  /// Kept as text; see [`parse_published`]
  pub published: Option<String>,
  /// Author comment
  pub comment:   Option<String>,
}

impl CachedRecord {
  /// Reads a JSON array of cached records.
  pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }
}

/// Parses a stored publication time.
///
/// Accepts RFC 3339 (`2017-06-12T17:57:34Z`), the space separated form with offset
/// (`2017-06-12 17:57:34+00:00`), a naive date-time, or a bare date (taken as midnight UTC).
/// Anything else is `None`.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
    return Some(parsed.with_timezone(&Utc));
  }
  if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
    return Some(parsed.with_timezone(&Utc));
  }
  if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
    return Some(Utc.from_utc_datetime(&parsed));
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|midnight| Utc.from_utc_datetime(&midnight))
}

/// The PDF link for an arXiv entry URL (`/abs/` swapped for `/pdf/`).
pub fn derive_pdf_url(entry_id: &str) -> Option<String> {
  entry_id.contains("/abs/").then(|| entry_id.replacen("/abs/", "/pdf/", 1))
}

/// Either shape a paper can arrive in.
#[derive(Debug, Clone, PartialEq)]
pub enum PaperSource {
  /// Straight from the search service
  Live(SearchResult),
  /// Read back from storage
  Cached(CachedRecord),
}

impl From<SearchResult> for PaperSource {
  fn from(result: SearchResult) -> Self { PaperSource::Live(result) }
}

impl From<CachedRecord> for PaperSource {
  fn from(record: CachedRecord) -> Self { PaperSource::Cached(record) }
}

impl PaperSource {
  /// Title of the underlying record.
  pub fn title(&self) -> &str {
    match self {
      PaperSource::Live(result) => &result.title,
      PaperSource::Cached(record) => &record.title,
    }
  }

  /// Canonical identifier.
  pub fn url(&self) -> &str {
    match self {
      PaperSource::Live(result) => &result.entry_id,
      PaperSource::Cached(record) => &record.url,
    }
  }

  /// Where to download the PDF from, if anywhere.
  pub fn pdf_url(&self) -> Option<String> {
    match self {
      PaperSource::Live(result) =>
        result.pdf_url.clone().or_else(|| derive_pdf_url(&result.entry_id)),
      PaperSource::Cached(record) => record
        .pdf_url
        .clone()
        .filter(|url| !url.trim().is_empty())
        .or_else(|| {
          record
            .arxiv_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://arxiv.org/pdf/{id}.pdf"))
        })
        .or_else(|| derive_pdf_url(&record.url)),
    }
  }

  /// Canonical fields only; `pdf_path` and `pdf_text` are left empty.
  pub fn into_paper(self) -> Paper {
    let pdf_url = self.pdf_url();
    match self {
      PaperSource::Live(result) => Paper {
        title: result.title,
        authors: result.authors,
        summary: result.summary,
        url: result.entry_id,
        pdf_url,
        published: Some(result.published),
        comment: result.comment,
        pdf_path: None,
        pdf_text: None,
      },
      PaperSource::Cached(record) => Paper {
        authors: record.authors.names(),
        published: record.published.as_deref().and_then(parse_published),
        title: record.title,
        summary: record.summary,
        url: record.url,
        pdf_url,
        comment: record.comment.filter(|comment| !comment.is_empty()),
        pdf_path: None,
        pdf_text: None,
      },
    }
  }
}

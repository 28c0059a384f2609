//! Construction of search-service query strings.
//!
//! The search backend understands field-scoped terms (`ti:` for titles, `abs:` for abstracts),
//! boolean operators, and a `submittedDate:[FROM TO TO]` range clause with compact `YYYYMMDD`
//! days. Every query built here matches a term in either the title or the abstract:
//!
//! ```text
//! (ti:"llm" AND ti:"agents") OR (abs:"llm" AND abs:"agents") AND submittedDate:[20250921 TO 20250922]
//! ```
//!
//! # Examples
//!
//! ```
//! use gatherer::query::{DateFilter, Logic, QueryBuilder};
//!
//! let date = DateFilter::parse(Some("2025-09-21"), None).unwrap();
//! let query = QueryBuilder::new(["llm", "agents"]).logic(Logic::Or).date(date.as_ref()).build();
//! assert_eq!(
//!   query,
//!   "(ti:\"llm\" OR ti:\"agents\") OR (abs:\"llm\" OR abs:\"agents\") AND \
//!    submittedDate:[20250921 TO 20250922]"
//! );
//! ```

use std::str::FromStr;

use super::*;

lazy_static! {
  /// Runs of whitespace, collapsed when tidying titles.
  static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Day format understood by the backend's date filter.
const DAY_FORMAT: &str = "%Y%m%d";

/// Boolean operator joining terms inside one field clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
  /// Every term must match
  #[default]
  And,
  /// Any term may match
  Or,
}

impl Logic {
  /// Operator text, padded for joining.
  fn joiner(self) -> &'static str {
    match self {
      Logic::And => " AND ",
      Logic::Or => " OR ",
    }
  }
}

impl Display for Logic {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Logic::And => write!(f, "AND"),
      Logic::Or => write!(f, "OR"),
    }
  }
}

impl FromStr for Logic {
  type Err = GathererError;

  fn from_str(s: &str) -> Result<Self> {
    match &s.to_lowercase() as &str {
      "and" => Ok(Logic::And),
      "or" => Ok(Logic::Or),
      other => Err(GathererError::Config(format!("Unknown logic operator \"{other}\""))),
    }
  }
}

/// An ordered, non-empty set of search keywords matched with OR semantics when combined
/// across groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermGroup(Vec<String>);

impl TermGroup {
  /// Creates a group, rejecting an empty term list.
  pub fn new<I, S>(terms: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    let terms: Vec<String> = terms.into_iter().map(Into::into).collect();
    if terms.is_empty() {
      return Err(GathererError::EmptyTermGroup);
    }
    Ok(Self(terms))
  }

  /// Parses a comma separated list such as `"LLM, agents"`, trimming blanks.
  pub fn parse(list: &str) -> Result<Self> {
    Self::new(list.split(',').map(str::trim).filter(|t| !t.is_empty()))
  }

  /// The terms, in input order.
  pub fn terms(&self) -> &[String] { &self.0 }

  /// Number of terms.
  pub fn len(&self) -> usize { self.0.len() }

  /// Always false for a parsed group.
  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Restriction on submission date.
///
/// A single day becomes a one-day-wide range (`[day TO day+1]`) so papers submitted late on
/// that day are not lost at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
  /// Papers submitted on this day
  Day(NaiveDate),
  /// Papers submitted between the two days
  Range {
    /// First day of the range
    from: NaiveDate,
    /// Last day of the range
    to:   NaiveDate,
  },
}

impl DateFilter {
  /// Builds a filter from the optional single date and optional range a caller supplied.
  ///
  /// When both are present the single date takes precedence.
  pub fn parse(date: Option<&str>, range: Option<(&str, &str)>) -> Result<Option<Self>> {
    if let Some(date) = date {
      return Ok(Some(DateFilter::Day(parse_day(date)?)));
    }
    match range {
      Some((from, to)) => {
        let (from, to) = (parse_day(from)?, parse_day(to)?);
        Self::range(from, to).map(Some)
      },
      None => Ok(None),
    }
  }

  /// Builds an inclusive range, rejecting one that runs backwards.
  pub fn range(from: NaiveDate, to: NaiveDate) -> Result<Self> {
    if from > to {
      return Err(GathererError::InvalidDateRange { from: from.to_string(), to: to.to_string() });
    }
    Ok(DateFilter::Range { from, to })
  }

  /// The `submittedDate` clause for this filter.
  pub fn clause(&self) -> String {
    let (from, to) = match *self {
      DateFilter::Day(day) => (day, day.succ_opt().unwrap_or(day)),
      DateFilter::Range { from, to } => (from, to),
    };
    format!("submittedDate:[{} TO {}]", from.format(DAY_FORMAT), to.format(DAY_FORMAT))
  }
}

/// Parses an ISO `YYYY-MM-DD` calendar date.
fn parse_day(input: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
    .map_err(|_| GathererError::InvalidDate(input.to_string()))
}

/// Builder for a title-or-abstract query over a set of terms.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
  /// Terms matched in each field
  terms: Vec<String>,
  /// Operator between terms
  logic: Logic,
  /// Trailing date restriction
  date:  Option<DateFilter>,
}

impl QueryBuilder {
  /// Starts a query over `terms`, joined with AND and without a date clause.
  pub fn new<I, S>(terms: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    Self { terms: terms.into_iter().map(Into::into).collect(), logic: Logic::And, date: None }
  }

  /// Sets the operator joining terms inside each field clause.
  pub fn logic(mut self, logic: Logic) -> Self {
    self.logic = logic;
    self
  }

  /// Appends a date clause, if any.
  pub fn date(mut self, date: Option<&DateFilter>) -> Self {
    self.date = date.copied();
    self
  }

  /// Renders the query: title clause OR abstract clause, then the date clause.
  pub fn build(&self) -> String {
    let title = self.field_clause("ti");
    let abstract_ = self.field_clause("abs");
    let mut query = format!("({title}) OR ({abstract_})");
    if let Some(date) = &self.date {
      query.push_str(" AND ");
      query.push_str(&date.clause());
    }
    query
  }

  /// Terms scoped to `field`, joined by the logic operator.
  fn field_clause(&self, field: &str) -> String {
    self
      .terms
      .iter()
      .map(|term| format!("{field}:\"{term}\""))
      .collect::<Vec<_>>()
      .join(self.logic.joiner())
  }
}

/// One element of the Cartesian product across term groups, with its derived query.
///
/// Terms drawn from different groups must all match, so they are joined with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationQuery {
  /// One term from each group, in group order
  pub terms: Vec<String>,
  /// The query string sent to the backend
  pub query: String,
}

impl CombinationQuery {
  /// Builds the AND query for one combination.
  pub fn new(terms: Vec<String>, date: Option<&DateFilter>) -> Self {
    let query = QueryBuilder::new(terms.iter().cloned()).logic(Logic::And).date(date).build();
    Self { terms, query }
  }

  /// Human readable label such as `LLM + agents`.
  pub fn label(&self) -> String { self.terms.join(" + ") }
}

/// Tidies a user supplied title for searching: colons removed, whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
  WHITESPACE.replace_all(title.replace(':', "").trim(), " ").into_owned()
}

/// Title-field query for a raw title.
pub fn title_query(title: &str) -> String { format!("ti:{}", normalize_title(title)) }

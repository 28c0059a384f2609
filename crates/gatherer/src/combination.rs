//! Multi-group keyword search over the Cartesian product of term groups.
//!
//! Given groups `[["LLM", "VLM"], ["games", "agents"]]` the expander issues one search per
//! combination (`LLM + games`, `LLM + agents`, `VLM + games`, `VLM + agents`), splitting the
//! result cap evenly between them. A combination that fails is logged and skipped. Results are
//! merged in combination order, never arrival order, and deduplicated by entry URL so the output
//! is reproducible even though the searches run concurrently.

use futures::{stream, StreamExt};

use super::*;

/// Enumerates the Cartesian product of `groups`, first group varying slowest.
///
/// Fails when no groups are given or any group is empty.
pub fn cartesian_product(groups: &[TermGroup]) -> Result<Vec<Vec<String>>> {
  if groups.is_empty() {
    return Err(GathererError::NoTermGroups);
  }
  if groups.iter().any(TermGroup::is_empty) {
    return Err(GathererError::EmptyTermGroup);
  }

  let mut combinations: Vec<Vec<String>> = vec![Vec::new()];
  for group in groups {
    combinations = combinations
      .into_iter()
      .flat_map(|prefix| {
        group.terms().iter().map(move |term| {
          let mut combination = prefix.clone();
          combination.push(term.clone());
          combination
        })
      })
      .collect();
  }
  Ok(combinations)
}

/// Per-combination share of `max_results`.
///
/// The extra one keeps integer truncation from starving the last combinations.
pub fn per_combination_cap(max_results: usize, combinations: usize) -> usize {
  max_results / combinations.max(1) + 1
}

/// Drives one search per term combination and merges the results.
#[derive(Clone)]
pub struct CombinationExpander {
  /// Search backend
  client:      Arc<dyn SearchClient>,
  /// Progress subscriber
  events:      Arc<dyn EventSink>,
  /// Combinations searched at once
  concurrency: usize,
}

impl CombinationExpander {
  /// Creates an expander searching one combination at a time.
  pub fn new(client: Arc<dyn SearchClient>, events: Arc<dyn EventSink>) -> Self {
    Self { client, events, concurrency: 1 }
  }

  /// Maximum combinations searched at once.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  /// Builds the query for every combination of `groups`.
  pub fn plan(groups: &[TermGroup], date: Option<&DateFilter>) -> Result<Vec<CombinationQuery>> {
    Ok(
      cartesian_product(groups)?
        .into_iter()
        .map(|terms| CombinationQuery::new(terms, date))
        .collect(),
    )
  }

  /// Searches every combination and returns the deduplicated union, newest submissions first
  /// within each combination.
  ///
  /// Only configuration problems (no groups, an empty group) are errors; individual search
  /// failures just contribute nothing.
  pub async fn expand(
    &self,
    groups: &[TermGroup],
    max_results: usize,
    date: Option<&DateFilter>,
  ) -> Result<Vec<SearchResult>> {
    let queries = Self::plan(groups, date)?;
    let cap = per_combination_cap(max_results, queries.len());
    self.events.emit(&Event::CombinationsPlanned { count: queries.len() });
    debug!(combinations = queries.len(), cap, "expanding term combinations");

    // `buffered` yields in submission order, which keeps the merge deterministic.
    let per_combination: Vec<Vec<SearchResult>> = stream::iter(queries)
      .map(|combination| self.search_one(combination, cap))
      .buffered(self.concurrency)
      .collect()
      .await;

    Ok(dedup_results(per_combination.into_iter().flatten()))
  }

  /// Searches one combination. A failure is reported and yields no results.
  async fn search_one(&self, combination: CombinationQuery, cap: usize) -> Vec<SearchResult> {
    let request = SearchRequest::new(&combination.query, cap).sort_by(SortOrder::SubmittedDate);
    match self.client.search(&request).await {
      Ok(results) => {
        self
          .events
          .emit(&Event::CombinationSearched { label: combination.label(), found: results.len() });
        results
      },
      Err(e) => {
        self
          .events
          .emit(&Event::CombinationFailed { label: combination.label(), error: e.to_string() });
        Vec::new()
      },
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::search::tests::result;

  /// Search client answering from a fixed table and recording every request.
  #[derive(Default)]
  pub(crate) struct FakeSearch {
    pub(crate) answers:  Vec<(String, Result<Vec<SearchResult>>)>,
    pub(crate) requests: Mutex<Vec<SearchRequest>>,
  }

  impl FakeSearch {
    pub(crate) fn answer(mut self, needle: &str, results: Vec<SearchResult>) -> Self {
      self.answers.push((needle.to_string(), Ok(results)));
      self
    }

    pub(crate) fn fail(mut self, needle: &str, error: GathererError) -> Self {
      self.answers.push((needle.to_string(), Err(error)));
      self
    }

    pub(crate) fn requests(&self) -> Vec<SearchRequest> { self.requests.lock().unwrap().clone() }
  }

  #[async_trait]
  impl SearchClient for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
      self.requests.lock().unwrap().push(request.clone());
      for (needle, answer) in &self.answers {
        if request.query.contains(needle.as_str()) {
          return match answer {
            Ok(results) => Ok(results.iter().take(request.max_results).cloned().collect()),
            Err(e) => Err(GathererError::ApiError(e.to_string())),
          };
        }
      }
      Ok(Vec::new())
    }
  }

  fn groups(raw: &[&[&str]]) -> Vec<TermGroup> {
    raw.iter().map(|group| TermGroup::new(group.iter().copied()).unwrap()).collect()
  }

  #[test]
  fn test_product_order_and_size() {
    let product = cartesian_product(&groups(&[&["a", "b"], &["x", "y", "z"]])).unwrap();
    assert_eq!(product.len(), 6);
    assert_eq!(product[0], ["a", "x"]);
    assert_eq!(product[1], ["a", "y"]);
    assert_eq!(product[2], ["a", "z"]);
    assert_eq!(product[3], ["b", "x"]);
    assert_eq!(product[5], ["b", "z"]);
  }

  #[test]
  fn test_product_size_is_product_of_group_sizes() {
    for shape in [vec![1], vec![3], vec![2, 2], vec![1, 4, 2], vec![3, 1, 2, 2]] {
      let groups: Vec<TermGroup> = shape
        .iter()
        .enumerate()
        .map(|(g, &n)| TermGroup::new((0..n).map(|t| format!("g{g}t{t}"))).unwrap())
        .collect();
      let expected: usize = shape.iter().product();
      assert_eq!(cartesian_product(&groups).unwrap().len(), expected, "shape {shape:?}");
    }
  }

  #[test]
  fn test_product_rejects_missing_groups() {
    assert!(matches!(cartesian_product(&[]), Err(GathererError::NoTermGroups)));
  }

  #[test]
  fn test_per_combination_cap() {
    assert_eq!(per_combination_cap(100, 4), 26);
    assert_eq!(per_combination_cap(10, 3), 4);
    assert_eq!(per_combination_cap(2, 5), 1);
    for (n, k) in [(100, 7), (1, 1), (50, 50), (7, 100)] {
      assert!(per_combination_cap(n, k) <= n.div_ceil(k) + 1);
    }
  }

  #[traced_test]
  #[tokio::test]
  async fn test_expand_issues_one_search_per_combination() {
    let client = Arc::new(FakeSearch::default());
    let expander = CombinationExpander::new(client.clone(), Arc::new(NullSink));
    let groups = groups(&[&["LLM", "VLM"], &["games", "agents", "robots"]]);

    expander.expand(&groups, 60, None).await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 6);
    for request in &requests {
      assert_eq!(request.max_results, 11);
      assert_eq!(request.sort, SortOrder::SubmittedDate);
    }
    assert_eq!(
      requests[0].query,
      "(ti:\"LLM\" AND ti:\"games\") OR (abs:\"LLM\" AND abs:\"games\")"
    );
  }

  #[traced_test]
  #[tokio::test]
  async fn test_expand_dedups_and_skips_failures() {
    let client = Arc::new(
      FakeSearch::default()
        .answer("ti:\"LLM\" AND ti:\"games\"", vec![
          result("http://arxiv.org/abs/1", "one"),
          result("http://arxiv.org/abs/2", "two"),
        ])
        .fail("ti:\"LLM\" AND ti:\"agents\"", GathererError::Status(503))
        .answer("ti:\"VLM\" AND ti:\"games\"", vec![
          result("http://arxiv.org/abs/2", "two"),
          result("http://arxiv.org/abs/3", "three"),
        ])
        .answer("ti:\"VLM\" AND ti:\"agents\"", vec![result("http://arxiv.org/abs/1", "one")]),
    );
    let sink = Arc::new(RecordingSink::default());
    let expander = CombinationExpander::new(client, sink.clone()).with_concurrency(4);
    let groups = groups(&[&["LLM", "VLM"], &["games", "agents"]]);

    let results = expander.expand(&groups, 100, None).await.unwrap();

    let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["one", "two", "three"]);
    assert_eq!(sink.count(|e| matches!(e, Event::CombinationFailed { .. })), 1);
    assert_eq!(sink.count(|e| matches!(e, Event::CombinationSearched { .. })), 3);
    assert_eq!(sink.events()[0], Event::CombinationsPlanned { count: 4 });
  }

  #[tokio::test]
  async fn test_expand_all_failures_is_empty() {
    let client = Arc::new(FakeSearch::default().fail("ti:", GathererError::Status(500)));
    let expander = CombinationExpander::new(client, Arc::new(NullSink));
    let results = expander.expand(&groups(&[&["a"], &["b"]]), 10, None).await.unwrap();
    assert!(results.is_empty());
  }

  #[tokio::test]
  async fn test_expand_applies_date_filter() {
    let client = Arc::new(FakeSearch::default());
    let expander = CombinationExpander::new(client.clone(), Arc::new(NullSink));
    let date = DateFilter::parse(Some("2025-09-21"), None).unwrap();

    expander.expand(&groups(&[&["a"], &["b"]]), 10, date.as_ref()).await.unwrap();

    assert!(client.requests()[0].query.ends_with(" AND submittedDate:[20250921 TO 20250922]"));
  }
}

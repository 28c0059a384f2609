use super::*;

#[traced_test]
#[tokio::test]
async fn test_titles_resolve_with_report() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .and(query_param_contains("search_query", "ti:Attention Is All You Need"))
    .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(&server.uri(), &[
      ("2001.00001", "Attention Is Not Explanation"),
      ("1706.03762", "Attention is all you need"),
      ("2001.00002", "All You Need Is Attention Maybe"),
    ])))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(&server.uri(), &[])))
    .mount(&server)
    .await;
  let (gatherer, sink, _storage) = create_test_gatherer(&server);

  let request =
    Request::titles(["Attention: Is All You Need", "A Paper Nobody Wrote"]).with_download(false);
  let acquired = gatherer.acquire(&request).await?;

  assert_eq!(acquired.papers.len(), 1);
  assert_eq!(acquired.papers[0].url, "http://arxiv.org/abs/1706.03762");
  let report = acquired.titles.unwrap();
  assert_eq!((report.total, report.found, report.not_found), (2, 1, 1));
  assert_eq!(sink.count(|e| matches!(e, Event::TitleProgress { .. })), 2);
  Ok(())
}

#[tokio::test]
async fn test_slow_title_lookup_times_out() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_string(atom_feed(&server.uri(), &[("1", "Too Late")]))
        .set_delay(Duration::from_secs(3)),
    )
    .mount(&server)
    .await;
  let (gatherer, _sink, _storage) = create_test_gatherer(&server);
  let config = gatherer.config().clone().with_title_timeout(Duration::from_secs(1));
  let gatherer = Gatherer::new(config)?;

  let (found, report) = gatherer.resolve_titles(&["Too Late"]).await;

  assert!(found.is_empty());
  assert_eq!(report.timed_out, 1);
  Ok(())
}

use super::*;

async fn mount_pdfs(server: &MockServer) {
  Mock::given(method("GET"))
    .and(path("/pdf/2509.00001"))
    .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_bytes("Agents playing games")))
    .mount(server)
    .await;
  Mock::given(method("GET"))
    .and(path("/pdf/2509.00002"))
    .respond_with(ResponseTemplate::new(404))
    .mount(server)
    .await;
}

#[traced_test]
#[tokio::test]
async fn test_combination_search_to_papers() -> TestResult<()> {
  let server = MockServer::start().await;
  let feed = atom_feed(&server.uri(), &[
    ("2509.00001", "Language Agents in Games"),
    ("2509.00002", "Vision Agents in Games"),
  ]);
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .and(query_param_contains("search_query", "submittedDate:[20250921 TO 20250922]"))
    .respond_with(ResponseTemplate::new(200).set_body_string(feed))
    .expect(2)
    .mount(&server)
    .await;
  mount_pdfs(&server).await;
  let (gatherer, sink, storage) = create_test_gatherer(&server);

  let groups = vec![TermGroup::parse("LLM, VLM")?, TermGroup::parse("games")?];
  let request = Request::combinations(groups)
    .with_max_results(10)
    .with_date(DateFilter::parse(Some("2025-09-21"), None)?);
  let acquired = gatherer.acquire(&request).await?;

  assert_eq!(acquired.papers.len(), 2, "both combinations return the same two papers");
  assert!(acquired.titles.is_none());

  let found = &acquired.papers[0];
  assert_eq!(found.url, "http://arxiv.org/abs/2509.00001");
  assert_eq!(found.authors, ["Grace Hopper"]);
  assert_eq!(
    found.pdf_path.as_deref(),
    Some(storage.path().join("pdfs").join("Language_Agents_in_Games.pdf").as_path())
  );
  assert!(found.pdf_text.as_deref().unwrap_or_default().contains("Agents playing games"));

  let missing = &acquired.papers[1];
  assert!(missing.pdf_path.is_none());
  assert!(missing.pdf_text.is_none());

  assert_eq!(sink.count(|e| matches!(e, Event::CombinationSearched { found: 2, .. })), 2);
  assert!(sink.retry_delays().is_empty(), "a 404 is never retried");
  Ok(())
}

#[tokio::test]
async fn test_failing_combination_is_skipped() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .and(query_param_contains("search_query", "ti:\"broken\""))
    .respond_with(ResponseTemplate::new(500))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_string(atom_feed(&server.uri(), &[("2509.00001", "Language Agents in Games")])),
    )
    .mount(&server)
    .await;
  let (gatherer, sink, _storage) = create_test_gatherer(&server);

  let groups = vec![TermGroup::parse("LLM, broken")?, TermGroup::parse("games")?];
  let request = Request::combinations(groups).with_download(false);
  let acquired = gatherer.acquire(&request).await?;

  assert_eq!(acquired.papers.len(), 1);
  assert_eq!(sink.count(|e| matches!(e, Event::CombinationFailed { .. })), 1);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_stalled_combination_is_skipped() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .and(query_param_contains("search_query", "ti:\"stalled\""))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_string(atom_feed(&server.uri(), &[("2509.00009", "Never Arrives")]))
        .set_delay(Duration::from_secs(5)),
    )
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_string(atom_feed(&server.uri(), &[("2509.00001", "Language Agents in Games")])),
    )
    .mount(&server)
    .await;
  let (gatherer, sink, _storage) = create_test_gatherer(&server);
  let config = gatherer.config().clone().with_request_timeout(Duration::from_secs(1));
  let gatherer = Gatherer::new(config)?.with_events(sink.clone());

  let groups = vec![TermGroup::parse("stalled, LLM")?, TermGroup::parse("games")?];
  let started = std::time::Instant::now();
  let acquired = gatherer.acquire(&Request::combinations(groups).with_download(false)).await?;

  assert!(started.elapsed() < Duration::from_secs(4), "took {:?}", started.elapsed());
  assert_eq!(acquired.papers.len(), 1);
  assert_eq!(acquired.papers[0].title, "Language Agents in Games");
  assert_eq!(sink.count(|e| matches!(e, Event::CombinationFailed { .. })), 1);
  assert_eq!(sink.count(|e| matches!(e, Event::CombinationSearched { .. })), 1);
  Ok(())
}

#[tokio::test]
async fn test_single_group_or_logic() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/query"))
    .and(query_param_contains("search_query", "ti:\"VLM\" OR ti:\"Games\""))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_string(atom_feed(&server.uri(), &[("2509.00003", "Playing With Pixels")])),
    )
    .expect(1)
    .mount(&server)
    .await;
  let (gatherer, _sink, _storage) = create_test_gatherer(&server);

  let request = Request::terms(TermGroup::parse("VLM, Games")?, Logic::Or).with_download(false);
  let acquired = gatherer.acquire(&request).await?;

  assert_eq!(acquired.papers[0].title, "Playing With Pixels");
  Ok(())
}

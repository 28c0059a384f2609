use super::*;

#[tokio::test]
async fn test_cached_records_download_by_arxiv_id() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/pdf/dup"))
    .respond_with(ResponseTemplate::new(404))
    .expect(1)
    .mount(&server)
    .await;
  let (gatherer, _sink, storage) = create_test_gatherer(&server);
  // The arXiv-id URL is never fetched because a valid copy is already on disk.
  let pdf_dir = storage.path().join("pdfs");
  std::fs::create_dir_all(&pdf_dir)?;
  std::fs::write(pdf_dir.join("Cached_Paper.pdf"), pdf_bytes("Cached body text"))?;

  let duplicate = format!(
    r#"{{ "title": "Duplicate", "url": "http://arxiv.org/abs/dup", "pdf_url": "{}/pdf/dup" }}"#,
    server.uri()
  );
  let records: Vec<CachedRecord> = serde_json::from_str(&format!(
    r#"[
      {{ "title": "Cached Paper", "authors": "Ada Lovelace, Charles Babbage", "arxiv_id": "1234.5678" }},
      {duplicate},
      {duplicate}
    ]"#
  ))?;
  let acquired = gatherer.acquire(&Request::cached(records)).await?;

  assert_eq!(acquired.papers.len(), 2, "records sharing a URL collapse");
  let paper = &acquired.papers[0];
  assert_eq!(paper.authors, ["Ada Lovelace", "Charles Babbage"]);
  assert_eq!(paper.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1234.5678.pdf"));
  assert!(paper.pdf_text.as_deref().unwrap_or_default().contains("Cached body text"));
  assert!(acquired.papers[1].pdf_path.is_none());
  Ok(())
}

#[tokio::test]
async fn test_cached_records_from_file() -> TestResult<()> {
  let dir = tempdir()?;
  let file = dir.path().join("papers.json");
  std::fs::write(&file, r#"[{ "title": "On File", "summary": "Stored.", "published": "2024-05-01" }]"#)?;

  let records = CachedRecord::load_all(&file)?;
  let server = MockServer::start().await;
  let (gatherer, _sink, _storage) = create_test_gatherer(&server);
  let acquired = gatherer.acquire(&Request::cached(records).with_download(false)).await?;

  assert_eq!(acquired.papers[0].summary, "Stored.");
  assert!(acquired.papers[0].published.is_some());
  assert!(Path::new(&file).exists());
  Ok(())
}

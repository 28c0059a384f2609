//! Turning search hits and cached records into finished [`Paper`]s.
//!
//! For each source the assembler downloads the PDF into the PDF directory (named after the
//! sanitized title) and extracts its text. Neither step can fail the batch: a paper whose PDF
//! cannot be fetched comes back with `pdf_path: None`, and one whose PDF yields no text comes
//! back with an empty `pdf_text`.

use futures::{stream, StreamExt};

use super::*;

/// Builds [`Paper`]s, downloading and extracting as it goes.
#[derive(Clone)]
pub struct PaperAssembler {
  /// Fetches PDFs
  downloads:   Arc<DownloadManager>,
  /// Reads PDF text
  extractor:   TextExtractor,
  /// Progress subscriber
  events:      Arc<dyn EventSink>,
  /// Where PDFs are stored
  pdf_dir:     PathBuf,
  /// Papers assembled at once
  concurrency: usize,
  /// When false, papers are assembled from metadata alone
  download:    bool,
}

impl PaperAssembler {
  /// Creates an assembler storing PDFs under `pdf_dir`.
  pub fn new(
    downloads: Arc<DownloadManager>,
    extractor: TextExtractor,
    pdf_dir: impl AsRef<Path>,
    events: Arc<dyn EventSink>,
  ) -> Self {
    Self {
      downloads,
      extractor,
      events,
      pdf_dir: pdf_dir.as_ref().to_path_buf(),
      concurrency: 1,
      download: true,
    }
  }

  /// Wires a download manager and extractor from `config`.
  pub fn from_config(config: &Config, events: Arc<dyn EventSink>) -> Result<Self> {
    let downloads = Arc::new(DownloadManager::from_config(config, events.clone())?);
    let extractor = TextExtractor::new(events.clone()).with_min_bytes(config.min_pdf_bytes);
    Ok(Self::new(downloads, extractor, &config.pdf_dir, events).with_concurrency(config.concurrency))
  }

  /// Sets how many papers are assembled at once.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  /// Skip PDFs entirely and only normalize metadata.
  pub fn metadata_only(mut self) -> Self {
    self.download = false;
    self
  }

  /// Directory PDFs are stored in.
  pub fn pdf_dir(&self) -> &Path { &self.pdf_dir }

  /// Assembles one paper. Never fails; problems show up as empty PDF fields.
  pub async fn assemble(&self, source: impl Into<PaperSource>) -> Paper {
    let source = source.into();
    let pdf_path = if self.download { self.fetch_pdf(&source).await } else { None };

    let mut paper = source.into_paper();
    if let Some(path) = pdf_path {
      let extractor = self.extractor.clone();
      let target = path.clone();
      let text = tokio::task::spawn_blocking(move || extractor.extract(&target))
        .await
        .unwrap_or_else(|e| {
          warn!(path = %path.display(), error = %e, "text extraction task failed");
          String::new()
        });
      paper.pdf_path = Some(path);
      paper.pdf_text = Some(text);
    }

    self.events.emit(&Event::PaperAssembled {
      title:      paper.title.clone(),
      has_pdf:    paper.pdf_path.is_some(),
      text_chars: paper.pdf_text.as_ref().map_or(0, |text| text.chars().count()),
    });
    paper
  }

  /// Assembles every source, preserving input order.
  pub async fn assemble_all(&self, sources: Vec<PaperSource>) -> Vec<Paper> {
    stream::iter(sources).map(|source| self.assemble(source)).buffered(self.concurrency).collect().await
  }

  /// Downloads the source's PDF, if it has one. `None` when there is nothing on disk.
  async fn fetch_pdf(&self, source: &PaperSource) -> Option<PathBuf> {
    let Some(url) = source.pdf_url() else {
      debug!(title = source.title(), "no PDF URL, skipping download");
      return None;
    };
    let path = pdf_path(&self.pdf_dir, source.title(), source.url());
    match self.downloads.download(&url, &path).await {
      Ok(path) => Some(path),
      Err(e) => {
        debug!(title = source.title(), %url, error = %e, kind = ?e.kind(), "no PDF for paper");
        None
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
  };

  use super::*;
  use crate::{extract::tests::write_pdf, search::tests::result};

  fn config(pdf_dir: &Path) -> Config {
    let mut config = Config::default()
      .with_pdf_dir(pdf_dir)
      .with_max_retries(2)
      .with_initial_delay(Duration::from_millis(5))
      .with_concurrency(3);
    config.min_pdf_bytes = 64;
    config
  }

  async fn pdf_server(dir: &Path) -> MockServer {
    let source = dir.join("source.pdf");
    write_pdf(&source, "Scaled Dot Product");
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/pdf/good"))
      .respond_with(ResponseTemplate::new(200).set_body_bytes(std::fs::read(&source).unwrap()))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/pdf/gone"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&server)
      .await;
    server
  }

  #[traced_test]
  #[tokio::test]
  async fn test_failures_degrade_per_paper() {
    let dir = tempdir().unwrap();
    let server = pdf_server(dir.path()).await;
    let pdf_dir = dir.path().join("pdfs");
    let sink = Arc::new(RecordingSink::default());
    let assembler = PaperAssembler::from_config(&config(&pdf_dir), sink.clone()).unwrap();

    let mut good = result("http://arxiv.org/abs/good", "Attention: Is All You Need");
    good.pdf_url = Some(format!("{}/pdf/good", server.uri()));
    let mut gone = result("http://arxiv.org/abs/gone", "Withdrawn Paper");
    gone.pdf_url = Some(format!("{}/pdf/gone", server.uri()));

    let papers = assembler.assemble_all(vec![good.into(), gone.into()]).await;

    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].title, "Attention: Is All You Need");
    assert_eq!(papers[0].pdf_path, Some(pdf_dir.join("Attention__Is_All_You_Need.pdf")));
    assert!(papers[0].pdf_text.as_deref().unwrap().contains("Scaled Dot Product"));

    assert_eq!(papers[1].title, "Withdrawn Paper");
    assert!(papers[1].pdf_path.is_none());
    assert!(papers[1].pdf_text.is_none());
    assert_eq!(sink.count(|e| matches!(e, Event::PaperAssembled { .. })), 2);
  }

  #[tokio::test]
  async fn test_metadata_only_never_downloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;
    let dir = tempdir().unwrap();
    let assembler =
      PaperAssembler::from_config(&config(dir.path()), Arc::new(NullSink)).unwrap().metadata_only();

    let mut live = result("http://arxiv.org/abs/1", "Metadata");
    live.pdf_url = Some(format!("{}/pdf/1", server.uri()));
    let paper = assembler.assemble(live).await;

    assert!(paper.pdf_path.is_none());
    assert_eq!(paper.url, "http://arxiv.org/abs/1");
  }

  #[tokio::test]
  async fn test_cached_record_without_pdf_url() {
    let dir = tempdir().unwrap();
    let assembler = PaperAssembler::from_config(&config(dir.path()), Arc::new(NullSink)).unwrap();
    let record = CachedRecord {
      title: "Lecture Notes".into(),
      authors: CachedAuthors::Joined("A. Author".into()),
      ..Default::default()
    };

    let paper = assembler.assemble(record).await;
    assert_eq!(paper.authors, ["A. Author"]);
    assert!(paper.pdf_url.is_none());
    assert!(paper.pdf_path.is_none());
  }

  #[tokio::test]
  async fn test_existing_pdf_is_reused() {
    let dir = tempdir().unwrap();
    let pdf_dir = dir.path().join("pdfs");
    std::fs::create_dir_all(&pdf_dir).unwrap();
    write_pdf(&pdf_dir.join("Local_Copy.pdf"), "Already Here");
    let assembler = PaperAssembler::from_config(&config(&pdf_dir), Arc::new(NullSink)).unwrap();

    let mut live = result("http://arxiv.org/abs/local", "Local Copy");
    live.pdf_url = Some("http://127.0.0.1:9/unreachable.pdf".into());
    let paper = assembler.assemble(live).await;

    assert_eq!(paper.pdf_path, Some(pdf_dir.join("Local_Copy.pdf")));
    assert!(paper.pdf_text.unwrap().contains("Already Here"));
  }
}

//! Best-effort plain-text extraction from downloaded PDFs.
//!
//! Extraction never fails. A document that cannot be opened, including one whose loading panics,
//! yields an empty string. A page whose content cannot be decoded (including one that makes the
//! parser panic) is skipped with an [`Event::PageSkipped`] while the remaining pages still
//! contribute their text.
//!
//! Parsing sits behind the [`PdfBackend`] / [`PdfDocument`] pair so the page loop can be tested
//! without real PDFs. [`LopdfBackend`] is the production implementation.

use std::panic::{self, AssertUnwindSafe};

use lopdf::Document;

use super::*;

/// Opens PDF files.
pub trait PdfBackend: Send + Sync {
  /// Parses the document at `path`.
  fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>>;
}

/// An opened PDF.
pub trait PdfDocument {
  /// One-based numbers of every page, in reading order.
  fn page_numbers(&self) -> Vec<u32>;

  /// Text content of one page.
  fn page_text(&self, page: u32) -> Result<String>;
}

/// [`PdfBackend`] built on `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
  fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>> {
    Ok(Box::new(LopdfDocument(Document::load(path)?)))
  }
}

/// Loaded `lopdf` document.
struct LopdfDocument(Document);

impl PdfDocument for LopdfDocument {
  fn page_numbers(&self) -> Vec<u32> { self.0.get_pages().into_keys().collect() }

  fn page_text(&self, page: u32) -> Result<String> { Ok(self.0.extract_text(&[page])?) }
}

/// Pulls the text out of PDFs page by page.
#[derive(Clone)]
pub struct TextExtractor {
  /// Parser used to open documents
  backend:   Arc<dyn PdfBackend>,
  /// Receives skipped pages
  events:    Arc<dyn EventSink>,
  /// Files smaller than this are not worth opening
  min_bytes: u64,
}

impl TextExtractor {
  /// Extractor backed by `lopdf`.
  pub fn new(events: Arc<dyn EventSink>) -> Self {
    Self::with_backend(Arc::new(LopdfBackend), events)
  }

  /// Extractor using a custom parser.
  pub fn with_backend(backend: Arc<dyn PdfBackend>, events: Arc<dyn EventSink>) -> Self {
    Self { backend, events, min_bytes: DEFAULT_MIN_PDF_BYTES }
  }

  /// Sets the size below which files are not opened.
  pub fn with_min_bytes(mut self, min_bytes: u64) -> Self {
    self.min_bytes = min_bytes;
    self
  }

  /// Concatenated text of every readable page of the PDF at `path`.
  ///
  /// Returns an empty string when the file is missing, undersized, or not a readable PDF.
  pub fn extract(&self, path: &Path) -> String {
    match std::fs::metadata(path) {
      Ok(meta) if meta.len() >= self.min_bytes => {},
      Ok(meta) => {
        warn!(path = %path.display(), size = meta.len(), "PDF too small to extract, likely corrupt");
        return String::new();
      },
      Err(e) => {
        debug!(path = %path.display(), error = %e, "no PDF to extract");
        return String::new();
      },
    }

    // Malformed files can make the parser panic while loading; treat that like any open failure.
    let error = match panic::catch_unwind(AssertUnwindSafe(|| self.backend.open(path))) {
      Ok(Ok(document)) => return self.pages_text(path, document.as_ref()),
      Ok(Err(e)) => e.to_string(),
      Err(payload) => panic_message(payload.as_ref()),
    };
    warn!(path = %path.display(), %error, "could not open PDF");
    String::new()
  }

  /// Concatenates the readable pages of an opened document.
  fn pages_text(&self, path: &Path, document: &dyn PdfDocument) -> String {
    let mut text = String::new();
    for page in document.page_numbers() {
      // Malformed content streams can make the parser panic; contain that to the one page.
      let outcome = panic::catch_unwind(AssertUnwindSafe(|| document.page_text(page)));
      let error = match outcome {
        Ok(Ok(page_text)) => {
          text.push_str(&page_text);
          continue;
        },
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
      };
      self.events.emit(&Event::PageSkipped { path: path.to_path_buf(), page, error });
    }

    trace!(path = %path.display(), chars = text.len(), "extracted PDF text");
    text
  }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "PDF parser panicked".to_string()
  }
}

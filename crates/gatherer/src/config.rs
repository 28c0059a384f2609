//! Runtime configuration for the acquisition pipeline.
//!
//! Configuration is read from a TOML file. Every field has a default, so an absent file or a
//! partial file are both fine:
//!
//! ```toml
//! pdf_dir = "papers"
//! max_retries = 3
//! title_timeout_secs = 10
//! ```

use super::*;

/// Default search endpoint (arXiv's Atom API).
pub const DEFAULT_API_URL: &str = "http://export.arxiv.org/api/query";

/// Files below this many bytes are treated as failed downloads.
pub const DEFAULT_MIN_PDF_BYTES: u64 = 1024;

/// Upper bound for any configured delay or interval, in seconds.
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Browser-like agent string sent with PDF requests; some mirrors refuse unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/91.0.4472.124 Safari/537.36";

/// Settings shared by every component of a [`Gatherer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Search service endpoint
  pub api_url:              String,
  /// Number of results requested per page from the search service
  pub page_size:            usize,
  /// Directory PDFs are written into
  pub pdf_dir:              PathBuf,
  /// Total download attempts before a transient failure is final
  pub max_retries:          u32,
  /// Backoff base in seconds; attempt `n` waits `initial_delay_secs * 2^n`
  pub initial_delay_secs:   f64,
  /// Files below this size are considered corrupt
  pub min_pdf_bytes:        u64,
  /// Deadline for a single title lookup
  pub title_timeout_secs:   u64,
  /// Candidates fetched per title lookup
  pub title_candidates:     usize,
  /// Maximum independent searches or downloads in flight at once
  pub concurrency:          usize,
  /// User-Agent header for PDF requests
  pub user_agent:           String,
  /// Per-request transport timeout for searches and downloads
  pub request_timeout_secs: u64,
  /// Minimum spacing between two requests to the search service
  pub search_interval_secs: f64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url:              DEFAULT_API_URL.to_string(),
      page_size:            100,
      pdf_dir:              PathBuf::from("pdfs"),
      max_retries:          5,
      initial_delay_secs:   2.0,
      min_pdf_bytes:        DEFAULT_MIN_PDF_BYTES,
      title_timeout_secs:   30,
      title_candidates:     20,
      concurrency:          4,
      user_agent:           DEFAULT_USER_AGENT.to_string(),
      request_timeout_secs: 60,
      search_interval_secs: 3.0,
    }
  }
}

impl Config {
  /// Returns the default location of the configuration file.
  ///
  /// - On Unix: `~/.config/gatherer/config.toml`
  /// - On macOS: `~/Library/Application Support/gatherer/config.toml`
  /// - On Windows: `%APPDATA%\gatherer\config.toml`
  /// - Fallback: `./gatherer/config.toml`
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("gatherer").join("config.toml")
  }

  /// Loads configuration from `path`, falling back to defaults when the file does not exist.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.exists() {
      debug!("No config at {}, using defaults", path.display());
      return Ok(Self::default());
    }
    let content = std::fs::read_to_string(path)?;
    let config: Self = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
  }

  /// Rejects values that would make the pipeline misbehave.
  pub fn validate(&self) -> Result<()> {
    if self.page_size == 0 {
      return Err(GathererError::Config("page_size must be positive".into()));
    }
    if self.concurrency == 0 {
      return Err(GathererError::Config("concurrency must be positive".into()));
    }
    if self.max_retries == 0 {
      return Err(GathererError::Config("max_retries must be at least 1".into()));
    }
    if self.request_timeout_secs == 0 {
      return Err(GathererError::Config("request_timeout_secs must be positive".into()));
    }
    for (name, secs) in
      [("initial_delay_secs", self.initial_delay_secs), ("search_interval_secs", self.search_interval_secs)]
    {
      if !(0.0..=MAX_DELAY_SECS).contains(&secs) {
        return Err(GathererError::Config(format!("{name} must be between 0 and {MAX_DELAY_SECS}")));
      }
    }
    Ok(())
  }

  /// Sets the search service endpoint.
  pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
    self.api_url = api_url.into();
    self
  }

  /// Sets the directory PDFs are written into.
  pub fn with_pdf_dir(mut self, pdf_dir: impl AsRef<Path>) -> Self {
    self.pdf_dir = pdf_dir.as_ref().to_path_buf();
    self
  }

  /// Sets how many results are requested per search page.
  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size;
    self
  }

  /// Sets the total number of download attempts.
  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  /// Sets the backoff base.
  pub fn with_initial_delay(mut self, delay: Duration) -> Self {
    self.initial_delay_secs = delay.as_secs_f64();
    self
  }

  /// Sets the title lookup deadline, rounded down to whole seconds (at least one).
  pub fn with_title_timeout(mut self, timeout: Duration) -> Self {
    self.title_timeout_secs = timeout.as_secs().max(1);
    self
  }

  /// Sets how many searches or downloads may run at once.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency;
    self
  }

  /// Sets the transport timeout, rounded down to whole seconds (at least one).
  pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
    self.request_timeout_secs = timeout.as_secs().max(1);
    self
  }

  /// Sets the minimum spacing between search requests.
  pub fn with_search_interval(mut self, interval: Duration) -> Self {
    self.search_interval_secs = interval.as_secs_f64();
    self
  }

  /// Backoff base as a [`Duration`].
  pub fn initial_delay(&self) -> Duration { secs_to_duration(self.initial_delay_secs) }

  /// Search request spacing as a [`Duration`].
  pub fn search_interval(&self) -> Duration { secs_to_duration(self.search_interval_secs) }

  /// Title lookup deadline as a [`Duration`].
  pub fn title_timeout(&self) -> Duration { Duration::from_secs(self.title_timeout_secs) }

  /// Transport timeout as a [`Duration`].
  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

/// Converts seconds to a [`Duration`], clamping values `validate` would reject.
fn secs_to_duration(secs: f64) -> Duration {
  if secs.is_nan() {
    return Duration::ZERO;
  }
  Duration::from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load(dir.path().join("nope.toml")).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.pdf_dir, PathBuf::from("pdfs"));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.min_pdf_bytes, 1024);
    assert_eq!(config.search_interval(), Duration::from_secs(3));
  }

  #[test]
  fn test_partial_file_overrides() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "max_retries = 3\ntitle_timeout_secs = 10\npdf_dir = \"papers\"\n")
      .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.title_timeout(), Duration::from_secs(10));
    assert_eq!(config.pdf_dir, PathBuf::from("papers"));
    assert_eq!(config.page_size, 100);
  }

  #[test]
  fn test_invalid_values_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "concurrency = 0\n").unwrap();
    assert!(matches!(Config::load(&path), Err(GathererError::Config(_))));

    std::fs::write(&path, "max_retries = \"lots\"\n").unwrap();
    assert!(matches!(Config::load(&path), Err(GathererError::TomlDe(_))));
  }

  #[test]
  fn test_huge_delays_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "initial_delay_secs = 1e20\n").unwrap();
    match Config::load(&path) {
      Err(GathererError::Config(msg)) => assert!(msg.contains("initial_delay_secs"), "{msg}"),
      other => panic!("expected a config error, got {other:?}"),
    }

    std::fs::write(&path, "search_interval_secs = -1.0\n").unwrap();
    assert!(matches!(Config::load(&path), Err(GathererError::Config(_))));

    let config = Config { initial_delay_secs: 1e20, ..Config::default() };
    assert_eq!(config.initial_delay(), Duration::from_secs_f64(MAX_DELAY_SECS));
  }
}

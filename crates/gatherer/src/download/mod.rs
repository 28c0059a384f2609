//! Resilient PDF downloads.
//!
//! Every download is a small state machine, tracked by a [`DownloadTask`]:
//!
//! ```text
//! Pending ──▶ Downloading ──▶ Succeeded
//!                 │  ▲   ├──▶ Failed           (404, or retries exhausted)
//!                 │  │   └──▶ Corrupt ──▶ Pending   (once; a second time is Failed)
//!                 ▼  │
//!           RetryScheduled                     (waits initial_delay * 2^attempt)
//! ```
//!
//! Bodies are streamed into a `.part` file next to the target and renamed into place once the
//! transfer completes, then the size is checked. A valid file already at the target path short
//! circuits straight to `Succeeded` without touching the network. Downloads to the same path are
//! serialized through a per-path lock; downloads to different paths, including their backoff
//! sleeps, never wait on each other.
//!
//! # Examples
//!
//! ```no_run
//! use std::{path::Path, sync::Arc};
//!
//! use gatherer::{download::DownloadManager, event::TracingSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = DownloadManager::new(Arc::new(TracingSink))?;
//! let path = manager
//!   .download("https://arxiv.org/pdf/1706.03762", Path::new("pdfs/Attention.pdf"))
//!   .await?;
//! println!("saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, sync::Mutex};

use futures::StreamExt;
use reqwest::StatusCode;
use tokio::{
  fs::{self, File},
  io::{AsyncWriteExt, BufWriter},
  sync::{Mutex as AsyncMutex, OwnedMutexGuard},
};

use super::*;

pub mod filename;

pub use self::filename::*;

/// Where a [`DownloadTask`] currently is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
  /// Ready to start a fresh fetch
  Pending,
  /// A fetch is in flight
  Downloading,
  /// Waiting out a backoff delay before the next fetch
  RetryScheduled {
    /// How long the task sleeps
    delay: Duration,
  },
  /// The fetched file is undersized and is about to be deleted
  Corrupt {
    /// Observed file size in bytes
    size: u64,
  },
  /// The file is in place and valid. Terminal.
  Succeeded,
  /// The task gave up. Terminal.
  Failed,
}

impl DownloadState {
  /// Whether no further transitions can happen.
  pub fn is_terminal(&self) -> bool {
    matches!(self, DownloadState::Succeeded | DownloadState::Failed)
  }
}

/// One download in progress.
#[derive(Debug, Clone)]
pub struct DownloadTask {
  /// Source URL
  pub url:         String,
  /// Final location of the file
  pub output:      PathBuf,
  /// Transient failures so far in the current round
  pub attempt:     u32,
  /// Current state
  pub state:       DownloadState,
  /// Whether the one corruption re-attempt has been used
  corrupt_retried: bool,
  /// Every state visited, in order
  history:         Vec<DownloadState>,
}

impl DownloadTask {
  /// A pending task fetching `url` into `output`.
  pub fn new(url: impl Into<String>, output: impl AsRef<Path>) -> Self {
    Self {
      url:             url.into(),
      output:          output.as_ref().to_path_buf(),
      attempt:         0,
      state:           DownloadState::Pending,
      corrupt_retried: false,
      history:         vec![DownloadState::Pending],
    }
  }

  /// States visited so far, starting with `Pending`.
  pub fn history(&self) -> &[DownloadState] { &self.history }

  /// Moves to `next` and records it.
  fn transition(&mut self, next: DownloadState) {
    trace!(url = %self.url, from = ?self.state, to = ?next, "download transition");
    self.history.push(next.clone());
    self.state = next;
  }
}

/// Fetches PDFs with retry, backoff and corruption checks.
pub struct DownloadManager {
  /// Shared HTTP client carrying the configured agent and timeout.
  client:        reqwest::Client,
  /// Total fetch attempts per round before giving up
  max_retries:   u32,
  /// Backoff base
  initial_delay: Duration,
  /// Files smaller than this are corrupt
  min_bytes:     u64,
  /// Progress subscriber
  events:        Arc<dyn EventSink>,
  /// One lock per output path, so two tasks never write the same file.
  locks:         Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl DownloadManager {
  /// Creates a manager with the default configuration.
  pub fn new(events: Arc<dyn EventSink>) -> Result<Self> {
    Self::from_config(&Config::default(), events)
  }

  /// Creates a manager using the retry, size and HTTP settings from `config`.
  pub fn from_config(config: &Config, events: Arc<dyn EventSink>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(config.user_agent.as_str())
      .timeout(config.request_timeout())
      .build()?;
    Ok(Self {
      client,
      max_retries: config.max_retries.max(1),
      initial_delay: config.initial_delay(),
      min_bytes: config.min_pdf_bytes,
      events,
      locks: Mutex::new(HashMap::new()),
    })
  }

  /// Sets the total number of fetch attempts.
  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries.max(1);
    self
  }

  /// Sets the backoff base.
  pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
    self.initial_delay = initial_delay;
    self
  }

  /// Sets the size below which a file is corrupt.
  pub fn with_min_bytes(mut self, min_bytes: u64) -> Self {
    self.min_bytes = min_bytes;
    self
  }

  /// Delay before the retry that follows failed attempt number `attempt` (zero based).
  pub fn backoff(&self, attempt: u32) -> Duration {
    self.initial_delay.saturating_mul(2u32.saturating_pow(attempt))
  }

  /// Downloads `url` to `output`, returning the path of the validated file.
  pub async fn download(&self, url: &str, output: &Path) -> Result<PathBuf> {
    let mut task = DownloadTask::new(url, output);
    self.run(&mut task).await
  }

  /// Drives `task` to a terminal state.
  pub async fn run(&self, task: &mut DownloadTask) -> Result<PathBuf> {
    let _guard = self.lock_path(&task.output).await;

    if let Some(parent) = task.output.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).await?;
    }

    match fs::metadata(&task.output).await {
      Ok(meta) if meta.is_file() && meta.len() >= self.min_bytes => {
        debug!(path = %task.output.display(), "PDF already present, skipping download");
        self.events.emit(&Event::DownloadSkipped { path: task.output.clone() });
        task.transition(DownloadState::Succeeded);
        return Ok(task.output.clone());
      },
      Ok(meta) if meta.is_file() => {
        // A leftover from an earlier run; start over rather than trust it.
        self.remove_corrupt(&task.output, meta.len()).await;
      },
      _ => {},
    }

    let mut last_error: Option<GathererError> = None;
    loop {
      match task.state.clone() {
        DownloadState::Pending => task.transition(DownloadState::Downloading),
        DownloadState::Downloading => {
          self.events.emit(&Event::DownloadStarted {
            url:     task.url.clone(),
            path:    task.output.clone(),
            attempt: task.attempt + 1,
          });
          match self.fetch(&task.url, &task.output).await {
            Ok(size) if size >= self.min_bytes => {
              self.events.emit(&Event::DownloadSucceeded { path: task.output.clone(), bytes: size });
              task.transition(DownloadState::Succeeded);
            },
            Ok(size) => task.transition(DownloadState::Corrupt { size }),
            Err(e) if e.is_not_found() => {
              debug!(url = %task.url, "resource does not exist");
              last_error = Some(e);
              task.transition(DownloadState::Failed);
            },
            Err(e) if task.attempt + 1 >= self.max_retries => {
              last_error = Some(e);
              task.transition(DownloadState::Failed);
            },
            Err(e) => {
              let delay = self.backoff(task.attempt);
              task.attempt += 1;
              self.events.emit(&Event::RetryScheduled {
                url: task.url.clone(),
                attempt: task.attempt,
                delay,
                error: e.to_string(),
              });
              last_error = Some(e);
              task.transition(DownloadState::RetryScheduled { delay });
            },
          }
        },
        DownloadState::RetryScheduled { delay } => {
          tokio::time::sleep(delay).await;
          task.transition(DownloadState::Downloading);
        },
        DownloadState::Corrupt { size } => {
          self.remove_corrupt(&task.output, size).await;
          if task.corrupt_retried {
            last_error = Some(GathererError::Corrupt { path: task.output.clone(), size });
            task.transition(DownloadState::Failed);
          } else {
            task.corrupt_retried = true;
            task.attempt = 0;
            task.transition(DownloadState::Pending);
          }
        },
        DownloadState::Succeeded => return Ok(task.output.clone()),
        DownloadState::Failed => {
          let error = last_error.take().unwrap_or(GathererError::NotFound);
          self.events.emit(&Event::DownloadFailed { url: task.url.clone(), error: error.to_string() });
          return Err(error);
        },
      }
    }
  }

  /// Performs one streamed fetch into `output`, returning the size of the written file.
  async fn fetch(&self, url: &str, output: &Path) -> Result<u64> {
    let response = self.client.get(url).send().await?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Err(GathererError::NotFound);
    }
    if !status.is_success() {
      trace!(%url, ?response, "unsuccessful PDF response");
      return Err(GathererError::Status(status.as_u16()));
    }

    let partial = partial_path(output);
    match stream_to_file(response, &partial).await {
      Ok(_) => {
        fs::rename(&partial, output).await?;
        Ok(fs::metadata(output).await?.len())
      },
      Err(e) => {
        let _ = fs::remove_file(&partial).await;
        Err(e)
      },
    }
  }

  /// Deletes an undersized file and reports it.
  async fn remove_corrupt(&self, path: &Path, size: u64) {
    match fs::remove_file(path).await {
      Ok(()) => self.events.emit(&Event::CorruptFileRemoved { path: path.to_path_buf(), size }),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
      Err(e) => warn!(path = %path.display(), error = %e, "could not remove corrupt file"),
    }
  }

  /// Waits for exclusive use of `path`.
  async fn lock_path(&self, path: &Path) -> OwnedMutexGuard<()> {
    let lock = {
      let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
      locks.entry(path.to_path_buf()).or_default().clone()
    };
    lock.lock_owned().await
  }
}

/// Sibling path the body is streamed into before it is moved into place.
fn partial_path(output: &Path) -> PathBuf {
  let mut name = output.as_os_str().to_owned();
  name.push(".part");
  PathBuf::from(name)
}

/// Streams a response body to `path`, returning bytes written.
async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<u64> {
  let mut writer = BufWriter::new(File::create(path).await?);
  let mut stream = response.bytes_stream();
  let mut written: u64 = 0;

  while let Some(chunk) = stream.next().await {
    let chunk = chunk?;
    writer.write_all(&chunk).await?;
    written += chunk.len() as u64;
  }

  writer.flush().await?;
  Ok(written)
}

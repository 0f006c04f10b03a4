//! Core downloader implementation split into focused submodules.
//!
//! The `Mp3Downloader` struct and its methods are organized by domain:
//! - `queue` - Task submission and queue observation
//! - `queue_processor` - Admission loop and concurrency limiting
//! - `download_task` - Per-task state machine execution
//! - `control` - Cancellation and shutdown coordination

mod control;
mod download_task;
mod queue;
mod queue_processor;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::{HttpMediaProvider, MediaProvider};
use crate::transcoder::{FfmpegTranscoder, Transcoder};
use crate::types::{Event, Task};

/// Watch URL prefix recorded in result records
pub(crate) const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Queue and task state management
#[derive(Clone)]
pub(crate) struct QueueState {
    /// FIFO queue of pending tasks (protected by Mutex)
    pub(crate) queue: Arc<tokio::sync::Mutex<VecDeque<Task>>>,
    /// Semaphore enforcing the `queue_parallelism` ceiling
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Number of tasks currently running an orchestration
    pub(crate) running: Arc<AtomicUsize>,
    /// Map of active tasks to their cancellation tokens
    pub(crate) active_tasks:
        Arc<tokio::sync::Mutex<HashMap<String, tokio_util::sync::CancellationToken>>>,
    /// Flag indicating whether new tasks are accepted (cleared during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// An explicit bounded-concurrency scheduler value owned by the application.
/// Consumers submit tasks and subscribe to [`Event`]s; there is no polling
/// surface beyond [`queue_stats`](Mp3Downloader::queue_stats).
#[derive(Clone)]
pub struct Mp3Downloader {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Metadata/stream provider (trait object for pluggable implementations)
    pub(crate) provider: Arc<dyn MediaProvider>,
    /// Transcoding engine (trait object for pluggable implementations)
    pub(crate) transcoder: Arc<dyn Transcoder>,
    /// Queue and task state management
    pub(crate) queue_state: QueueState,
}

impl std::fmt::Debug for Mp3Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mp3Downloader").finish_non_exhaustive()
    }
}

impl Mp3Downloader {
    /// Create a new downloader with the bundled collaborators
    ///
    /// This initializes the HTTP metadata/stream provider (which requires
    /// `request.metadata_url`) and the ffmpeg transcoder, creates the output
    /// directory, and starts the queue processor.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid, the metadata URL
    /// is missing or malformed, the ffmpeg binary cannot be located, or the
    /// output directory cannot be created.
    pub async fn new(config: Config) -> Result<Self> {
        let metadata_url = config
            .request
            .metadata_url
            .clone()
            .ok_or_else(|| Error::Config {
                message: "request.metadata_url is required for the bundled HTTP provider"
                    .to_string(),
                key: Some("request.metadata_url".to_string()),
            })?;
        let provider = Arc::new(HttpMediaProvider::new(&metadata_url, &config.request)?);
        let transcoder = Arc::new(FfmpegTranscoder::from_config(&config.tools)?);
        Self::with_collaborators(config, provider, transcoder).await
    }

    /// Create a downloader with explicit provider and transcoder
    /// implementations
    ///
    /// This is the injection seam used by applications with their own
    /// resolver integrations, and by tests.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the output
    /// directory cannot be created.
    pub async fn with_collaborators(
        config: Config,
        provider: Arc<dyn MediaProvider>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.download.output_dir.display(),
                        e
                    ),
                ))
            })?;

        // Broadcast channel so multiple subscribers receive all events
        // independently.
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let queue_state = QueueState {
            queue: Arc::new(tokio::sync::Mutex::new(VecDeque::new())),
            concurrent_limit: Arc::new(tokio::sync::Semaphore::new(
                config.download.queue_parallelism,
            )),
            running: Arc::new(AtomicUsize::new(0)),
            active_tasks: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        let downloader = Self {
            event_tx,
            config: Arc::new(config),
            provider,
            transcoder,
            queue_state,
        };

        // The processor loop exits when the semaphore is closed at shutdown.
        downloader.start_queue_processor();

        Ok(downloader)
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently. Events are buffered, but if a subscriber falls behind by
    /// more than the channel capacity it will receive a `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped
    /// (ok() converts Err to None). Emission is fire-and-forget; subscribers
    /// exert no backpressure on the pipeline.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

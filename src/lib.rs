//! # ytmp3-dl
//!
//! An embeddable, event-driven YouTube-to-MP3 download manager.
//!
//! The library resolves a video ID to stream metadata, selects the best
//! matching stream variant, transfers the bytes, and transcodes them to an
//! ID3-tagged MP3 — all behind a FIFO queue with a configurable concurrency
//! ceiling. Consumers observe everything through a broadcast event stream:
//! queue depth, byte-level progress, intermediate-file deletions, and exactly
//! one terminal event per task.
//!
//! ## Quick start
//!
//! ```no_run
//! use ytmp3_dl::{Config, Event, Mp3Downloader, TaskOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.request.metadata_url = Some("https://resolver.example/api/videos".into());
//!     config.download.queue_parallelism = 2;
//!
//!     let downloader = Mp3Downloader::new(config).await?;
//!     let mut events = downloader.subscribe();
//!
//!     downloader.submit("dQw4w9WgXcQ", TaskOptions::default()).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             Event::Progress { video_id, progress, .. } => {
//!                 println!("{}: {:.1}%", video_id, progress.percentage);
//!             }
//!             Event::TaskFinished { result } => {
//!                 println!("done: {}", result.file.display());
//!                 break;
//!             }
//!             Event::TaskFailed { video_id, error, .. } => {
//!                 eprintln!("{} failed: {}", video_id, error);
//!                 break;
//!             }
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`downloader`] - Queue, admission loop, and the per-task state machine
//! - [`selector`] - Pure stream-variant selection and branch routing
//! - [`progress`] - Byte-transfer progress aggregation
//! - [`provider`] - Metadata and stream retrieval seam ([`MediaProvider`])
//! - [`transcoder`] - Transcoding engine seam ([`Transcoder`])
//! - [`naming`] - Title sanitization and artist/title parsing

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod config;
pub mod downloader;
pub mod error;
pub mod naming;
pub mod progress;
pub mod provider;
pub mod selector;
pub mod transcoder;
pub mod types;

pub use config::{Config, DownloadConfig, RequestConfig, ToolsConfig};
pub use downloader::Mp3Downloader;
pub use error::{Error, Result, TransferError, TranscodeError};
pub use progress::{ProgressStream, ProgressTracker};
pub use provider::{HttpMediaProvider, MediaProvider, MediaStream};
pub use selector::{
    FALLBACK_AUDIO_BITRATE_KBPS, LONG_FORM_THRESHOLD_MINS, Route, Selection, select_variant,
};
pub use transcoder::{FfmpegTranscoder, TranscodeInput, TranscodeJob, Transcoder};
pub use types::{
    Container, Event, ProgressSample, QueueStats, Quality, ResultRecord, StreamVariant, Task,
    TaskOptions, TransferStats, VideoMetadata,
};

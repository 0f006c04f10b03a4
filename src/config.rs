//! Configuration types for ytmp3-dl

use crate::error::{Error, Result};
use crate::types::Quality;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Download behavior configuration (output directory, concurrency, progress)
///
/// Groups settings related to how tasks are fetched, converted, and reported.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Default stream quality selector (default: highestaudio)
    #[serde(default)]
    pub quality: Quality,

    /// Output directory for produced files (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum concurrent tasks (default: 1, must be >= 1)
    #[serde(default = "default_queue_parallelism")]
    pub queue_parallelism: usize,

    /// Progress sampling interval in milliseconds (default: 1000)
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Admit WebM variants in addition to MP4 (default: false)
    #[serde(default)]
    pub allow_webm: bool,

    /// Extra output options appended to the transcoder invocation
    #[serde(default)]
    pub output_options: Vec<String>,
}

impl DownloadConfig {
    /// Progress sampling interval as a [`Duration`]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            output_dir: default_output_dir(),
            queue_parallelism: default_queue_parallelism(),
            progress_interval_ms: default_progress_interval_ms(),
            allow_webm: false,
            output_options: Vec::new(),
        }
    }
}

/// Transport options for the metadata/stream provider
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Base URL of the metadata resolver endpoint (required for the bundled
    /// HTTP provider; custom providers may ignore it)
    #[serde(default)]
    pub metadata_url: Option<String>,

    /// Maximum redirects followed per request (default: 5)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            metadata_url: None,
            max_redirects: default_max_redirects(),
        }
    }
}

/// External tool paths and codec configuration
///
/// Groups settings for the ffmpeg binary and encoder selection.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Search PATH for ffmpeg when no explicit path is configured (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Audio encoder passed to ffmpeg (default: "libmp3lame")
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
            audio_codec: default_audio_codec(),
        }
    }
}

/// Top-level configuration for [`Mp3Downloader`](crate::Mp3Downloader)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Transport options
    #[serde(default)]
    pub request: RequestConfig,

    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Validate settings that have hard constraints
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `queue_parallelism` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.download.queue_parallelism == 0 {
            return Err(Error::Config {
                message: "queue_parallelism must be at least 1".to_string(),
                key: Some("download.queue_parallelism".to_string()),
            });
        }
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_queue_parallelism() -> usize {
    1
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_max_redirects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_audio_codec() -> String {
    "libmp3lame".to_string()
}

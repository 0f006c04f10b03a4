//! Core types for ytmp3-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One caller-submitted request to acquire and convert one remote media item.
///
/// Immutable after enqueue; owned by the queue until dequeued, then by the
/// task routine for its lifetime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    /// Opaque video identifier (e.g., the 11-character YouTube ID)
    pub video_id: String,
    /// Explicit output base name; derived from the video title when absent
    #[serde(default)]
    pub file_name: Option<String>,
    /// Per-task option overrides
    #[serde(default)]
    pub options: TaskOptions,
}

/// Per-task option overrides recognized by [`submit`](crate::Mp3Downloader::submit)
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Stream quality override for this task only
    #[serde(default)]
    pub quality: Option<Quality>,
}

/// Stream quality selector
///
/// Mirrors the selectors accepted by common stream-info providers. The
/// explicit audio/video/combined selectors also re-derive the variant filter
/// category during selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// Highest available audio bitrate (default)
    #[default]
    #[serde(rename = "highestaudio")]
    HighestAudio,
    /// Lowest available audio bitrate
    #[serde(rename = "lowestaudio")]
    LowestAudio,
    /// Highest available video bitrate
    #[serde(rename = "highestvideo")]
    HighestVideo,
    /// Lowest available video bitrate
    #[serde(rename = "lowestvideo")]
    LowestVideo,
    /// Highest overall bitrate among combined audio+video variants
    #[serde(rename = "highest")]
    Highest,
    /// Lowest overall bitrate among combined audio+video variants
    #[serde(rename = "lowest")]
    Lowest,
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Quality::HighestAudio => "highestaudio",
            Quality::LowestAudio => "lowestaudio",
            Quality::HighestVideo => "highestvideo",
            Quality::LowestVideo => "lowestvideo",
            Quality::Highest => "highest",
            Quality::Lowest => "lowest",
        };
        write!(f, "{}", name)
    }
}

/// Media container advertised by a stream variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// MP4 container (the default container filter)
    Mp4,
    /// WebM container (admitted when `allow_webm` is set)
    Webm,
    /// Anything else the provider advertises
    #[serde(other)]
    Other,
}

impl Container {
    /// File extension used for a staged intermediate file in this container
    pub fn extension(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
            Container::Other => "bin",
        }
    }
}

/// One available encoding/container combination for a media item,
/// as advertised by metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Direct URL of this variant's byte stream
    pub url: String,
    /// Container type
    pub container: Container,
    /// Audio bitrate in kbps, when the variant carries audio
    #[serde(default)]
    pub audio_bitrate: Option<u32>,
    /// Overall bitrate in bps, when advertised (used for video/combined ranking)
    #[serde(default)]
    pub bitrate: Option<u64>,
    /// Whether the variant carries an audio track
    #[serde(default)]
    pub has_audio: bool,
    /// Whether the variant carries a video track
    #[serde(default)]
    pub has_video: bool,
}

/// Remote media metadata, fetched once per task and read-only afterward
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Opaque video identifier
    pub video_id: String,
    /// Raw video title (sanitized before any filesystem use)
    pub title: String,
    /// Duration in seconds
    pub duration_secs: u64,
    /// Thumbnail URLs, best first
    #[serde(default)]
    pub thumbnails: Vec<String>,
    /// Available stream variants
    #[serde(default)]
    pub variants: Vec<StreamVariant>,
}

impl VideoMetadata {
    /// First advertised thumbnail URL, if any
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnails.first().map(String::as_str)
    }
}

/// Normalized byte-transfer progress, recomputed each sampling tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Progress percentage in [0, 100]
    pub percentage: f64,
    /// Bytes transferred so far
    pub transferred: u64,
    /// Declared total length in bytes (0 when unknown)
    pub length: u64,
    /// Bytes remaining (0 when the length is unknown)
    pub remaining: u64,
    /// Estimated seconds until completion (0 when it cannot be estimated)
    pub eta_secs: u64,
    /// Elapsed seconds since the transfer started
    pub runtime_secs: u64,
    /// Bytes transferred since the previous sample
    pub delta: u64,
    /// Instantaneous speed in bytes per second
    pub speed_bps: f64,
}

impl ProgressSample {
    /// Synthetic sample carrying only a percentage (used for the fixed
    /// 0/50/100 milestones of the staged branch)
    pub fn at_percentage(percentage: f64) -> Self {
        Self {
            percentage,
            transferred: 0,
            length: 0,
            remaining: 0,
            eta_secs: 0,
            runtime_secs: 0,
            delta: 0,
            speed_bps: 0.0,
        }
    }
}

/// Transfer statistics captured when the streaming branch reaches 100%
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Total bytes transferred
    pub transferred_bytes: u64,
    /// Transfer runtime in seconds
    pub runtime_secs: u64,
    /// Average speed in bytes per second, rounded to 2 decimal places
    pub average_speed_bps: f64,
}

/// Final structured outcome of a successful task
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Opaque video identifier
    pub video_id: String,
    /// Full path of the produced file
    pub file: PathBuf,
    /// Source watch URL
    pub youtube_url: String,
    /// Sanitized, underscore-normalized video title
    pub video_title: String,
    /// Artist parsed from the title (placeholder "Unknown" when absent)
    pub artist: String,
    /// Title parsed from the video title
    pub title: String,
    /// Thumbnail URL, when advertised
    pub thumbnail: Option<String>,
    /// File name of the produced file (without directory)
    pub file_name: String,
    /// Transfer statistics (streaming branch only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TransferStats>,
}

/// Snapshot of queue occupancy; observed, never mutated by callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks currently running an orchestration
    pub running: usize,
    /// Tasks waiting for admission
    pub pending: usize,
}

/// Event emitted during the task lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Queue depth changed (running + pending), emitted on admission and completion
    QueueSize {
        /// Running + pending task count
        count: usize,
    },

    /// Progress update for one task
    Progress {
        /// Video identifier
        video_id: String,
        /// Current progress sample
        progress: ProgressSample,
        /// Output file name the task is producing
        file_name: String,
        /// Metadata of the item being processed
        metadata: VideoMetadata,
    },

    /// Intent to delete an intermediate or partial file
    Delete {
        /// Video identifier
        video_id: String,
        /// Progress at the moment of deletion (always 0, kept for payload parity)
        progress: f64,
        /// Output file name of the task
        file_name: String,
        /// Staged intermediate file, when one exists
        #[serde(skip_serializing_if = "Option::is_none")]
        video_file_name: Option<String>,
        /// Metadata of the item being processed
        metadata: VideoMetadata,
    },

    /// Task reached the failed terminal state
    TaskFailed {
        /// Video identifier
        video_id: String,
        /// Error description
        error: String,
        /// Intended output file name, when it was already derived
        #[serde(skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },

    /// Task reached the successful terminal state
    TaskFinished {
        /// Final result record
        result: ResultRecord,
    },

    /// The downloader is shutting down
    Shutdown,
}

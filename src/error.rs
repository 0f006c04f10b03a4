//! Error types for ytmp3-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Transfer, Transcode)
//! - Context information (video ID, file path, stage)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ytmp3-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ytmp3-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "queue_parallelism")
        key: Option<String>,
    },

    /// Metadata retrieval failed (no network metadata obtainable for the video ID)
    #[error("metadata fetch failed for {video_id}: {reason}")]
    Metadata {
        /// The video ID whose metadata could not be retrieved
        video_id: String,
        /// Underlying provider failure
        reason: String,
    },

    /// No stream variant matched the requested quality/container preferences
    #[error("no matching stream variant for {video_id} with quality {quality}")]
    NoMatchingVariant {
        /// The video ID being selected for
        video_id: String,
        /// The effective quality preference in use
        quality: String,
    },

    /// Byte transfer from the remote stream failed
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Transcoding engine failed
    #[error("transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// Deleting an intermediate file failed (never masks the primary task error)
    #[error("cleanup failed for {path}: {reason}")]
    Cleanup {
        /// Path of the file that could not be removed
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Task not found in the queue or among active tasks
    #[error("task not found: {0}")]
    NotFound(String),

    /// Task was cancelled before reaching a natural terminal state
    #[error("task cancelled: {0}")]
    Cancelled(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,
}

/// Byte-transfer errors (network failure mid-stream, missing staged file)
#[derive(Debug, Error)]
pub enum TransferError {
    /// The remote stream failed before completion
    #[error("stream failed: {0}")]
    Network(String),

    /// The staged file was missing after the transfer reported completion
    #[error("downloaded file not found at {path}")]
    MissingFile {
        /// Expected location of the staged file
        path: PathBuf,
    },
}

/// Transcoding engine errors
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The ffmpeg binary could not be located
    #[error("ffmpeg binary not found: {0}")]
    BinaryNotFound(String),

    /// Spawning the engine process failed
    #[error("failed to spawn transcoder: {0}")]
    Spawn(String),

    /// The engine exited with an error
    #[error("{message}")]
    Engine {
        /// Diagnostic output captured from the engine
        message: String,
    },

    /// The input byte stream failed while being fed to the engine
    #[error("input stream failed: {0}")]
    Input(#[from] TransferError),
}

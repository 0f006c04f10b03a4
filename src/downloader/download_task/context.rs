//! Shared context and naming for one task execution.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Error;
use crate::naming;
use crate::provider::MediaProvider;
use crate::transcoder::Transcoder;
use crate::types::{Container, Event, ProgressSample, Task, VideoMetadata};

/// Everything one task execution needs, bundled at admission time.
///
/// Owned by the spawned task routine for its lifetime; the `Arc` fields are
/// shared with the downloader.
pub(crate) struct TaskContext {
    /// The task being executed
    pub(crate) task: Task,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Metadata/stream provider
    pub(crate) provider: Arc<dyn MediaProvider>,
    /// Transcoding engine
    pub(crate) transcoder: Arc<dyn Transcoder>,
    /// Event broadcast sender
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancellation signal, checked at every suspension point
    pub(crate) cancel_token: tokio_util::sync::CancellationToken,
}

impl TaskContext {
    /// Emit an event to all subscribers (fire-and-forget)
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Emit a progress event for this task
    pub(crate) fn emit_progress(
        &self,
        progress: ProgressSample,
        file_name: &str,
        metadata: &VideoMetadata,
    ) {
        self.emit(Event::Progress {
            video_id: self.task.video_id.clone(),
            progress,
            file_name: file_name.to_string(),
            metadata: metadata.clone(),
        });
    }

    /// Emit a delete-intent event for an intermediate or partial file
    pub(crate) fn emit_delete(
        &self,
        file_name: &str,
        video_file_name: Option<&str>,
        metadata: &VideoMetadata,
    ) {
        self.emit(Event::Delete {
            video_id: self.task.video_id.clone(),
            progress: 0.0,
            file_name: file_name.to_string(),
            video_file_name: video_file_name.map(str::to_string),
            metadata: metadata.clone(),
        });
    }
}

/// A task failure paired with the output file name, when one was already
/// derived before the failure.
pub(crate) struct TaskFailure {
    pub(crate) error: Error,
    pub(crate) file_name: Option<String>,
}

impl TaskFailure {
    /// Failure before the output name was derived
    pub(crate) fn bare(error: Error) -> Self {
        Self {
            error,
            file_name: None,
        }
    }

    /// Failure carrying the intended output file name
    pub(crate) fn with_file(error: Error, file_name: &str) -> Self {
        Self {
            error,
            file_name: Some(file_name.to_string()),
        }
    }
}

/// All names and paths derived once per task, before any byte moves.
pub(crate) struct OutputNames {
    /// Sanitized, underscore-normalized video title
    pub(crate) video_title: String,
    /// Artist parsed from the sanitized title
    pub(crate) artist: String,
    /// Title parsed from the sanitized title
    pub(crate) title: String,
    /// File name of the target MP3 (without directory)
    pub(crate) mp3_file_name: String,
    /// File name of the staged intermediate (without directory)
    pub(crate) staged_file_name: String,
    /// Full path of the target MP3
    pub(crate) mp3_path: PathBuf,
    /// Full path of the staged intermediate
    pub(crate) staged_path: PathBuf,
}

impl OutputNames {
    /// Derive every name the task will need from the task, metadata, and the
    /// chosen variant's container.
    pub(crate) fn derive(
        task: &Task,
        metadata: &VideoMetadata,
        container: Container,
        output_dir: &std::path::Path,
    ) -> Self {
        let sanitized = naming::sanitize(&metadata.title);
        let (artist, title) = naming::split_artist_title(&sanitized);
        let video_title = naming::underscored(&sanitized);
        let base = naming::output_base_name(
            task.file_name.as_deref(),
            &video_title,
            &task.video_id,
        );

        let mp3_file_name = format!("{}.mp3", base);
        let staged_file_name = format!("{}.{}", base, container.extension());

        Self {
            video_title,
            artist,
            title,
            mp3_path: output_dir.join(&mp3_file_name),
            staged_path: output_dir.join(&staged_file_name),
            mp3_file_name,
            staged_file_name,
        }
    }
}

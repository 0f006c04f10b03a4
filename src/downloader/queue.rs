//! Task submission and queue observation.

use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::types::{Event, QueueStats, Task, TaskOptions};

use super::Mp3Downloader;

impl Mp3Downloader {
    /// Submit a task for the given video ID
    ///
    /// Appends to the FIFO queue and returns immediately; the task runs once
    /// a concurrency slot frees up. Exactly one of the `task_finished` /
    /// `task_failed` events will eventually fire for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] when submitted after `shutdown()`.
    pub async fn submit(&self, video_id: impl Into<String>, options: TaskOptions) -> Result<()> {
        self.submit_task(Task {
            video_id: video_id.into(),
            file_name: None,
            options,
        })
        .await
    }

    /// Submit a fully specified task (explicit output base name supported)
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] when submitted after `shutdown()`.
    pub async fn submit_task(&self, task: Task) -> Result<()> {
        if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        tracing::info!(video_id = %task.video_id, "Task queued");
        self.queue_state.queue.lock().await.push_back(task);
        Ok(())
    }

    /// Snapshot of running and pending task counts
    pub async fn queue_stats(&self) -> QueueStats {
        QueueStats {
            running: self.queue_state.running.load(Ordering::SeqCst),
            pending: self.queue_state.queue.lock().await.len(),
        }
    }

    /// Emit the `queue_size` signal carrying running + pending
    pub(crate) async fn emit_queue_size(&self) {
        let stats = self.queue_stats().await;
        self.emit_event(Event::QueueSize {
            count: stats.running + stats.pending,
        });
    }
}

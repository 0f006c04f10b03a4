//! Task cancellation and shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::Event;

use super::Mp3Downloader;

/// How long shutdown waits for active tasks to drain
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl Mp3Downloader {
    /// Cancel a pending or running task
    ///
    /// A running task is signaled through its cancellation token, which is
    /// checked at every suspension point; the task delivers its own terminal
    /// `task_failed` event. A pending task is dropped from the queue and the
    /// terminal event is delivered here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no task with this video ID is pending
    /// or running.
    pub async fn cancel(&self, video_id: &str) -> Result<()> {
        {
            let active = self.queue_state.active_tasks.lock().await;
            if let Some(token) = active.get(video_id) {
                tracing::info!(video_id = %video_id, "Cancelling running task");
                token.cancel();
                return Ok(());
            }
        }

        let removed = {
            let mut queue = self.queue_state.queue.lock().await;
            let before = queue.len();
            queue.retain(|t| t.video_id != video_id);
            queue.len() < before
        };

        if removed {
            tracing::info!(video_id = %video_id, "Removed pending task from queue");
            self.emit_event(Event::TaskFailed {
                video_id: video_id.to_string(),
                error: Error::Cancelled(video_id.to_string()).to_string(),
                file_name: None,
            });
            self.emit_queue_size().await;
            return Ok(());
        }

        Err(Error::NotFound(video_id.to_string()))
    }

    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new tasks (`submit` returns `ShuttingDown`)
    /// 2. Cancels all active tasks through their cancellation tokens
    /// 3. Waits for active tasks to deliver their terminal events, with a
    ///    timeout
    /// 4. Closes the concurrency limiter, stopping the queue processor
    ///
    /// Tasks still pending in the queue at this point are abandoned without a
    /// terminal event; cancel them individually first if that matters to the
    /// caller.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        self.queue_state.accepting_new.store(false, Ordering::SeqCst);

        {
            let active = self.queue_state.active_tasks.lock().await;
            for (id, token) in active.iter() {
                tracing::debug!(video_id = %id, "Signaling cancellation");
                token.cancel();
            }
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_tasks()).await {
            Ok(()) => tracing::info!("All active tasks drained"),
            Err(_) => {
                tracing::warn!("Timeout waiting for active tasks, proceeding with shutdown")
            }
        }

        self.queue_state.concurrent_limit.close();

        let pending = self.queue_state.queue.lock().await.len();
        if pending > 0 {
            tracing::warn!(pending, "Pending tasks abandoned at shutdown");
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
    }

    /// Wait for all active tasks to complete
    async fn wait_for_active_tasks(&self) {
        loop {
            let active_count = self.queue_state.running.load(Ordering::SeqCst);
            if active_count == 0 {
                return;
            }
            tracing::debug!(active_count, "Waiting for active tasks to complete");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

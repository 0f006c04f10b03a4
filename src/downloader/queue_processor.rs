//! Queue processor — admits pending tasks and spawns their state machines.

use std::sync::atomic::Ordering;
use std::time::Duration;

use super::Mp3Downloader;
use super::download_task::{TaskContext, run_download_task};

/// Interval between queue polling attempts when the queue is empty
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl Mp3Downloader {
    /// Start the queue processor task
    ///
    /// This method spawns a background task that continuously:
    /// 1. Acquires a permit from the concurrency limiter (respects
    ///    `queue_parallelism`)
    /// 2. Takes the next task from the FIFO queue
    /// 3. Spawns the task's state machine
    /// 4. Repeats until shutdown closes the semaphore
    ///
    /// The concurrency bound is a hard ceiling: a task past the limit never
    /// begins its orchestration before a running task releases its permit.
    pub(crate) fn start_queue_processor(&self) -> tokio::task::JoinHandle<()> {
        let downloader = self.clone();

        tokio::spawn(async move {
            loop {
                if downloader.queue_state.concurrent_limit.is_closed() {
                    break;
                }

                // Wait for a free slot before taking a task, so pending
                // tasks stay in the queue where they remain cancellable.
                let permit = match downloader
                    .queue_state
                    .concurrent_limit
                    .clone()
                    .acquire_owned()
                    .await
                {
                    Ok(p) => p,
                    // Semaphore closed by shutdown
                    Err(_) => break,
                };

                let next = {
                    let mut queue = downloader.queue_state.queue.lock().await;
                    queue.pop_front()
                };

                if let Some(task) = next {
                    let cancel_token = tokio_util::sync::CancellationToken::new();
                    {
                        let mut active = downloader.queue_state.active_tasks.lock().await;
                        active.insert(task.video_id.clone(), cancel_token.clone());
                    }
                    downloader.queue_state.running.fetch_add(1, Ordering::SeqCst);
                    downloader.emit_queue_size().await;

                    let ctx = TaskContext {
                        task,
                        config: downloader.config.clone(),
                        provider: downloader.provider.clone(),
                        transcoder: downloader.transcoder.clone(),
                        event_tx: downloader.event_tx.clone(),
                        cancel_token,
                    };

                    let video_id = ctx.task.video_id.clone();
                    let worker = downloader.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        run_download_task(ctx).await;
                        worker.task_completed(&video_id).await;
                    });
                } else {
                    // Queue is empty, release the slot and check again later
                    drop(permit);
                    tokio::time::sleep(QUEUE_POLL_INTERVAL).await;
                }
            }
        })
    }

    /// Book-keeping after a task's terminal event has been delivered
    pub(crate) async fn task_completed(&self, video_id: &str) {
        self.queue_state.running.fetch_sub(1, Ordering::SeqCst);
        {
            let mut active = self.queue_state.active_tasks.lock().await;
            active.remove(video_id);
        }
        self.emit_queue_size().await;
    }
}

//! Task state machine orchestration.
//!
//! `run_download_task` drives one task through metadata fetch, variant
//! selection, transfer, transcode, and finalization, guaranteeing exactly one
//! terminal event (`task_finished` or `task_failed`) per task.

use crate::error::Error;
use crate::selector::{Route, select_variant};
use crate::types::{Event, ResultRecord};

use super::context::{OutputNames, TaskContext, TaskFailure};
use super::transfer;

/// Execute one task to its terminal state and emit the terminal event.
pub(crate) async fn run_download_task(ctx: TaskContext) {
    let video_id = ctx.task.video_id.clone();
    tracing::info!(video_id = %video_id, "Starting download task");

    match perform(&ctx).await {
        Ok(result) => {
            tracing::info!(
                video_id = %video_id,
                file = %result.file.display(),
                "Download task finished"
            );
            ctx.emit(Event::TaskFinished { result });
        }
        Err(failure) => {
            tracing::error!(
                video_id = %video_id,
                error = %failure.error,
                "Download task failed"
            );
            ctx.emit(Event::TaskFailed {
                video_id,
                error: failure.error.to_string(),
                file_name: failure.file_name,
            });
        }
    }
}

/// The fallible part of the state machine; each phase maps its own error into
/// a [`TaskFailure`] with whatever naming context it had.
async fn perform(ctx: &TaskContext) -> Result<ResultRecord, TaskFailure> {
    let quality = ctx
        .task
        .options
        .quality
        .unwrap_or(ctx.config.download.quality);

    // FETCHING_METADATA
    let metadata = tokio::select! {
        result = ctx.provider.fetch_metadata(&ctx.task.video_id, quality) => {
            result.map_err(TaskFailure::bare)?
        }
        _ = ctx.cancel_token.cancelled() => {
            return Err(TaskFailure::bare(Error::Cancelled(
                ctx.task.video_id.clone(),
            )));
        }
    };

    // SELECTING_VARIANT
    let selection = select_variant(
        &metadata,
        ctx.task.options.quality,
        &ctx.config.download,
    )
    .map_err(TaskFailure::bare)?;

    let names = OutputNames::derive(
        &ctx.task,
        &metadata,
        selection.variant.container,
        &ctx.config.download.output_dir,
    );

    tracing::debug!(
        video_id = %ctx.task.video_id,
        route = ?selection.route,
        quality = %selection.quality,
        bitrate_kbps = selection.audio_bitrate,
        file_name = %names.mp3_file_name,
        "Variant selected"
    );

    // TRANSFERRING / TRANSCODING / FINALIZING
    match selection.route {
        Route::Staged => transfer::staged_branch(ctx, &metadata, &selection, &names).await,
        Route::Streaming => transfer::streaming_branch(ctx, &metadata, &selection, &names).await,
    }
}

//! Transfer and transcode phases: the staged and streaming branches.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, TransferError, TranscodeError};
use crate::progress::ProgressStream;
use crate::selector::Selection;
use crate::transcoder::{TranscodeInput, TranscodeJob};
use crate::types::{Event, ProgressSample, ResultRecord, TransferStats, VideoMetadata};

use super::context::{OutputNames, TaskContext, TaskFailure};
use super::finalization::{build_result, cleanup_staged};

/// Staged branch: transfer the variant to an intermediate file, then
/// transcode (or keep the intermediate when the task asked for a non-default
/// quality).
///
/// Progress is reported as fixed 0/50/100 milestones because the two phases
/// have no common byte-level denominator.
pub(crate) async fn staged_branch(
    ctx: &TaskContext,
    metadata: &VideoMetadata,
    selection: &Selection,
    names: &OutputNames,
) -> Result<ResultRecord, TaskFailure> {
    ctx.emit_progress(ProgressSample::at_percentage(0.0), &names.mp3_file_name, metadata);

    let media = ctx
        .provider
        .open_stream(&selection.variant)
        .await
        .map_err(|e| TaskFailure::with_file(e, &names.mp3_file_name))?;

    stage_to_file(ctx, metadata, names, media.stream).await?;

    let staged_exists = tokio::fs::try_exists(&names.staged_path)
        .await
        .unwrap_or(false);
    if !staged_exists {
        return Err(TaskFailure::with_file(
            Error::Transfer(TransferError::MissingFile {
                path: names.staged_path.clone(),
            }),
            &names.mp3_file_name,
        ));
    }

    // A non-default quality keeps the transferred container as-is; the task
    // asked for that encoding, not an MP3 re-encode.
    if selection.quality != ctx.config.download.quality {
        ctx.emit_progress(
            ProgressSample::at_percentage(100.0),
            &names.staged_file_name,
            metadata,
        );
        return Ok(build_result(
            ctx,
            metadata,
            names,
            names.staged_path.clone(),
            &names.staged_file_name,
            None,
        ));
    }

    ctx.emit_progress(ProgressSample::at_percentage(50.0), &names.mp3_file_name, metadata);

    let job = transcode_job(ctx, selection, names);
    let outcome = tokio::select! {
        result = ctx
            .transcoder
            .transcode(TranscodeInput::File(names.staged_path.clone()), &job) =>
        {
            result
        }
        _ = ctx.cancel_token.cancelled() => {
            cleanup_staged(ctx, metadata, names).await;
            return Err(TaskFailure::with_file(
                Error::Cancelled(ctx.task.video_id.clone()),
                &names.mp3_file_name,
            ));
        }
    };

    if let Err(e) = outcome {
        cleanup_staged(ctx, metadata, names).await;
        return Err(TaskFailure::with_file(
            Error::Transcode(e),
            &names.mp3_file_name,
        ));
    }

    ctx.emit_progress(
        ProgressSample::at_percentage(100.0),
        &names.mp3_file_name,
        metadata,
    );
    cleanup_staged(ctx, metadata, names).await;

    Ok(build_result(
        ctx,
        metadata,
        names,
        names.mp3_path.clone(),
        &names.mp3_file_name,
        None,
    ))
}

/// Write the variant's byte stream to the staged intermediate file.
async fn stage_to_file(
    ctx: &TaskContext,
    metadata: &VideoMetadata,
    names: &OutputNames,
    mut stream: futures::stream::BoxStream<'static, Result<bytes::Bytes, TransferError>>,
) -> Result<(), TaskFailure> {
    let result: Result<(), Error> = async {
        let mut file = tokio::fs::File::create(&names.staged_path).await?;
        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = ctx.cancel_token.cancelled() => {
                    return Err(Error::Cancelled(ctx.task.video_id.clone()));
                }
            };
            match chunk {
                Some(Ok(bytes)) => file.write_all(&bytes).await?,
                Some(Err(e)) => return Err(Error::Transfer(e)),
                None => break,
            }
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = result {
        // Announce the dead partial; whether to unlink it is the
        // subscriber's call.
        ctx.emit_delete(&names.mp3_file_name, Some(&names.staged_file_name), metadata);
        return Err(TaskFailure::with_file(e, &names.mp3_file_name));
    }
    Ok(())
}

/// Streaming branch: pipe the remote byte stream straight into the
/// transcoder, reporting byte-level progress along the way.
pub(crate) async fn streaming_branch(
    ctx: &TaskContext,
    metadata: &VideoMetadata,
    selection: &Selection,
    names: &OutputNames,
) -> Result<ResultRecord, TaskFailure> {
    let media = ctx
        .provider
        .open_stream(&selection.variant)
        .await
        .map_err(|e| TaskFailure::with_file(e, &names.mp3_file_name))?;

    // Transfer stats are captured by the progress callback at the 100%
    // sample, which fires inside the transcoder's stream consumption.
    let stats_slot: Arc<Mutex<Option<TransferStats>>> = Arc::new(Mutex::new(None));
    let stats_sink = Arc::clone(&stats_slot);

    let event_tx = ctx.event_tx.clone();
    let video_id = ctx.task.video_id.clone();
    let file_name = names.mp3_file_name.clone();
    let callback_metadata = metadata.clone();
    let progress_stream = ProgressStream::new(
        media.stream,
        media.content_length.unwrap_or(0),
        ctx.config.download.progress_interval(),
        move |sample: ProgressSample| {
            if sample.percentage >= 100.0 {
                let average_speed_bps = (sample.speed_bps * 100.0).round() / 100.0;
                if let Ok(mut slot) = stats_sink.lock() {
                    *slot = Some(TransferStats {
                        transferred_bytes: sample.transferred,
                        runtime_secs: sample.runtime_secs,
                        average_speed_bps,
                    });
                }
            }
            event_tx
                .send(Event::Progress {
                    video_id: video_id.clone(),
                    progress: sample,
                    file_name: file_name.clone(),
                    metadata: callback_metadata.clone(),
                })
                .ok();
        },
    );

    let job = transcode_job(ctx, selection, names);
    let outcome = tokio::select! {
        result = ctx
            .transcoder
            .transcode(TranscodeInput::Stream(progress_stream.boxed()), &job) =>
        {
            result
        }
        _ = ctx.cancel_token.cancelled() => {
            return Err(TaskFailure::with_file(
                Error::Cancelled(ctx.task.video_id.clone()),
                &names.mp3_file_name,
            ));
        }
    };

    match outcome {
        Ok(()) => {
            let stats = stats_slot.lock().ok().and_then(|mut slot| slot.take());
            Ok(build_result(
                ctx,
                metadata,
                names,
                names.mp3_path.clone(),
                &names.mp3_file_name,
                stats,
            ))
        }
        // The transfer failed, not the engine; surface it as a transfer error.
        Err(TranscodeError::Input(transfer_err)) => Err(TaskFailure::with_file(
            Error::Transfer(transfer_err),
            &names.mp3_file_name,
        )),
        Err(e) => {
            ctx.emit_delete(&names.mp3_file_name, None, metadata);
            if let Err(rm_err) = tokio::fs::remove_file(&names.mp3_path).await {
                tracing::debug!(
                    path = %names.mp3_path.display(),
                    error = %rm_err,
                    "No partial output to remove"
                );
            }
            Err(TaskFailure::with_file(
                Error::Transcode(e),
                &names.mp3_file_name,
            ))
        }
    }
}

/// Build the transcoding job for this task from the selection and the
/// derived names.
fn transcode_job(ctx: &TaskContext, selection: &Selection, names: &OutputNames) -> TranscodeJob {
    TranscodeJob {
        output: names.mp3_path.clone(),
        audio_bitrate_kbps: selection.audio_bitrate,
        title: names.title.clone(),
        artist: names.artist.clone(),
        extra_output_options: ctx.config.download.output_options.clone(),
    }
}

//! Result assembly and intermediate-file cleanup.

use std::path::PathBuf;

use crate::downloader::YOUTUBE_WATCH_URL;
use crate::error::Error;
use crate::types::{ResultRecord, TransferStats, VideoMetadata};

use super::context::{OutputNames, TaskContext};

/// Assemble the structured outcome of a successful task.
pub(crate) fn build_result(
    ctx: &TaskContext,
    metadata: &VideoMetadata,
    names: &OutputNames,
    file: PathBuf,
    file_name: &str,
    stats: Option<TransferStats>,
) -> ResultRecord {
    ResultRecord {
        video_id: ctx.task.video_id.clone(),
        file,
        youtube_url: format!("{}{}", YOUTUBE_WATCH_URL, ctx.task.video_id),
        video_title: names.video_title.clone(),
        artist: names.artist.clone(),
        title: names.title.clone(),
        thumbnail: metadata.thumbnail().map(str::to_string),
        file_name: file_name.to_string(),
        stats,
    }
}

/// Remove the staged intermediate file.
///
/// The delete-intent event is emitted regardless of the unlink outcome so
/// subscribers can reconcile; an unlink failure is logged but never masks the
/// task's own outcome.
pub(crate) async fn cleanup_staged(
    ctx: &TaskContext,
    metadata: &VideoMetadata,
    names: &OutputNames,
) {
    ctx.emit_delete(&names.mp3_file_name, Some(&names.staged_file_name), metadata);
    if let Err(e) = tokio::fs::remove_file(&names.staged_path).await {
        let cleanup = Error::Cleanup {
            path: names.staged_path.clone(),
            reason: e.to_string(),
        };
        tracing::warn!(
            video_id = %ctx.task.video_id,
            error = %cleanup,
            "Staged intermediate file cleanup failed"
        );
    } else {
        tracing::debug!(
            video_id = %ctx.task.video_id,
            path = %names.staged_path.display(),
            "Removed staged intermediate file"
        );
    }
}

//! Per-task state machine: metadata fetch, variant selection, transfer,
//! transcode, and finalization.

mod context;
mod finalization;
mod orchestration;
mod transfer;

pub(crate) use context::TaskContext;
pub(crate) use orchestration::run_download_task;

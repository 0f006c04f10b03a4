//! Transcoding engine seam.
//!
//! [`Transcoder`] abstracts the engine that converts a staged file or a live
//! byte stream into the target MP3, enabling testability. [`FfmpegTranscoder`]
//! is the production implementation: it spawns an ffmpeg subprocess, feeding
//! stream input through stdin and capturing stderr for diagnostics.

use std::path::PathBuf;
use std::process::Stdio;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::ToolsConfig;
use crate::error::{TransferError, TranscodeError};

/// How many trailing stderr lines are kept in an engine error message
const STDERR_TAIL_LINES: usize = 8;

/// Input handed to the transcoding engine
pub enum TranscodeInput {
    /// A staged file on disk
    File(PathBuf),
    /// A live byte stream, piped into the engine as it arrives
    Stream(BoxStream<'static, std::result::Result<Bytes, TransferError>>),
}

/// One transcoding invocation: destination, encode parameters, and tags.
#[derive(Clone, Debug)]
pub struct TranscodeJob {
    /// Destination file path
    pub output: PathBuf,
    /// Audio bitrate in kbps
    pub audio_bitrate_kbps: u32,
    /// ID3 title tag
    pub title: String,
    /// ID3 artist tag
    pub artist: String,
    /// Caller-supplied output options, appended after the fixed ones
    pub extra_output_options: Vec<String>,
}

/// Abstraction over the transcoding engine.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` into the MP3 described by `job`.
    async fn transcode(
        &self,
        input: TranscodeInput,
        job: &TranscodeJob,
    ) -> std::result::Result<(), TranscodeError>;
}

/// Production [`Transcoder`] that shells out to ffmpeg.
pub struct FfmpegTranscoder {
    binary: PathBuf,
    audio_codec: String,
}

impl FfmpegTranscoder {
    /// Create a transcoder for an explicitly located binary.
    pub fn new(binary: PathBuf, audio_codec: String) -> Self {
        Self {
            binary,
            audio_codec,
        }
    }

    /// Resolve the ffmpeg binary from configuration: explicit path override,
    /// else a PATH search when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError::BinaryNotFound`] when no binary can be
    /// located.
    pub fn from_config(tools: &ToolsConfig) -> std::result::Result<Self, TranscodeError> {
        let binary = if let Some(path) = &tools.ffmpeg_path {
            path.clone()
        } else if tools.search_path {
            which::which("ffmpeg").map_err(|e| TranscodeError::BinaryNotFound(e.to_string()))?
        } else {
            return Err(TranscodeError::BinaryNotFound(
                "no ffmpeg path configured and PATH search is disabled".to_string(),
            ));
        };
        tracing::info!(binary = %binary.display(), "Transcoder initialized");
        Ok(Self::new(binary, tools.audio_codec.clone()))
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: TranscodeInput,
        job: &TranscodeJob,
    ) -> std::result::Result<(), TranscodeError> {
        let streamed = matches!(input, TranscodeInput::Stream(_));

        let mut cmd = Command::new(&self.binary);
        match &input {
            TranscodeInput::File(path) => {
                cmd.arg("-i").arg(path);
            }
            TranscodeInput::Stream(_) => {
                cmd.arg("-i").arg("pipe:0");
            }
        }
        cmd.arg("-vn")
            .arg("-acodec")
            .arg(&self.audio_codec)
            .arg("-b:a")
            .arg(format!("{}k", job.audio_bitrate_kbps))
            .args(["-f", "mp3", "-id3v2_version", "4"])
            .arg("-metadata")
            .arg(format!("title={}", job.title))
            .arg("-metadata")
            .arg(format!("artist={}", job.artist))
            .args(&job.extra_output_options)
            .arg("-y")
            .arg(&job.output)
            .stdin(if streamed {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| TranscodeError::Spawn(e.to_string()))?;

        // Stream input is fed through stdin from a separate task so stderr
        // stays drained while we wait on the process.
        let feeder = if let TranscodeInput::Stream(mut stream) = input {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                TranscodeError::Spawn("engine stdin unavailable".to_string())
            })?;
            Some(tokio::spawn(async move {
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(bytes) => {
                            // A write failure means the engine went away; its
                            // exit status carries the diagnostics.
                            if stdin.write_all(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => return Some(e),
                    }
                }
                let _ = stdin.shutdown().await;
                None
            }))
        } else {
            None
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TranscodeError::Spawn(e.to_string()))?;

        if let Some(handle) = feeder {
            match handle.await {
                Ok(Some(transfer_err)) => return Err(TranscodeError::Input(transfer_err)),
                Ok(None) => {}
                Err(e) => {
                    return Err(TranscodeError::Spawn(format!(
                        "stdin feeder task failed: {}",
                        e
                    )));
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::Engine {
                message: stderr_tail(&stderr, STDERR_TAIL_LINES),
            });
        }
        Ok(())
    }
}

/// Last `n` non-empty lines of the engine's stderr, joined for the error
/// message.
fn stderr_tail(stderr: &str, n: usize) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(n);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "transcoder exited with an error".to_string()
    } else {
        tail
    }
}

//! Shared helpers for downloader tests: fake collaborators and a harness
//! builder wiring them into a real queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tempfile::TempDir;

use crate::config::Config;
use crate::downloader::Mp3Downloader;
use crate::error::{Error, Result, TransferError, TranscodeError};
use crate::provider::{MediaProvider, MediaStream};
use crate::transcoder::{TranscodeInput, TranscodeJob, Transcoder};
use crate::types::{Container, Quality, StreamVariant, VideoMetadata};

/// Build metadata with a single mp4 variant carrying audio and video.
pub(crate) fn test_metadata(video_id: &str, title: &str, duration_secs: u64) -> VideoMetadata {
    VideoMetadata {
        video_id: video_id.to_string(),
        title: title.to_string(),
        duration_secs,
        thumbnails: vec![format!("https://img.example/{}.jpg", video_id)],
        variants: vec![StreamVariant {
            url: format!("https://media.example/{}", video_id),
            container: Container::Mp4,
            audio_bitrate: Some(128),
            bitrate: Some(128_000),
            has_audio: true,
            has_video: true,
        }],
    }
}

/// In-memory [`MediaProvider`] with scripted metadata and byte streams.
pub(crate) struct FakeProvider {
    metadata: Mutex<HashMap<String, VideoMetadata>>,
    chunks: Vec<Bytes>,
    stream_error: Option<String>,
    delay: Duration,
    concurrent: AtomicUsize,
    max_concurrent: AtomicUsize,
    started: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self {
            metadata: Mutex::new(HashMap::new()),
            chunks: vec![Bytes::from_static(b"0123"), Bytes::from_static(b"4567")],
            stream_error: None,
            delay: Duration::ZERO,
            concurrent: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_metadata(self, metadata: VideoMetadata) -> Self {
        self.metadata
            .lock()
            .unwrap()
            .insert(metadata.video_id.clone(), metadata);
        self
    }

    pub(crate) fn with_chunks(mut self, chunks: Vec<Bytes>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Make streams end with a transport error after the scripted chunks.
    pub(crate) fn with_stream_error(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_string());
        self
    }

    /// Hold each metadata fetch open for `delay`, to make concurrency
    /// observable.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of overlapping metadata fetches observed.
    pub(crate) fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    /// Video IDs in the order their tasks started executing.
    pub(crate) fn started_order(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MediaProvider for FakeProvider {
    async fn fetch_metadata(&self, video_id: &str, _quality: Quality) -> Result<VideoMetadata> {
        self.started.lock().unwrap().push(video_id.to_string());
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.concurrent.fetch_sub(1, Ordering::SeqCst);

        self.metadata
            .lock()
            .unwrap()
            .get(video_id)
            .cloned()
            .ok_or_else(|| Error::Metadata {
                video_id: video_id.to_string(),
                reason: "no metadata scripted".to_string(),
            })
    }

    async fn open_stream(&self, _variant: &StreamVariant) -> Result<MediaStream> {
        let total: u64 = self.chunks.iter().map(|c| c.len() as u64).sum();
        let mut items: Vec<std::result::Result<Bytes, TransferError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.stream_error {
            items.push(Err(TransferError::Network(message.clone())));
        }
        Ok(MediaStream {
            content_length: Some(total),
            stream: futures::stream::iter(items).boxed(),
        })
    }
}

/// What kind of input a fake transcode invocation received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum InputKind {
    File(std::path::PathBuf),
    Stream,
}

/// Recording [`Transcoder`] that consumes its input and writes a stub output
/// file on success.
pub(crate) struct FakeTranscoder {
    jobs: Mutex<Vec<(InputKind, TranscodeJob)>>,
    engine_error: Option<String>,
    delete_input: bool,
}

impl FakeTranscoder {
    pub(crate) fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            engine_error: None,
            delete_input: false,
        }
    }

    /// Fail every invocation with this engine diagnostic.
    pub(crate) fn with_engine_error(mut self, message: &str) -> Self {
        self.engine_error = Some(message.to_string());
        self
    }

    /// Remove file inputs before returning, like an engine that consumed and
    /// unlinked its input.
    pub(crate) fn with_deleted_input(mut self) -> Self {
        self.delete_input = true;
        self
    }

    /// All recorded invocations, in order.
    pub(crate) fn jobs(&self) -> Vec<(InputKind, TranscodeJob)> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(
        &self,
        input: TranscodeInput,
        job: &TranscodeJob,
    ) -> std::result::Result<(), TranscodeError> {
        let kind = match input {
            TranscodeInput::File(path) => {
                if self.delete_input {
                    let _ = tokio::fs::remove_file(&path).await;
                }
                InputKind::File(path)
            }
            TranscodeInput::Stream(mut stream) => {
                // Drain the stream so progress sampling runs to completion.
                while let Some(chunk) = stream.next().await {
                    if let Err(e) = chunk {
                        self.jobs
                            .lock()
                            .unwrap()
                            .push((InputKind::Stream, job.clone()));
                        return Err(TranscodeError::Input(e));
                    }
                }
                InputKind::Stream
            }
        };
        self.jobs.lock().unwrap().push((kind, job.clone()));

        if let Some(message) = &self.engine_error {
            return Err(TranscodeError::Engine {
                message: message.clone(),
            });
        }
        tokio::fs::write(&job.output, b"ID3")
            .await
            .map_err(|e| TranscodeError::Engine {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

/// A downloader wired to fake collaborators, plus handles for assertions.
pub(crate) struct TestHarness {
    pub(crate) downloader: Mp3Downloader,
    pub(crate) provider: Arc<FakeProvider>,
    pub(crate) transcoder: Arc<FakeTranscoder>,
    pub(crate) temp_dir: TempDir,
}

/// Build a downloader around the given fakes, writing into a temp directory
/// and sampling progress without rate limiting.
pub(crate) async fn create_test_downloader(
    provider: FakeProvider,
    transcoder: FakeTranscoder,
    queue_parallelism: usize,
) -> TestHarness {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.download.output_dir = temp_dir.path().join("out");
    config.download.queue_parallelism = queue_parallelism;
    config.download.progress_interval_ms = 0;

    let provider = Arc::new(provider);
    let transcoder = Arc::new(transcoder);
    let downloader = Mp3Downloader::with_collaborators(
        config,
        Arc::clone(&provider) as Arc<dyn MediaProvider>,
        Arc::clone(&transcoder) as Arc<dyn Transcoder>,
    )
    .await
    .unwrap();

    TestHarness {
        downloader,
        provider,
        transcoder,
        temp_dir,
    }
}

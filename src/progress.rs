//! Progress aggregation for byte transfers.
//!
//! [`ProgressTracker`] turns raw byte counts into normalized
//! [`ProgressSample`] records at a bounded rate; [`ProgressStream`] wraps a
//! byte stream and feeds every chunk through a tracker, invoking a callback
//! for each emitted sample. The sequence of emitted percentages is
//! non-decreasing and ends with exactly one 100% sample when the underlying
//! transfer completes.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::BoxStream;

use crate::error::TransferError;
use crate::types::ProgressSample;

/// Converts byte-transfer ticks into bounded-rate progress samples.
///
/// Interim samples are capped below 100%; the single 100% sample is produced
/// by [`finish`](Self::finish) when the transfer completes.
#[derive(Debug)]
pub struct ProgressTracker {
    length: u64,
    interval: Duration,
    started: Instant,
    last_emit: Option<Instant>,
    last_transferred: u64,
    transferred: u64,
    finished: bool,
}

impl ProgressTracker {
    /// Create a tracker for a transfer of `length` declared bytes
    /// (0 when the length is unknown), sampling at most once per `interval`.
    pub fn new(length: u64, interval: Duration, now: Instant) -> Self {
        Self {
            length,
            interval,
            started: now,
            last_emit: None,
            last_transferred: 0,
            transferred: 0,
            finished: false,
        }
    }

    /// Record `bytes` newly transferred bytes.
    ///
    /// Returns a sample when the sampling interval has elapsed since the last
    /// emission. Never returns a 100% sample; that is reserved for
    /// [`finish`](Self::finish).
    pub fn record(&mut self, bytes: usize, now: Instant) -> Option<ProgressSample> {
        self.transferred += bytes as u64;
        if self.finished {
            return None;
        }
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < self.interval {
                return None;
            }
        }
        let sample = self.sample(now);
        if sample.percentage >= 100.0 {
            return None;
        }
        self.last_emit = Some(now);
        self.last_transferred = self.transferred;
        Some(sample)
    }

    /// Produce the final 100% sample, exactly once.
    pub fn finish(&mut self, now: Instant) -> Option<ProgressSample> {
        if self.finished {
            return None;
        }
        self.finished = true;
        let mut sample = self.sample(now);
        sample.percentage = 100.0;
        sample.remaining = 0;
        sample.eta_secs = 0;
        if sample.length == 0 {
            // Undeclared length; report what actually arrived.
            sample.length = self.transferred;
        }
        self.last_transferred = self.transferred;
        Some(sample)
    }

    /// Total bytes recorded so far
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn sample(&self, now: Instant) -> ProgressSample {
        let elapsed = now.duration_since(self.started);
        let elapsed_secs = elapsed.as_secs_f64();
        let speed_bps = if elapsed_secs > 0.0 {
            self.transferred as f64 / elapsed_secs
        } else {
            0.0
        };
        let percentage = if self.length > 0 {
            (self.transferred as f64 / self.length as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        let remaining = self.length.saturating_sub(self.transferred);
        let eta_secs = if speed_bps > 0.0 && self.length > 0 {
            (remaining as f64 / speed_bps) as u64
        } else {
            0
        };
        ProgressSample {
            percentage,
            transferred: self.transferred,
            length: self.length,
            remaining,
            eta_secs,
            runtime_secs: elapsed.as_secs(),
            delta: self.transferred - self.last_transferred,
            speed_bps,
        }
    }
}

/// Byte-stream adapter that reports progress through a callback.
///
/// Yields the underlying chunks unchanged. Lazy, finite, and non-restartable:
/// the final 100% sample fires when the inner stream ends, and nothing is
/// emitted after an error.
pub struct ProgressStream<F> {
    inner: BoxStream<'static, Result<Bytes, TransferError>>,
    tracker: ProgressTracker,
    on_sample: F,
    done: bool,
}

impl<F> ProgressStream<F>
where
    F: FnMut(ProgressSample) + Send + Unpin,
{
    /// Wrap `inner`, sampling against `length` declared bytes at `interval`.
    pub fn new(
        inner: BoxStream<'static, Result<Bytes, TransferError>>,
        length: u64,
        interval: Duration,
        on_sample: F,
    ) -> Self {
        Self {
            inner,
            tracker: ProgressTracker::new(length, interval, Instant::now()),
            on_sample,
            done: false,
        }
    }
}

impl<F> Stream for ProgressStream<F>
where
    F: FnMut(ProgressSample) + Send + Unpin,
{
    type Item = Result<Bytes, TransferError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(sample) = this.tracker.record(chunk.len(), Instant::now()) {
                    (this.on_sample)(sample);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.done = true;
                if let Some(sample) = this.tracker.finish(Instant::now()) {
                    (this.on_sample)(sample);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

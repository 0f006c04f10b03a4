//! Stream variant selection.
//!
//! Pure, deterministic choice of the best matching variant for a task, plus
//! the routing decision between the streaming branch (transcode while
//! transferring) and the staged branch (transfer to file, then transcode).

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::types::{Container, Quality, StreamVariant, VideoMetadata};

/// Media longer than this (in minutes) is routed to the staged branch
pub const LONG_FORM_THRESHOLD_MINS: f64 = 20.0;

/// Encode bitrate used when no variant advertises an audio bitrate
pub const FALLBACK_AUDIO_BITRATE_KBPS: u32 = 192;

/// Execution path chosen for a task's transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Pipe the remote stream straight into the transcoder
    Streaming,
    /// Download to an intermediate file first, then transcode
    Staged,
}

/// Outcome of variant selection for one task
#[derive(Clone, Debug)]
pub struct Selection {
    /// The chosen stream variant
    pub variant: StreamVariant,
    /// Encode bitrate in kbps (top-ranked audio bitrate, or the fallback)
    pub audio_bitrate: u32,
    /// Chosen execution path
    pub route: Route,
    /// Effective quality preference (task override or configured default)
    pub quality: Quality,
}

/// Variant filter category derived from the preferences
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VariantFilter {
    /// Restrict to a single container
    Container(Container),
    /// Audio-only variants
    AudioOnly,
    /// Video-only variants
    VideoOnly,
    /// Combined audio+video variants
    Combined,
    /// No filtering
    Any,
}

impl VariantFilter {
    fn matches(self, variant: &StreamVariant) -> bool {
        match self {
            VariantFilter::Container(container) => variant.container == container,
            VariantFilter::AudioOnly => variant.has_audio && !variant.has_video,
            VariantFilter::VideoOnly => variant.has_video && !variant.has_audio,
            VariantFilter::Combined => variant.has_audio && variant.has_video,
            VariantFilter::Any => true,
        }
    }
}

/// Select the best matching stream variant for `(metadata, preferences)`.
///
/// Pure and deterministic; calling it twice with identical inputs yields
/// identical output. The only failure mode is "no matching variant".
///
/// # Errors
///
/// Returns [`Error::NoMatchingVariant`] when the filtered variant set is empty.
pub fn select_variant(
    metadata: &VideoMetadata,
    task_quality: Option<Quality>,
    config: &DownloadConfig,
) -> Result<Selection> {
    let for_long_form = metadata.duration_secs as f64 / 60.0 > LONG_FORM_THRESHOLD_MINS;
    let quality = task_quality.unwrap_or(config.quality);

    // An explicit per-task quality re-derives the filter category; otherwise
    // the container filter applies (mp4 only, unless webm is admitted).
    let filter = match task_quality {
        Some(Quality::HighestAudio) | Some(Quality::LowestAudio) => VariantFilter::AudioOnly,
        Some(Quality::HighestVideo) | Some(Quality::LowestVideo) => VariantFilter::VideoOnly,
        Some(Quality::Highest) | Some(Quality::Lowest) => VariantFilter::Combined,
        None => {
            if config.allow_webm {
                VariantFilter::Any
            } else {
                VariantFilter::Container(Container::Mp4)
            }
        }
    };

    // Encode bitrate is ranked over the full variant set, not the filtered one.
    let audio_bitrate = metadata
        .variants
        .iter()
        .filter_map(|v| v.audio_bitrate)
        .max()
        .unwrap_or(FALLBACK_AUDIO_BITRATE_KBPS);

    let candidates: Vec<&StreamVariant> = metadata
        .variants
        .iter()
        .filter(|v| filter.matches(v))
        .collect();

    let variant = match quality {
        Quality::HighestAudio => candidates
            .iter()
            .max_by_key(|v| v.audio_bitrate.unwrap_or(0)),
        Quality::LowestAudio => candidates
            .iter()
            .min_by_key(|v| v.audio_bitrate.unwrap_or(u32::MAX)),
        Quality::HighestVideo | Quality::Highest => {
            candidates.iter().max_by_key(|v| v.bitrate.unwrap_or(0))
        }
        Quality::LowestVideo | Quality::Lowest => candidates
            .iter()
            .min_by_key(|v| v.bitrate.unwrap_or(u64::MAX)),
    }
    .ok_or_else(|| Error::NoMatchingVariant {
        video_id: metadata.video_id.clone(),
        quality: quality.to_string(),
    })?;

    let route = if for_long_form || quality != config.quality {
        Route::Staged
    } else {
        Route::Streaming
    };

    Ok(Selection {
        variant: (*variant).clone(),
        audio_bitrate,
        route,
        quality,
    })
}

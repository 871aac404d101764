use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::Fingerprint;
use crate::segment::{AnalysisMode, Segment, TimeRange};

fn default_is_episode() -> bool {
    true
}

/// Metadata for a single media item supplied by the host.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MediaItem {
    pub id: String,
    /// Total playback duration, in seconds.
    pub duration: f64,
    #[serde(default = "default_is_episode")]
    pub is_episode: bool,
    /// Position in the file (seconds) at which the credits fingerprint starts.
    #[serde(default)]
    pub credits_fingerprint_start: f64,
    /// Set if this item already has a stored segment from an earlier pass.
    #[serde(default)]
    pub analyzed: bool,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            duration,
            is_episode: true,
            credits_fingerprint_start: 0.0,
            analyzed: false,
        }
    }

    pub fn with_is_episode(mut self, is_episode: bool) -> Self {
        self.is_episode = is_episode;
        self
    }

    pub fn with_credits_fingerprint_start(mut self, credits_fingerprint_start: f64) -> Self {
        self.credits_fingerprint_start = credits_fingerprint_start;
        self
    }

    pub fn with_analyzed(mut self, analyzed: bool) -> Self {
        self.analyzed = analyzed;
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    #[error("no {mode} fingerprint available for {item}")]
    Missing { item: String, mode: AnalysisMode },
    #[error("fingerprinting failed for {item}: {reason}")]
    Failed { item: String, reason: String },
}

/// Supplies audio fingerprints for media items.
pub trait FingerprintSource: Sync {
    fn fingerprint(
        &self,
        item: &MediaItem,
        mode: AnalysisMode,
    ) -> std::result::Result<Fingerprint, FingerprintError>;
}

/// A single black frame reported by a [BlackFrameDetector].
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BlackFrame {
    /// Offset from the start of the probed window, in seconds.
    pub time: f64,
}

/// Reports near-black frames inside a window of a media item.
pub trait BlackFrameDetector: Sync {
    /// Returns the black frames in `window`, in playback order. A frame counts as black if at
    /// least `minimum_percentage` of its pixels are black.
    fn detect_black_frames(
        &self,
        item: &MediaItem,
        window: TimeRange,
        minimum_percentage: u32,
    ) -> Vec<BlackFrame>;
}

/// Reports silent intervals in the audio of a media item.
pub trait SilenceDetector: Sync {
    /// Returns the silent intervals between the start of the item and `upto` seconds.
    fn detect_silence(&self, item: &MediaItem, upto: f64) -> Vec<TimeRange>;
}

impl<T: FingerprintSource + ?Sized> FingerprintSource for &T {
    fn fingerprint(
        &self,
        item: &MediaItem,
        mode: AnalysisMode,
    ) -> std::result::Result<Fingerprint, FingerprintError> {
        (**self).fingerprint(item, mode)
    }
}

impl<T: BlackFrameDetector + ?Sized> BlackFrameDetector for &T {
    fn detect_black_frames(
        &self,
        item: &MediaItem,
        window: TimeRange,
        minimum_percentage: u32,
    ) -> Vec<BlackFrame> {
        (**self).detect_black_frames(item, window, minimum_percentage)
    }
}

impl<T: SilenceDetector + ?Sized> SilenceDetector for &T {
    fn detect_silence(&self, item: &MediaItem, upto: f64) -> Vec<TimeRange> {
        (**self).detect_silence(item, upto)
    }
}

/// Cooperative cancellation flag shared between the host and a running analysis.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Segments discovered by one analysis pass over a batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Report {
    pub segments: BTreeMap<String, Segment>,
    /// Items that were compared but produced no segment, in queue order.
    pub without_segment: Vec<String>,
}

/// Result of running an analyzer over a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Analyzed(Report),
    /// Too few items to compare. These items are neither matched nor known to lack a segment.
    TooFewItems(Vec<String>),
    /// The analysis was cancelled; nothing from this batch should be stored.
    Cancelled,
}

impl Outcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            Outcome::Analyzed(report) => Some(report),
            _ => None,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Playback time covered by a single fingerprint point (seconds).
///
/// This is fixed by the Chromaprint output format.
pub const POINT_DURATION: f64 = 0.128;

/// Audio fingerprint for a single media item: one 32-bit point per [POINT_DURATION] of audio.
///
/// An empty fingerprint is valid and simply never matches anything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Fingerprint {
    points: Vec<u32>,
}

impl Fingerprint {
    pub fn new(points: impl Into<Vec<u32>>) -> Self {
        Self {
            points: points.into(),
        }
    }

    pub fn points(&self) -> &[u32] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Playback time (seconds, relative to the start of the fingerprint) of point `idx`.
    #[inline]
    pub fn time_at(idx: usize) -> f64 {
        idx as f64 * POINT_DURATION
    }
}

impl From<Vec<u32>> for Fingerprint {
    fn from(points: Vec<u32>) -> Self {
        Self::new(points)
    }
}

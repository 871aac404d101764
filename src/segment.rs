use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The kind of segment an analysis pass looks for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Introduction,
    Credits,
}

impl Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Introduction => write!(f, "introduction"),
            AnalysisMode::Credits => write!(f, "credits"),
        }
    }
}

/// A span of playback time, in seconds.
///
/// A zero-length range (`start == end`) is used by callers that need a placeholder for
/// "nothing found"; check [TimeRange::is_empty] before trusting one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.duration() <= 0.0
    }

    /// Returns true if the two ranges share any time. Touching endpoints do not count.
    pub fn intersects(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns this range moved forward by `offset` seconds.
    pub fn offset(self, offset: f64) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }
}

/// A detected introduction or credits sequence for a single media item.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Segment {
    pub item_id: String,
    pub start: f64,
    pub end: f64,
    pub is_episode: bool,
}

impl Segment {
    pub fn new(item_id: impl Into<String>, range: TimeRange, is_episode: bool) -> Self {
        Self {
            item_id: item_id.into(),
            start: range.start,
            end: range.end,
            is_episode,
        }
    }

    /// Builds the "no segment found" placeholder for an item.
    pub fn empty(item_id: impl Into<String>, is_episode: bool) -> Self {
        Self::new(item_id, TimeRange::default(), is_episode)
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_valid(&self) -> bool {
        self.end > 0.0
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    /// Returns a copy of this segment ending at `end`.
    pub fn with_end(&self, end: f64) -> Self {
        Self {
            end,
            ..self.clone()
        }
    }

    /// Returns a copy of this segment with both ends moved forward by `offset` seconds.
    pub fn offset(&self, offset: f64) -> Self {
        Self::new(self.item_id.clone(), self.range().offset(offset), self.is_episode)
    }
}

mod analyzer;
mod comparator;
mod data;
#[cfg(test)]
pub(crate) mod test_util;
mod util;

pub use analyzer::Analyzer;
pub use comparator::{Alignment, Comparator};
pub use data::{Fingerprint, POINT_DURATION};
pub use util::{find_contiguous, hamming_distance, points_match};

/// Default maximum number of differing bits between two matching fingerprint points.
///
/// The distance between two points ranges from 0 (exact match) to 32 (no match).
pub const DEFAULT_MAXIMUM_POINT_DIFFERENCES: u32 = 6;

/// Default inverted index probe width.
///
/// Each fingerprint point is also looked up with its value shifted by up to this many units in
/// either direction, which tolerates small quantization differences between encodes.
pub const DEFAULT_INVERTED_INDEX_SHIFT: u32 = 2;

/// Default maximum time skip (seconds).
///
/// Two matching points further apart than this belong to different runs.
pub const DEFAULT_MAXIMUM_TIME_SKIP: f64 = 3.5;

/// Default minimum introduction duration (seconds).
pub const DEFAULT_MIN_INTRO_DURATION: f64 = 15.0;

/// Default maximum introduction duration (seconds).
pub const DEFAULT_MAX_INTRO_DURATION: f64 = 120.0;

/// Default minimum silence duration (seconds) used when refining introduction end times.
pub const DEFAULT_SILENCE_MINIMUM_DURATION: f64 = 0.33;

/// Introductions at least this long (seconds) have their end pulled in by one time skip.
///
/// These thresholds were tuned by hand and are worth re-checking against real libraries.
pub const DEFAULT_SHORT_TRIM_THRESHOLD: f64 = 30.0;

/// Introductions at least this long (seconds) have their end pulled in by two time skips.
pub const DEFAULT_LONG_TRIM_THRESHOLD: f64 = 90.0;

/// Segments starting this close to the beginning of a file (seconds) are snapped to zero.
pub const SNAP_TO_START_THRESHOLD: f64 = 5.0;

/// Only silences overlapping this much of the tail of an introduction (seconds) can move its end.
pub const SILENCE_SEARCH_WINDOW: f64 = 15.0;

/// Silence detection runs this far past the end of an introduction (seconds).
pub const SILENCE_SEARCH_PADDING: f64 = 2.0;

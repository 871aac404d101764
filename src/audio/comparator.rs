#[cfg(feature = "rayon")]
extern crate rayon;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::config::Config;
use crate::media::MediaItem;
use crate::segment::{AnalysisMode, Segment, TimeRange};

use super::util::{find_contiguous, points_match};
use super::Fingerprint;

/// A run of audio shared by two fingerprints.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Alignment {
    /// Number of points the right-hand fingerprint is offset by relative to the left-hand one.
    pub shift: i64,
    pub lhs: TimeRange,
    pub rhs: TimeRange,
}

impl Alignment {
    fn duration(&self) -> f64 {
        f64::max(self.lhs.duration(), self.rhs.duration())
    }

    // Longer alignments rank higher. Ties go to the smallest shift, then to the earliest starts.
    // Every key but the last is unchanged when the two sides are swapped.
    fn rank(a: &Self, b: &Self) -> Ordering {
        a.duration()
            .total_cmp(&b.duration())
            .then_with(|| b.shift.unsigned_abs().cmp(&a.shift.unsigned_abs()))
            .then_with(|| (b.lhs.start + b.rhs.start).total_cmp(&(a.lhs.start + a.rhs.start)))
            .then_with(|| Self::earliest_start(b).total_cmp(&Self::earliest_start(a)))
            .then_with(|| a.shift.cmp(&b.shift))
    }

    fn earliest_start(&self) -> f64 {
        f64::min(self.lhs.start, self.rhs.start)
    }
}

impl Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "shift: {}, lhs: {:.3}-{:.3}, rhs: {:.3}-{:.3}",
            self.shift, self.lhs.start, self.lhs.end, self.rhs.start, self.rhs.end,
        )
    }
}

/// Finds the audio two fingerprints have in common.
///
/// Each fingerprint is turned into an inverted index (point value to first position). Every
/// value of the left-hand index is looked up in the right-hand index, along with its neighbours
/// within `inverted_index_shift`, and each hit yields a candidate shift. The fingerprints are
/// then walked in lockstep at every candidate shift and the longest run of matching points
/// wins.
#[derive(Clone, Debug)]
pub struct Comparator {
    mode: AnalysisMode,
    maximum_differences: u32,
    inverted_index_shift: u32,
    maximum_time_skip: f64,
    minimum_duration: f64,
    short_trim_threshold: f64,
    long_trim_threshold: f64,
    threading: bool,
}

impl Comparator {
    /// Constructs a [Comparator] for the given mode using the limits in `config`.
    pub fn new(config: &Config, mode: AnalysisMode) -> Self {
        Self {
            mode,
            maximum_differences: config.maximum_fingerprint_point_differences,
            inverted_index_shift: config.inverted_index_shift,
            maximum_time_skip: config.maximum_time_skip,
            minimum_duration: config.minimum_duration(mode),
            short_trim_threshold: config.short_trim_threshold,
            long_trim_threshold: config.long_trim_threshold,
            threading: false,
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    /// Returns a new [Comparator] with the provided `maximum_differences`.
    pub fn with_maximum_differences(mut self, maximum_differences: u32) -> Self {
        self.maximum_differences = maximum_differences;
        self
    }

    /// Returns a new [Comparator] with the provided `minimum_duration`.
    pub fn with_minimum_duration(mut self, minimum_duration: f64) -> Self {
        self.minimum_duration = minimum_duration;
        self
    }

    /// Returns a new [Comparator] with `threading` set to the provided value.
    ///
    /// When set, candidate shifts are evaluated on the rayon thread pool.
    pub fn with_threading(mut self, threading: bool) -> Self {
        self.threading = threading;
        self
    }

    // Maps each point value to the first position it occurs at. Later duplicates are ignored.
    fn inverted_index(points: &[u32]) -> HashMap<u32, usize> {
        let mut index = HashMap::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            index.entry(*point).or_insert(i);
        }
        index
    }

    /// Returns every shift at which the two fingerprints share (nearly) the same point value.
    pub fn candidate_shifts(&self, lhs: &Fingerprint, rhs: &Fingerprint) -> BTreeSet<i64> {
        let lhs_index = Self::inverted_index(lhs.points());
        let rhs_index = Self::inverted_index(rhs.points());
        let window = self.inverted_index_shift as i32;

        let mut shifts = BTreeSet::new();
        for (point, lhs_idx) in &lhs_index {
            for delta in -window..=window {
                if let Some(rhs_idx) = rhs_index.get(&point.wrapping_add_signed(delta)) {
                    shifts.insert(*rhs_idx as i64 - *lhs_idx as i64);
                }
            }
        }

        shifts
    }

    /// Walks both fingerprints at the given shift and returns the longest run of matching
    /// points on each side, or `None` if either side's run is shorter than the minimum duration.
    ///
    /// Introductions of at least `short_trim_threshold` seconds lose one maximum time skip from
    /// their end, and those of at least `long_trim_threshold` seconds lose two. The minimum
    /// duration applies again after trimming.
    pub fn find_contiguous_for_shift(
        &self,
        lhs: &Fingerprint,
        rhs: &Fingerprint,
        shift: i64,
    ) -> Option<(TimeRange, TimeRange)> {
        let distance = shift.unsigned_abs() as usize;
        let (lhs_offset, rhs_offset) = if shift < 0 {
            (distance, 0)
        } else {
            (0, distance)
        };

        let upper_limit = usize::min(lhs.len(), rhs.len()).saturating_sub(distance);
        if upper_limit == 0 {
            return None;
        }

        let mut lhs_times = Vec::new();
        let mut rhs_times = Vec::new();

        let pairs = lhs.points()[lhs_offset..]
            .iter()
            .zip(&rhs.points()[rhs_offset..])
            .take(upper_limit)
            .enumerate();
        for (i, (lhs_point, rhs_point)) in pairs {
            if !points_match(*lhs_point, *rhs_point, self.maximum_differences) {
                continue;
            }
            lhs_times.push(Fingerprint::time_at(i + lhs_offset));
            rhs_times.push(Fingerprint::time_at(i + rhs_offset));
        }

        lhs_times.push(f64::INFINITY);
        rhs_times.push(f64::INFINITY);

        let mut lhs_range = find_contiguous(&lhs_times, self.maximum_time_skip)
            .filter(|r| r.duration() >= self.minimum_duration)?;
        let mut rhs_range = find_contiguous(&rhs_times, self.maximum_time_skip)
            .filter(|r| r.duration() >= self.minimum_duration)?;

        if self.mode == AnalysisMode::Introduction {
            let trim = if lhs_range.duration() >= self.long_trim_threshold {
                2.0 * self.maximum_time_skip
            } else if lhs_range.duration() >= self.short_trim_threshold {
                self.maximum_time_skip
            } else {
                0.0
            };
            lhs_range.end -= trim;
            rhs_range.end -= trim;

            if lhs_range.duration() < self.minimum_duration
                || rhs_range.duration() < self.minimum_duration
            {
                return None;
            }
        }

        Some((lhs_range, rhs_range))
    }

    /// Finds the longest run shared by `lhs` and `rhs`.
    ///
    /// Runs starting within the first few seconds of a fingerprint are snapped to its start.
    pub fn compare(&self, lhs: &Fingerprint, rhs: &Fingerprint) -> Option<Alignment> {
        let span = tracing::span!(tracing::Level::TRACE, "compare");
        let _enter = span.enter();

        let shifts: Vec<i64> = self.candidate_shifts(lhs, rhs).into_iter().collect();

        let evaluate = |shift: &i64| {
            self.find_contiguous_for_shift(lhs, rhs, *shift)
                .map(|(lhs, rhs)| Alignment {
                    shift: *shift,
                    lhs,
                    rhs,
                })
        };

        let mut alignments = Vec::new();

        if cfg!(feature = "rayon") && self.threading {
            #[cfg(feature = "rayon")]
            {
                alignments = shifts.par_iter().filter_map(evaluate).collect::<Vec<_>>();
            }
        } else {
            alignments.extend(shifts.iter().filter_map(evaluate));
        }

        tracing::debug!(
            num_shifts = shifts.len(),
            num_alignments = alignments.len(),
            "finished shift evaluation"
        );

        let mut best = alignments.into_iter().max_by(Alignment::rank)?;
        for range in [&mut best.lhs, &mut best.rhs] {
            if range.start <= super::SNAP_TO_START_THRESHOLD {
                range.start = 0.0;
            }
        }

        tracing::debug!("best alignment: {}", best);

        Some(best)
    }

    /// Compares two media items, returning one segment per side.
    ///
    /// If nothing is shared, both segments are empty (see [Segment::is_valid]).
    pub fn compare_items(
        &self,
        lhs_item: &MediaItem,
        lhs: &Fingerprint,
        rhs_item: &MediaItem,
        rhs: &Fingerprint,
    ) -> (Segment, Segment) {
        match self.compare(lhs, rhs) {
            Some(alignment) => (
                Segment::new(&lhs_item.id, alignment.lhs, lhs_item.is_episode),
                Segment::new(&rhs_item.id, alignment.rhs, rhs_item.is_episode),
            ),
            None => (
                Segment::empty(&lhs_item.id, lhs_item.is_episode),
                Segment::empty(&rhs_item.id, rhs_item.is_episode),
            ),
        }
    }
}

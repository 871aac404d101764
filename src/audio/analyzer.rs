#[cfg(feature = "rayon")]
extern crate rayon;

use std::collections::{BTreeMap, VecDeque};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::config::Config;
use crate::media::{
    CancellationToken, FingerprintSource, MediaItem, Outcome, Report, SilenceDetector,
};
use crate::segment::{AnalysisMode, Segment, TimeRange};

use super::{Comparator, Fingerprint};

/// Finds introductions or credits shared by the items of a batch (typically one season).
///
/// At a high-level, the analyzer does the following for a batch:
///
/// 1. Fetches a fingerprint for every item that has not been analyzed yet. If only one such
///    item exists, an already analyzed item is borrowed as a reference partner
/// 2. Pops the first item off the queue and compares it against the remaining items in order,
///    stopping at the first one that shares a segment of acceptable length
/// 3. Keeps the longest segment found so far for both items of each matching pair
/// 4. For introductions, pulls each segment's end back to the start of a nearby silence
///
/// The fingerprint and silence collaborators are supplied by the host.
#[derive(Debug)]
pub struct Analyzer<F, S> {
    config: Config,
    fingerprints: F,
    silence: S,
    cancellation: CancellationToken,
    threading: bool,
}

impl<F: FingerprintSource, S: SilenceDetector> Analyzer<F, S> {
    /// Constructs a new [Analyzer] from a config and the host's collaborators.
    pub fn new(config: Config, fingerprints: F, silence: S) -> Self {
        Self {
            config,
            fingerprints,
            silence,
            cancellation: CancellationToken::default(),
            threading: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a new [Analyzer] that stops as soon as `cancellation` is triggered.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns a new [Analyzer] with `threading` set to the provided value.
    ///
    /// When set, fingerprints are fetched and candidate shifts are evaluated on the rayon
    /// thread pool.
    pub fn with_threading(mut self, threading: bool) -> Self {
        self.threading = threading;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    // Fetches a fingerprint for every queued item. A failed item gets an empty fingerprint.
    //
    // Returns `None` if the analysis was cancelled.
    fn fingerprint_all(
        &self,
        queue: &[&MediaItem],
        mode: AnalysisMode,
    ) -> Option<Vec<Fingerprint>> {
        let fingerprint = |item: &&MediaItem| {
            if self.is_cancelled() {
                return None;
            }
            match self.fingerprints.fingerprint(item, mode) {
                Ok(fingerprint) => Some(fingerprint),
                Err(e) => {
                    tracing::warn!(item = %item.id, "{}; using an empty fingerprint", e);
                    Some(Fingerprint::default())
                }
            }
        };

        let mut data = Vec::new();

        if cfg!(feature = "rayon") && self.threading {
            #[cfg(feature = "rayon")]
            {
                data = queue
                    .par_iter()
                    .map(fingerprint)
                    .collect::<Option<Vec<_>>>()?;
            }
        } else {
            data = queue.iter().map(fingerprint).collect::<Option<Vec<_>>>()?;
        }

        if self.is_cancelled() {
            return None;
        }

        Some(data)
    }

    fn within_limits(&self, segment: &Segment, mode: AnalysisMode) -> bool {
        segment.duration() <= self.config.maximum_duration(mode, segment.is_episode)
    }

    // Only store a segment if it is the first one found for its item, or longer than the one
    // found before.
    fn keep_longest(segments: &mut BTreeMap<String, Segment>, segment: Segment) {
        match segments.get(&segment.item_id) {
            Some(existing) if existing.duration() >= segment.duration() => (),
            _ => {
                segments.insert(segment.item_id.clone(), segment);
            }
        }
    }

    // Runs the pairwise search over the queue.
    //
    // Returns the discovered segments and the items that never matched, or `None` if the
    // analysis was cancelled.
    fn search(
        &self,
        queue: &[&MediaItem],
        fingerprints: &[Fingerprint],
        mode: AnalysisMode,
    ) -> Option<(BTreeMap<String, Segment>, Vec<String>)> {
        let comparator = Comparator::new(&self.config, mode).with_threading(self.threading);

        let mut segments = BTreeMap::new();
        let mut without_segment = Vec::new();
        let mut remaining: VecDeque<usize> = (0..queue.len()).collect();

        while let Some(current) = remaining.pop_front() {
            if self.is_cancelled() {
                return None;
            }

            let current_item = queue[current];

            for &other in &remaining {
                let other_item = queue[other];
                let _g = tracing::span!(
                    tracing::Level::TRACE,
                    "compare_items",
                    lhs = %current_item.id,
                    rhs = %other_item.id
                )
                .entered();

                let (lhs, rhs) = comparator.compare_items(
                    current_item,
                    &fingerprints[current],
                    other_item,
                    &fingerprints[other],
                );
                if !lhs.is_valid() || !rhs.is_valid() {
                    continue;
                }
                if !self.within_limits(&lhs, mode) || !self.within_limits(&rhs, mode) {
                    tracing::debug!(
                        lhs_duration = lhs.duration(),
                        rhs_duration = rhs.duration(),
                        "discarding {} match that is too long",
                        mode
                    );
                    continue;
                }

                // Credits fingerprints start partway into the file.
                let (lhs, rhs) = match mode {
                    AnalysisMode::Introduction => (lhs, rhs),
                    AnalysisMode::Credits => (
                        lhs.offset(current_item.credits_fingerprint_start),
                        rhs.offset(other_item.credits_fingerprint_start),
                    ),
                };

                tracing::debug!(
                    lhs_start = lhs.start,
                    lhs_end = lhs.end,
                    rhs_start = rhs.start,
                    rhs_end = rhs.end,
                    "found {} match",
                    mode
                );

                Self::keep_longest(&mut segments, lhs);
                Self::keep_longest(&mut segments, rhs);
                break;
            }

            if !segments.contains_key(&current_item.id) {
                without_segment.push(current_item.id.clone());
            }
        }

        Some((segments, without_segment))
    }

    /// Pulls the end of an introduction back to the start of the first silence near its end.
    ///
    /// A silence qualifies if it overlaps the last few seconds of the introduction, lasts at
    /// least `silence_detection_minimum_duration`, starts no earlier than the introduction and
    /// leaves it at least `minimum_intro_duration` long. Otherwise the segment is returned as is.
    pub fn adjust_end_time(&self, item: &MediaItem, segment: &Segment) -> Segment {
        let tail = TimeRange::new(segment.end - super::SILENCE_SEARCH_WINDOW, segment.end);
        let silences = self
            .silence
            .detect_silence(item, segment.end + super::SILENCE_SEARCH_PADDING);

        let silence = silences.iter().find(|silence| {
            tail.intersects(silence)
                && silence.duration() >= self.config.silence_detection_minimum_duration
                && silence.start >= segment.start
                && silence.start - segment.start >= self.config.minimum_intro_duration
        });

        match silence {
            Some(silence) => {
                tracing::debug!(
                    item = %item.id,
                    original_end = segment.end,
                    adjusted_end = silence.start,
                    "adjusted introduction end time"
                );
                segment.with_end(silence.start)
            }
            None => segment.clone(),
        }
    }

    /// Runs this analyzer over a batch.
    ///
    /// Items flagged as `analyzed` are only used as reference partners and are never reported.
    pub fn run(&self, batch: &[MediaItem], mode: AnalysisMode) -> Outcome {
        let span = tracing::span!(tracing::Level::TRACE, "run", %mode);
        let _enter = span.enter();

        let mut queue: Vec<&MediaItem> = batch.iter().filter(|item| !item.analyzed).collect();
        if queue.is_empty() {
            return Outcome::Analyzed(Report::default());
        }

        let mut reference = None;
        if queue.len() == 1 {
            match batch.iter().find(|item| item.analyzed) {
                Some(item) => {
                    tracing::debug!(reference = %item.id, "using analyzed item as reference");
                    reference = Some(item.id.as_str());
                    queue.push(item);
                }
                None => {
                    tracing::info!(item = %queue[0].id, "too few items to compare");
                    return Outcome::TooFewItems(vec![queue[0].id.clone()]);
                }
            }
        }

        let fingerprints = match self.fingerprint_all(&queue, mode) {
            Some(fingerprints) => fingerprints,
            None => return Outcome::Cancelled,
        };

        let (mut segments, mut without_segment) =
            match self.search(&queue, &fingerprints, mode) {
                Some(v) => v,
                None => return Outcome::Cancelled,
            };

        if let Some(reference) = reference {
            segments.remove(reference);
            without_segment.retain(|id| id != reference);
        }

        if mode == AnalysisMode::Introduction {
            for item in &queue {
                if self.is_cancelled() {
                    return Outcome::Cancelled;
                }
                if let Some(segment) = segments.get(&item.id) {
                    let adjusted = self.adjust_end_time(item, segment);
                    segments.insert(item.id.clone(), adjusted);
                }
            }
        }

        tracing::info!(
            found = segments.len(),
            missing = without_segment.len(),
            "finished {} analysis",
            mode
        );

        Outcome::Analyzed(Report {
            segments,
            without_segment,
        })
    }
}

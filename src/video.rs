use crate::config::Config;
use crate::media::{BlackFrameDetector, CancellationToken, MediaItem, Outcome, Report};
use crate::segment::{AnalysisMode, Segment, TimeRange};
use crate::{Error, Result};

/// Default minimum credits duration (seconds).
pub const DEFAULT_MIN_CREDITS_DURATION: f64 = 15.0;

/// Default maximum credits duration for episodes (seconds).
pub const DEFAULT_MAX_EPISODE_CREDITS_DURATION: f64 = 240.0;

/// Largest accepted maximum credits duration for episodes (seconds).
pub const MAX_EPISODE_CREDITS_DURATION_LIMIT: f64 = 240.0;

/// Default maximum credits duration for movies (seconds).
pub const DEFAULT_MAX_MOVIE_CREDITS_DURATION: f64 = 900.0;

/// Default percentage of a frame that must be black for it to count as a black frame.
pub const DEFAULT_BLACK_FRAME_MINIMUM_PERCENTAGE: u32 = 85;

/// The bisection stops once the search window is at most this wide (seconds).
pub const MAXIMUM_ERROR: f64 = 4.0;

/// Length of the window probed at each bisection step (seconds).
pub const PROBE_DURATION: f64 = 2.0;

/// Finds end credits by looking for the first sustained black section near the end of a file.
///
/// Decoding video is expensive, so rather than scanning the whole tail of the file the analyzer
/// bisects it. The search window is measured backwards from the end of the file and starts out
/// as `[minimum_credits_duration, maximum_credits_duration]`. At each step a short window at
/// the midpoint is probed:
///
/// * No black frames: the credits start later, so the far end of the window moves in.
/// * Black frames: the credits may start earlier, so the near end of the window moves out and
///   the earliest black frame is remembered.
///
/// Only [AnalysisMode::Credits] is supported.
#[derive(Debug)]
pub struct BlackFrameAnalyzer<D> {
    config: Config,
    detector: D,
    cancellation: CancellationToken,
}

impl<D: BlackFrameDetector> BlackFrameAnalyzer<D> {
    pub fn new(config: Config, detector: D) -> Self {
        Self {
            config,
            detector,
            cancellation: CancellationToken::default(),
        }
    }

    /// Returns a new [BlackFrameAnalyzer] that stops as soon as `cancellation` is triggered.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Searches a single item for the start of its credits.
    pub fn find_credits(&self, item: &MediaItem) -> Option<Segment> {
        let span = tracing::span!(tracing::Level::TRACE, "find_credits", item = %item.id);
        let _enter = span.enter();

        let mut low = self.config.minimum_credits_duration;
        let mut high = f64::min(
            self.config.maximum_credits_duration(item.is_episode),
            item.duration,
        );
        if item.duration <= low {
            tracing::debug!(duration = item.duration, "item is too short to have credits");
            return None;
        }

        let mut first_frame: Option<f64> = None;

        while high - low > MAXIMUM_ERROR {
            let midpoint = (low + high) / 2.0;
            let scan_time = item.duration - midpoint;
            let window = TimeRange::new(scan_time, scan_time + PROBE_DURATION);

            let frames = self.detector.detect_black_frames(
                item,
                window,
                self.config.black_frame_minimum_percentage,
            );

            tracing::trace!(
                low,
                high,
                start = window.start,
                end = window.end,
                num_frames = frames.len(),
                "probed window"
            );

            if frames.is_empty() {
                high = midpoint;
                continue;
            }

            low = midpoint;
            let earliest = frames
                .iter()
                .map(|f| scan_time + f.time)
                .fold(f64::INFINITY, f64::min);
            first_frame = Some(first_frame.map_or(earliest, |t| t.min(earliest)));
        }

        let start = first_frame.filter(|start| *start < item.duration)?;
        tracing::debug!(start, end = item.duration, "found credits");

        Some(Segment::new(
            &item.id,
            TimeRange::new(start, item.duration),
            item.is_episode,
        ))
    }

    /// Runs this analyzer over every item of `batch` that has not been analyzed yet.
    ///
    /// Returns [Error::UnsupportedMode] unless `mode` is [AnalysisMode::Credits].
    pub fn run(&self, batch: &[MediaItem], mode: AnalysisMode) -> Result<Outcome> {
        if mode != AnalysisMode::Credits {
            return Err(Error::UnsupportedMode(mode));
        }

        let mut report = Report::default();

        for item in batch.iter().filter(|item| !item.analyzed) {
            if self.cancellation.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }
            match self.find_credits(item) {
                Some(segment) => {
                    report.segments.insert(item.id.clone(), segment);
                }
                None => report.without_segment.push(item.id.clone()),
            }
        }

        tracing::info!(
            found = report.segments.len(),
            missing = report.without_segment.len(),
            "finished black frame analysis"
        );

        Ok(Outcome::Analyzed(report))
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::media::BlackFrame;

    // Every frame from `credits_start` onwards is black.
    struct Credits {
        credits_start: f64,
        calls: AtomicUsize,
    }

    impl Credits {
        fn starting_at(credits_start: f64) -> Self {
            Self {
                credits_start,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BlackFrameDetector for Credits {
        fn detect_black_frames(
            &self,
            _item: &MediaItem,
            window: TimeRange,
            _minimum_percentage: u32,
        ) -> Vec<BlackFrame> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if window.end <= self.credits_start {
                return Vec::new();
            }
            let first = f64::max(window.start, self.credits_start);
            vec![
                BlackFrame {
                    time: first - window.start,
                },
                BlackFrame {
                    time: window.end - window.start,
                },
            ]
        }
    }

    // Black frames only show up in probe windows that start within the last 30 seconds.
    struct Tail;

    impl BlackFrameDetector for Tail {
        fn detect_black_frames(
            &self,
            item: &MediaItem,
            window: TimeRange,
            _minimum_percentage: u32,
        ) -> Vec<BlackFrame> {
            if window.start >= item.duration - 30.0 {
                vec![BlackFrame { time: 0.0 }]
            } else {
                Vec::new()
            }
        }
    }

    struct NoBlackFrames;

    impl BlackFrameDetector for NoBlackFrames {
        fn detect_black_frames(&self, _: &MediaItem, _: TimeRange, _: u32) -> Vec<BlackFrame> {
            Vec::new()
        }
    }

    fn config() -> Config {
        Config {
            minimum_credits_duration: 20.0,
            maximum_episode_credits_duration: 240.0,
            ..Default::default()
        }
    }

    fn max_calls(config: &Config, is_episode: bool) -> usize {
        let width = config.maximum_credits_duration(is_episode) - config.minimum_credits_duration;
        f64::ceil(f64::log2(width / MAXIMUM_ERROR)) as usize + 1
    }

    #[test]
    fn test_credits_in_last_30_seconds() {
        let analyzer = BlackFrameAnalyzer::new(config(), Tail);
        let segment = analyzer.find_credits(&MediaItem::new("ep1", 1500.0)).unwrap();
        assert!((segment.start - 1470.0).abs() <= MAXIMUM_ERROR, "{:?}", segment);
        assert_eq!(segment.end, 1500.0);
        assert!(segment.start < segment.end);
    }

    #[test]
    fn test_converges_close_to_true_start() {
        for credits_start in [1270.0, 1300.0, 1377.7, 1400.0, 1455.5, 1470.0] {
            let detector = Credits::starting_at(credits_start);
            let analyzer = BlackFrameAnalyzer::new(config(), &detector);
            let segment = analyzer
                .find_credits(&MediaItem::new("ep1", 1500.0))
                .unwrap();

            assert!(
                (segment.start - credits_start).abs() <= MAXIMUM_ERROR,
                "expected ~{}, got {}",
                credits_start,
                segment.start
            );
            assert!(detector.calls() <= max_calls(&config(), true));
        }
    }

    #[test]
    fn test_no_black_frames() {
        let analyzer = BlackFrameAnalyzer::new(config(), NoBlackFrames);
        assert_eq!(analyzer.find_credits(&MediaItem::new("ep1", 1500.0)), None);
    }

    #[test]
    fn test_movies_use_a_wider_window() {
        let detector = Credits::starting_at(7200.0 - 600.0);
        let movie = MediaItem::new("movie", 7200.0).with_is_episode(false);

        let analyzer = BlackFrameAnalyzer::new(config(), &detector);
        let segment = analyzer.find_credits(&movie).unwrap();
        assert!((segment.start - 6600.0).abs() <= MAXIMUM_ERROR);
        assert!(!segment.is_episode);
        assert!(detector.calls() <= max_calls(&config(), false));

        // The same file as an episode never looks back far enough.
        let episode = movie.with_is_episode(true);
        let segment = analyzer.find_credits(&episode).unwrap();
        assert!(segment.start > 7200.0 - 240.0);
    }

    #[test]
    fn test_short_files() {
        let detector = Credits::starting_at(0.0);
        let analyzer = BlackFrameAnalyzer::new(config(), &detector);
        assert_eq!(analyzer.find_credits(&MediaItem::new("clip", 12.0)), None);
        assert_eq!(detector.calls(), 0);

        // Shorter than the maximum credits duration: the window is clamped to the file.
        let segment = analyzer
            .find_credits(&MediaItem::new("short", 100.0))
            .unwrap();
        assert!(segment.start >= 0.0);
        assert!(segment.start < segment.end);
    }

    #[test]
    fn test_introduction_mode_is_rejected() {
        let analyzer = BlackFrameAnalyzer::new(config(), NoBlackFrames);
        let result = analyzer.run(&[MediaItem::new("ep1", 1500.0)], AnalysisMode::Introduction);
        assert!(matches!(
            result,
            Err(Error::UnsupportedMode(AnalysisMode::Introduction))
        ));
    }

    #[test]
    fn test_run() {
        let analyzer = BlackFrameAnalyzer::new(config(), Tail);
        let batch = [
            MediaItem::new("ep1", 1500.0),
            MediaItem::new("ep2", 10.0),
            MediaItem::new("ep3", 1500.0).with_analyzed(true),
        ];
        let outcome = analyzer.run(&batch, AnalysisMode::Credits).unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.segments.keys().collect::<Vec<_>>(), vec!["ep1"]);
        assert_eq!(report.without_segment, vec!["ep2".to_string()]);
    }

    #[test]
    fn test_run_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let analyzer = BlackFrameAnalyzer::new(config(), Tail).with_cancellation(token);
        let outcome = analyzer
            .run(&[MediaItem::new("ep1", 1500.0)], AnalysisMode::Credits)
            .unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
    }
}

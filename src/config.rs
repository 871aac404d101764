use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::segment::AnalysisMode;
use crate::{audio, video, Error, Result};

/// Tunables for both analyzers.
///
/// All durations are in seconds. Fields missing from a JSON config file keep their defaults.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of differing bits for two fingerprint points to be considered equal.
    pub maximum_fingerprint_point_differences: u32,
    /// How far (in fingerprint value units) inverted index lookups probe around each point.
    pub inverted_index_shift: u32,
    /// Largest gap allowed between two matching points of the same run.
    pub maximum_time_skip: f64,
    pub minimum_intro_duration: f64,
    pub maximum_intro_duration: f64,
    /// Silences shorter than this are ignored when refining introduction end times.
    pub silence_detection_minimum_duration: f64,
    pub minimum_credits_duration: f64,
    pub maximum_episode_credits_duration: f64,
    pub maximum_movie_credits_duration: f64,
    /// Percentage of a frame that must be black for it to count as a black frame.
    pub black_frame_minimum_percentage: u32,
    /// Introductions at least this long lose one `maximum_time_skip` from their end.
    pub short_trim_threshold: f64,
    /// Introductions at least this long lose two `maximum_time_skip`s from their end.
    pub long_trim_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maximum_fingerprint_point_differences: audio::DEFAULT_MAXIMUM_POINT_DIFFERENCES,
            inverted_index_shift: audio::DEFAULT_INVERTED_INDEX_SHIFT,
            maximum_time_skip: audio::DEFAULT_MAXIMUM_TIME_SKIP,
            minimum_intro_duration: audio::DEFAULT_MIN_INTRO_DURATION,
            maximum_intro_duration: audio::DEFAULT_MAX_INTRO_DURATION,
            silence_detection_minimum_duration: audio::DEFAULT_SILENCE_MINIMUM_DURATION,
            minimum_credits_duration: video::DEFAULT_MIN_CREDITS_DURATION,
            maximum_episode_credits_duration: video::DEFAULT_MAX_EPISODE_CREDITS_DURATION,
            maximum_movie_credits_duration: video::DEFAULT_MAX_MOVIE_CREDITS_DURATION,
            black_frame_minimum_percentage: video::DEFAULT_BLACK_FRAME_MINIMUM_PERCENTAGE,
            short_trim_threshold: audio::DEFAULT_SHORT_TRIM_THRESHOLD,
            long_trim_threshold: audio::DEFAULT_LONG_TRIM_THRESHOLD,
        }
    }
}

impl Config {
    /// Loads a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let f = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(f)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.maximum_fingerprint_point_differences > 32 {
            return Err(invalid(
                "maximum_fingerprint_point_differences cannot be larger than 32",
            ));
        }

        let durations = [
            ("maximum_time_skip", self.maximum_time_skip),
            ("minimum_intro_duration", self.minimum_intro_duration),
            ("maximum_intro_duration", self.maximum_intro_duration),
            (
                "silence_detection_minimum_duration",
                self.silence_detection_minimum_duration,
            ),
            ("minimum_credits_duration", self.minimum_credits_duration),
            (
                "maximum_episode_credits_duration",
                self.maximum_episode_credits_duration,
            ),
            (
                "maximum_movie_credits_duration",
                self.maximum_movie_credits_duration,
            ),
            ("short_trim_threshold", self.short_trim_threshold),
            ("long_trim_threshold", self.long_trim_threshold),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be a non-negative number", name)));
            }
        }

        if self.minimum_intro_duration > self.maximum_intro_duration {
            return Err(invalid(
                "minimum_intro_duration must not exceed maximum_intro_duration",
            ));
        }
        if self.maximum_episode_credits_duration > video::MAX_EPISODE_CREDITS_DURATION_LIMIT {
            return Err(invalid(format!(
                "maximum_episode_credits_duration cannot be larger than {} seconds",
                video::MAX_EPISODE_CREDITS_DURATION_LIMIT
            )));
        }
        if self.minimum_credits_duration >= self.maximum_episode_credits_duration
            || self.minimum_credits_duration >= self.maximum_movie_credits_duration
        {
            return Err(invalid(
                "minimum_credits_duration must be less than the maximum credits durations",
            ));
        }
        if self.long_trim_threshold < self.short_trim_threshold {
            return Err(invalid(
                "long_trim_threshold must not be less than short_trim_threshold",
            ));
        }
        if self.short_trim_threshold - self.maximum_time_skip < self.minimum_intro_duration
            || self.long_trim_threshold - 2.0 * self.maximum_time_skip
                < self.minimum_intro_duration
        {
            return Err(invalid(
                "trimmed introductions must not fall below minimum_intro_duration",
            ));
        }
        if self.black_frame_minimum_percentage > 100 {
            return Err(invalid(
                "black_frame_minimum_percentage cannot be larger than 100",
            ));
        }

        Ok(())
    }

    /// Shortest run accepted as a segment in the given mode.
    pub fn minimum_duration(&self, mode: AnalysisMode) -> f64 {
        match mode {
            AnalysisMode::Introduction => self.minimum_intro_duration,
            AnalysisMode::Credits => self.minimum_credits_duration,
        }
    }

    /// Longest segment accepted in the given mode.
    pub fn maximum_duration(&self, mode: AnalysisMode, is_episode: bool) -> f64 {
        match mode {
            AnalysisMode::Introduction => self.maximum_intro_duration,
            AnalysisMode::Credits => self.maximum_credits_duration(is_episode),
        }
    }

    pub fn maximum_credits_duration(&self, is_episode: bool) -> f64 {
        if is_episode {
            self.maximum_episode_credits_duration
        } else {
            self.maximum_movie_credits_duration
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig(message.into())
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::Fingerprint;
use crate::media::{
    BlackFrame, BlackFrameDetector, FingerprintError, FingerprintSource, MediaItem,
    SilenceDetector,
};
use crate::segment::{AnalysisMode, TimeRange};
use crate::{Error, Result};

/// Extension used for recording files.
pub const RECORDING_FILE_EXT: &str = "json";

fn default_percentage() -> u32 {
    100
}

/// A black frame at an absolute position in a media item.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RecordedBlackFrame {
    pub time: f64,
    /// Percentage of the frame's pixels that are black.
    #[serde(default = "default_percentage")]
    pub percentage: u32,
}

/// Everything an external analysis pass captured for a single media item.
///
/// ```json
/// {
///   "id": "s01e01",
///   "duration": 1420.5,
///   "introduction": [3210012, 3210012, 1104],
///   "silence": [{"start": 88.0, "end": 89.2}],
///   "black_frames": [{"time": 1391.2, "percentage": 97}]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Recording {
    #[serde(flatten)]
    pub item: MediaItem,
    #[serde(default)]
    pub introduction: Option<Fingerprint>,
    #[serde(default)]
    pub credits: Option<Fingerprint>,
    #[serde(default)]
    pub silence: Vec<TimeRange>,
    #[serde(default)]
    pub black_frames: Vec<RecordedBlackFrame>,
}

impl Recording {
    pub fn new(item: MediaItem) -> Self {
        Self {
            item,
            introduction: None,
            credits: None,
            silence: Vec::new(),
            black_frames: Vec::new(),
        }
    }

    /// Load a recording from a path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::RecordingNotFound(path.to_owned()));
        }
        let f = std::io::BufReader::new(std::fs::File::open(path)?);
        Ok(serde_json::from_reader(f)?)
    }

    fn fingerprint(&self, mode: AnalysisMode) -> Option<&Fingerprint> {
        match mode {
            AnalysisMode::Introduction => self.introduction.as_ref(),
            AnalysisMode::Credits => self.credits.as_ref(),
        }
    }
}

/// Expands `paths` into a sorted list of recording files.
///
/// Directories are searched (non-recursively) for files with the [RECORDING_FILE_EXT] extension.
pub fn find_recordings(paths: &[impl AsRef<Path>]) -> Result<Vec<PathBuf>> {
    let mut recordings = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut entries = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let entry = entry?.path();
                if entry.is_file()
                    && entry.extension().and_then(|e| e.to_str()) == Some(RECORDING_FILE_EXT)
                {
                    entries.push(entry);
                }
            }
            entries.sort();
            recordings.extend(entries);
        } else if path.is_file() {
            recordings.push(path.to_owned());
        } else {
            return Err(Error::RecordingNotFound(path.to_owned()));
        }
    }

    Ok(recordings)
}

/// Serves fingerprints, silences, and black frames from a set of [Recording]s.
///
/// Items are looked up by id. An item without a recording behaves like an item with nothing in
/// it: no fingerprint, no silence, and no black frames.
#[derive(Debug, Default)]
pub struct RecordedLibrary {
    recordings: Vec<Recording>,
    index: HashMap<String, usize>,
}

impl RecordedLibrary {
    pub fn new(recordings: impl Into<Vec<Recording>>) -> Self {
        let recordings = recordings.into();
        let index = recordings
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.item.id.clone(), idx))
            .collect();
        Self { recordings, index }
    }

    /// Loads every recording found under `paths`. See [find_recordings].
    pub fn from_paths(paths: &[impl AsRef<Path>]) -> Result<Self> {
        let recordings = find_recordings(paths)?
            .iter()
            .map(Recording::from_path)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(num_recordings = recordings.len(), "loaded recordings");
        Ok(Self::new(recordings))
    }

    /// Media items of all recordings, in load order.
    pub fn items(&self) -> Vec<MediaItem> {
        self.recordings.iter().map(|r| r.item.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Recording> {
        self.index.get(id).map(|idx| &self.recordings[*idx])
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

impl FingerprintSource for RecordedLibrary {
    fn fingerprint(
        &self,
        item: &MediaItem,
        mode: AnalysisMode,
    ) -> std::result::Result<Fingerprint, FingerprintError> {
        self.get(&item.id)
            .and_then(|r| r.fingerprint(mode))
            .cloned()
            .ok_or_else(|| FingerprintError::Missing {
                item: item.id.clone(),
                mode,
            })
    }
}

impl SilenceDetector for RecordedLibrary {
    fn detect_silence(&self, item: &MediaItem, upto: f64) -> Vec<TimeRange> {
        let Some(recording) = self.get(&item.id) else {
            return Vec::new();
        };
        recording
            .silence
            .iter()
            .filter(|s| s.start < upto)
            .map(|s| TimeRange::new(s.start, s.end.min(upto)))
            .collect()
    }
}

impl BlackFrameDetector for RecordedLibrary {
    fn detect_black_frames(
        &self,
        item: &MediaItem,
        window: TimeRange,
        minimum_percentage: u32,
    ) -> Vec<BlackFrame> {
        let Some(recording) = self.get(&item.id) else {
            return Vec::new();
        };
        let mut frames: Vec<BlackFrame> = recording
            .black_frames
            .iter()
            .filter(|f| f.percentage >= minimum_percentage)
            .filter(|f| f.time >= window.start && f.time < window.end)
            .map(|f| BlackFrame {
                time: f.time - window.start,
            })
            .collect();
        frames.sort_by(|a, b| a.time.total_cmp(&b.time));
        frames
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const RECORDING: &str = r#"{
        "id": "s01e01",
        "duration": 1420.5,
        "introduction": [1, 2, 3],
        "silence": [{"start": 10.0, "end": 12.0}, {"start": 88.0, "end": 95.0}],
        "black_frames": [
            {"time": 1391.5, "percentage": 97},
            {"time": 1391.0, "percentage": 99},
            {"time": 1392.5, "percentage": 60},
            {"time": 1400.0}
        ]
    }"#;

    fn library() -> RecordedLibrary {
        let recording: Recording = serde_json::from_str(RECORDING).unwrap();
        RecordedLibrary::new(vec![recording])
    }

    #[test]
    fn test_parse_recording() {
        let recording: Recording = serde_json::from_str(RECORDING).unwrap();
        assert_eq!(recording.item, MediaItem::new("s01e01", 1420.5));
        assert_eq!(recording.introduction, Some(Fingerprint::new(vec![1, 2, 3])));
        assert_eq!(recording.credits, None);
        assert_eq!(recording.black_frames[3].percentage, 100);
    }

    #[test]
    fn test_fingerprints() {
        let library = library();
        let item = MediaItem::new("s01e01", 1420.5);

        let fingerprint = library
            .fingerprint(&item, AnalysisMode::Introduction)
            .unwrap();
        assert_eq!(fingerprint.points(), &[1, 2, 3]);

        assert!(matches!(
            library.fingerprint(&item, AnalysisMode::Credits),
            Err(FingerprintError::Missing {
                mode: AnalysisMode::Credits,
                ..
            })
        ));
        assert!(library
            .fingerprint(&MediaItem::new("other", 10.0), AnalysisMode::Introduction)
            .is_err());
    }

    #[test]
    fn test_silence_is_cut_at_upto() {
        let library = library();
        let item = MediaItem::new("s01e01", 1420.5);
        assert_eq!(
            library.detect_silence(&item, 90.0),
            vec![TimeRange::new(10.0, 12.0), TimeRange::new(88.0, 90.0)]
        );
        assert_eq!(
            library.detect_silence(&item, 11.0),
            vec![TimeRange::new(10.0, 11.0)]
        );
        assert!(library.detect_silence(&item, 5.0).is_empty());
    }

    #[test]
    fn test_black_frames_are_relative_to_window() {
        let library = library();
        let item = MediaItem::new("s01e01", 1420.5);

        let frames = library.detect_black_frames(&item, TimeRange::new(1390.0, 1392.0), 85);
        assert_eq!(
            frames,
            vec![BlackFrame { time: 1.0 }, BlackFrame { time: 1.5 }]
        );

        // The 60% frame only counts with a lower threshold.
        let frames = library.detect_black_frames(&item, TimeRange::new(1392.0, 1394.0), 50);
        assert_eq!(frames, vec![BlackFrame { time: 0.5 }]);
        let frames = library.detect_black_frames(&item, TimeRange::new(1392.0, 1394.0), 85);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_from_paths() {
        let dir = std::env::temp_dir().join(format!("skipper-recorded-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.json"), RECORDING).unwrap();
        std::fs::write(
            dir.join("a.json"),
            r#"{"id": "s01e00", "duration": 30.0, "is_episode": false}"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let library = RecordedLibrary::from_paths(&[&dir]).unwrap();
        let ids: Vec<_> = library.items().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["s01e00", "s01e01"]);
        assert!(!library.get("s01e00").unwrap().item.is_episode);

        let missing = dir.join("missing.json");
        assert!(matches!(
            RecordedLibrary::from_paths(&[&missing]),
            Err(Error::RecordingNotFound(p)) if p == missing
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

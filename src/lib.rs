use std::path::PathBuf;

pub mod audio;
pub mod config;
pub mod media;
pub mod recorded;
pub mod segment;
pub mod util;
pub mod video;

pub use config::Config;
pub use media::{CancellationToken, MediaItem, Outcome, Report};
pub use segment::{AnalysisMode, Segment, TimeRange};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} analysis is not supported by this analyzer")]
    UnsupportedMode(AnalysisMode),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("recording not found at: {0:?}")]
    RecordingNotFound(PathBuf),
    #[error("serde_json error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

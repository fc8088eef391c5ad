use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures the scanner recovers from at a batch boundary.
///
/// Each variant maps to one skip policy in the pipeline:
/// - `Format` / `Parse`: the file is skipped.
/// - `Open`: the video is skipped.
/// - `Decode`: the rest of the video is dropped, saved events stay.
/// - `Model`: the current video is aborted, the run continues.
/// - `Lookup` / `Encode` / `Timestamp` / `Persistence`: the single violation
///   is discarded.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("filename {0:?} does not match CAMERA<id>_<HH:MM:SS>.<DD.MM.YYYY>")]
    Format(String),

    #[error("filename {filename:?} encodes an invalid camera id or date/time: {reason}")]
    Parse { filename: String, reason: String },

    #[error("failed to open video {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("decode failed at frame {frame_index}: {source}")]
    Decode {
        frame_index: u64,
        #[source]
        source: BoxError,
    },

    #[error("model inference failed at frame {frame_index}: {source}")]
    Model {
        frame_index: u64,
        #[source]
        source: BoxError,
    },

    #[error("no workshop registered for camera {0}")]
    Lookup(i64),

    #[error("failed to encode evidence frame: {0}")]
    Encode(#[source] BoxError),

    #[error("frame {frame_index} has no representable timestamp (presentation time {presentation_time})")]
    Timestamp {
        frame_index: u64,
        presentation_time: f64,
    },

    #[error("failed to persist violation for camera {camera_id}: {source}")]
    Persistence {
        camera_id: i64,
        #[source]
        source: BoxError,
    },
}

impl ScanError {
    pub(crate) fn open(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        ScanError::Open {
            path: path.into(),
            source: err.into(),
        }
    }

    pub(crate) fn decode(frame_index: u64, err: anyhow::Error) -> Self {
        ScanError::Decode {
            frame_index,
            source: err.into(),
        }
    }

    pub(crate) fn model(frame_index: u64, err: anyhow::Error) -> Self {
        ScanError::Model {
            frame_index,
            source: err.into(),
        }
    }

    pub(crate) fn persistence(camera_id: i64, err: anyhow::Error) -> Self {
        ScanError::Persistence {
            camera_id,
            source: err.into(),
        }
    }

    /// True for the filename failures that skip a file before it is opened.
    pub fn is_filename_error(&self) -> bool {
        matches!(self, ScanError::Format(_) | ScanError::Parse { .. })
    }
}

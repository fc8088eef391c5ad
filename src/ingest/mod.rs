//! Frame ingestion from recorded video.
//!
//! This module provides:
//! - `FileOpener`: local video files decoded with FFmpeg (feature: ingest-file-ffmpeg)
//! - `SyntheticOpener`: generated frames for tests and dry runs
//! - `FrameSampler`: ordered frame iteration with index and presentation time
//!
//! Frames come out in strict decode order, indexed from 0, one index per
//! decoded frame. Stride selection happens downstream in the pipeline so that
//! indices stay dense.
//!
//! A decoder handle is owned by its `VideoSource` and released when the source
//! (or the sampler built from it) is dropped, on every exit path.

use std::path::Path;

use anyhow::Result;
use image::RgbImage;

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod sampler;

pub use file::{FileOpener, SyntheticOpener, SyntheticSource};
pub use sampler::{FrameSampler, VideoSource};

/// A decoder producing RGB pictures in decode order.
pub trait FrameSource: Send {
    /// Frame rate reported by the container, if any.
    fn frame_rate(&self) -> Option<f64>;

    /// Decode the next picture. `Ok(None)` marks the end of the stream.
    fn next_image(&mut self) -> Result<Option<RgbImage>>;
}

/// Creates frame sources for paths found by the pipeline.
pub trait SourceOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>>;
}

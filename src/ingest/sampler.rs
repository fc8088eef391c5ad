//! Ordered frame iteration over one opened video.

use std::path::{Path, PathBuf};

use super::{FrameSource, SourceOpener};
use crate::error::ScanError;
use crate::filename::VideoIdentity;
use crate::frame::{effective_frame_rate, presentation_time, Frame};

/// An opened recording together with its resolved identity.
pub struct VideoSource {
    path: PathBuf,
    identity: VideoIdentity,
    frame_rate: f64,
    source: Box<dyn FrameSource>,
}

impl VideoSource {
    /// Open `path` through `opener`. The reported frame rate is replaced by
    /// `default_frame_rate` when it is missing or not positive.
    pub fn open(
        opener: &dyn SourceOpener,
        path: &Path,
        identity: VideoIdentity,
        default_frame_rate: f64,
    ) -> Result<Self, ScanError> {
        let source = opener
            .open(path)
            .map_err(|e| ScanError::open(path, e))?;
        let frame_rate = effective_frame_rate(source.frame_rate(), default_frame_rate);
        Ok(Self {
            path: path.to_path_buf(),
            identity,
            frame_rate,
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn identity(&self) -> VideoIdentity {
        self.identity
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Consume the source into a single-pass frame sequence.
    pub fn frames(self) -> FrameSampler {
        FrameSampler {
            source: Some(self.source),
            frame_rate: self.frame_rate,
            next_index: 0,
        }
    }
}

/// Yields every decoded frame with a dense index and its presentation time.
///
/// After the end of stream or the first decode error the decoder is dropped
/// and the sampler only returns `None`.
pub struct FrameSampler {
    source: Option<Box<dyn FrameSource>>,
    frame_rate: f64,
    next_index: u64,
}

impl FrameSampler {
    /// Number of frames decoded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.next_index
    }
}

impl Iterator for FrameSampler {
    type Item = Result<Frame, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source.as_mut()?;
        match source.next_image() {
            Ok(Some(image)) => {
                let index = self.next_index;
                self.next_index += 1;
                Some(Ok(Frame::new(
                    index,
                    presentation_time(index, self.frame_rate),
                    image,
                )))
            }
            Ok(None) => {
                self.source = None;
                None
            }
            Err(e) => {
                self.source = None;
                Some(Err(ScanError::decode(self.next_index, e)))
            }
        }
    }
}

//! Local file frame sources.
//!
//! `FileOpener` decodes the recordings found by the pipeline's directory
//! listing. Decoded frames are never written to disk.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::{FrameSource, SourceOpener};

/// Opens local video files.
#[derive(Clone, Debug, Default)]
pub struct FileOpener;

impl FileOpener {
    pub fn new() -> Self {
        Self
    }
}

impl SourceOpener for FileOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        #[cfg(feature = "ingest-file-ffmpeg")]
        {
            Ok(Box::new(FfmpegFileSource::open(path)?))
        }
        #[cfg(not(feature = "ingest-file-ffmpeg"))]
        {
            Err(anyhow!(
                "cannot decode {}: video decoding requires the ingest-file-ffmpeg feature",
                path.display()
            ))
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source for tests and dry runs
// ----------------------------------------------------------------------------

/// Generates a fixed number of small solid-color frames.
///
/// The color changes with the frame index so evidence stills differ between
/// frames.
pub struct SyntheticSource {
    frame_rate: Option<f64>,
    total_frames: u64,
    produced: u64,
    width: u32,
    height: u32,
}

impl SyntheticSource {
    pub fn new(total_frames: u64, frame_rate: Option<f64>) -> Self {
        Self {
            frame_rate,
            total_frames,
            produced: 0,
            width: 32,
            height: 24,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl FrameSource for SyntheticSource {
    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn next_image(&mut self) -> Result<Option<RgbImage>> {
        if self.produced >= self.total_frames {
            return Ok(None);
        }
        let shade = (self.produced % 256) as u8;
        self.produced += 1;
        Ok(Some(RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([shade, 255 - shade, 128]),
        )))
    }
}

/// Opens synthetic sources keyed by file name.
///
/// Unknown names get the default frame count and rate. Names registered with
/// `unreadable` fail to open, and names registered with `failing_after` stop
/// with a decode error after the given number of frames.
#[derive(Clone, Debug)]
pub struct SyntheticOpener {
    default_frames: u64,
    default_rate: Option<f64>,
    overrides: HashMap<String, (u64, Option<f64>)>,
    unreadable: HashSet<String>,
    failing_after: HashMap<String, u64>,
}

impl SyntheticOpener {
    pub fn new(default_frames: u64, default_rate: Option<f64>) -> Self {
        Self {
            default_frames,
            default_rate,
            overrides: HashMap::new(),
            unreadable: HashSet::new(),
            failing_after: HashMap::new(),
        }
    }

    pub fn with_video(mut self, name: &str, frames: u64, rate: Option<f64>) -> Self {
        self.overrides.insert(name.to_string(), (frames, rate));
        self
    }

    pub fn unreadable(mut self, name: &str) -> Self {
        self.unreadable.insert(name.to_string());
        self
    }

    pub fn failing_after(mut self, name: &str, frames: u64) -> Self {
        self.failing_after.insert(name.to_string(), frames);
        self
    }
}

impl SourceOpener for SyntheticOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let name = file_name(path);
        if self.unreadable.contains(&name) {
            return Err(anyhow!("synthetic source {} is unreadable", name));
        }
        let (frames, rate) = self
            .overrides
            .get(&name)
            .copied()
            .unwrap_or((self.default_frames, self.default_rate));
        let source = SyntheticSource::new(frames, rate);
        match self.failing_after.get(&name) {
            Some(&limit) => Ok(Box::new(BrokenSource {
                inner: source,
                limit,
                path: path.to_path_buf(),
            })),
            None => Ok(Box::new(source)),
        }
    }
}

struct BrokenSource {
    inner: SyntheticSource,
    limit: u64,
    path: PathBuf,
}

impl FrameSource for BrokenSource {
    fn frame_rate(&self) -> Option<f64> {
        self.inner.frame_rate()
    }

    fn next_image(&mut self) -> Result<Option<RgbImage>> {
        if self.inner.produced >= self.limit {
            return Err(anyhow!("corrupt packet in {}", self.path.display()));
        }
        self.inner.next_image()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_source_ends_after_total_frames() {
        let mut source = SyntheticSource::new(3, Some(25.0));
        assert_eq!(source.frame_rate(), Some(25.0));
        for _ in 0..3 {
            assert!(source.next_image().unwrap().is_some());
        }
        assert!(source.next_image().unwrap().is_none());
        assert!(source.next_image().unwrap().is_none());
    }

    #[test]
    fn synthetic_opener_honours_overrides() {
        let opener = SyntheticOpener::new(10, None)
            .with_video("a.mp4", 2, Some(50.0))
            .unreadable("b.mp4")
            .failing_after("c.mp4", 1);

        let a = opener.open(Path::new("/videos/a.mp4")).unwrap();
        assert_eq!(a.frame_rate(), Some(50.0));

        assert!(opener.open(Path::new("/videos/b.mp4")).is_err());

        let mut c = opener.open(Path::new("/videos/c.mp4")).unwrap();
        assert!(c.next_image().unwrap().is_some());
        assert!(c.next_image().is_err());

        let d = opener.open(Path::new("/videos/d.mp4")).unwrap();
        assert_eq!(d.frame_rate(), None);
    }

    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    #[test]
    fn file_opener_needs_the_decoder_feature() {
        let err = FileOpener::new()
            .open(Path::new("/videos/CAMERA1_08:00:00.02.03.2025.mp4"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("ingest-file-ffmpeg"));
    }
}

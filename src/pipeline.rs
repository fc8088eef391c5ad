//! Directory scan: filenames → frames → detection → debounce → persistence.
//!
//! Videos are processed one at a time in file-name order. Each video gets its
//! own `ViolationDebouncer`; nothing carries over between videos except the
//! sink. Failures are contained:
//! - bad filename or unreadable video: the file is skipped
//! - decode error mid-stream: the rest of the video is dropped
//! - model error: the current video is aborted
//! - unknown camera, unrepresentable timestamp, encode or save failure: the
//!   single violation is dropped
//!
//! The run itself only fails when the directory cannot be listed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::debounce::{Decision, ViolationDebouncer, DEFAULT_DEBOUNCE_INTERVAL_S};
use crate::detect::{GearClassifier, PersonDetector};
use crate::error::ScanError;
use crate::filename::{self, VideoIdentity};
use crate::frame::{is_usable_frame_rate, Frame, DEFAULT_FRAME_RATE};
use crate::ingest::{SourceOpener, VideoSource};
use crate::storage::ViolationSink;
use crate::ViolationEvent;

pub const DEFAULT_STRIDE: u64 = 5;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

/// Sampling and debounce parameters for a scan.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Only frames with `index % stride == 0` are evaluated.
    pub stride: u64,
    /// Minimum video-time gap between gear checks, in seconds.
    pub debounce_interval_s: f64,
    /// Used when a container reports no usable frame rate.
    pub default_frame_rate: f64,
    /// Lowercase extensions (without dot) that are scanned.
    pub video_extensions: Vec<String>,
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            debounce_interval_s: DEFAULT_DEBOUNCE_INTERVAL_S,
            default_frame_rate: DEFAULT_FRAME_RATE,
            video_extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl PipelineConfig {
    pub fn is_stride_frame(&self, index: u64) -> bool {
        index % self.stride.max(1) == 0
    }

    /// Case-insensitive extension match.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.video_extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

/// How processing of one file ended.
#[derive(Debug)]
pub enum VideoOutcome {
    /// All frames were decoded and evaluated.
    Completed,
    /// The file was never scanned (bad filename or unreadable video).
    Skipped(ScanError),
    /// Decoding failed part way; events saved before the failure are kept.
    Truncated(ScanError),
    /// Inference failed; the rest of the video was not evaluated.
    Aborted(ScanError),
}

/// Per-video counters.
#[derive(Debug)]
pub struct VideoReport {
    pub path: PathBuf,
    pub camera_id: Option<i64>,
    pub frames_decoded: u64,
    pub frames_evaluated: u64,
    pub gear_checks: u64,
    pub violations_saved: u64,
    pub violations_discarded: u64,
    pub outcome: VideoOutcome,
}

impl VideoReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            camera_id: None,
            frames_decoded: 0,
            frames_evaluated: 0,
            gear_checks: 0,
            violations_saved: 0,
            violations_discarded: 0,
            outcome: VideoOutcome::Completed,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, VideoOutcome::Skipped(_))
    }
}

/// Result of scanning one directory.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub videos: Vec<VideoReport>,
}

impl RunSummary {
    pub fn videos_scanned(&self) -> usize {
        self.videos.iter().filter(|v| !v.is_skipped()).count()
    }

    pub fn videos_skipped(&self) -> usize {
        self.videos.iter().filter(|v| v.is_skipped()).count()
    }

    pub fn videos_failed(&self) -> usize {
        self.videos
            .iter()
            .filter(|v| {
                matches!(
                    v.outcome,
                    VideoOutcome::Truncated(_) | VideoOutcome::Aborted(_)
                )
            })
            .count()
    }

    pub fn violations_saved(&self) -> u64 {
        self.videos.iter().map(|v| v.violations_saved).sum()
    }

    pub fn violations_discarded(&self) -> u64 {
        self.videos.iter().map(|v| v.violations_discarded).sum()
    }
}

pub struct Pipeline<S: ViolationSink> {
    config: PipelineConfig,
    opener: Box<dyn SourceOpener>,
    detector: Box<dyn PersonDetector>,
    classifier: Box<dyn GearClassifier>,
    sink: S,
}

impl<S: ViolationSink> Pipeline<S> {
    pub fn new(
        config: PipelineConfig,
        opener: Box<dyn SourceOpener>,
        detector: Box<dyn PersonDetector>,
        classifier: Box<dyn GearClassifier>,
        sink: S,
    ) -> Self {
        let mut config = config;
        if !is_usable_frame_rate(config.default_frame_rate) {
            log::warn!(
                "default frame rate {} is unusable, using {}",
                config.default_frame_rate,
                DEFAULT_FRAME_RATE
            );
            config.default_frame_rate = DEFAULT_FRAME_RATE;
        }
        Self {
            config,
            opener,
            detector,
            classifier,
            sink,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Regular files in `dir` with an accepted extension, sorted by name.
    pub fn list_videos(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to list video directory {}", dir.display()))?;
        let mut videos = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", dir.display()))?;
            let path = entry.path();
            if path.is_file() && self.config.accepts(&path) {
                videos.push(path);
            }
        }
        videos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(videos)
    }

    /// Scan every video in `dir`.
    pub fn run(&mut self, dir: &Path) -> Result<RunSummary> {
        self.run_with(dir, |_| {})
    }

    /// Scan every video in `dir`, calling `on_video` after each file.
    pub fn run_with<F>(&mut self, dir: &Path, mut on_video: F) -> Result<RunSummary>
    where
        F: FnMut(&VideoReport),
    {
        let videos = self.list_videos(dir)?;
        log::info!("found {} video(s) in {}", videos.len(), dir.display());

        let mut summary = RunSummary::default();
        for path in videos {
            let report = self.process_video(&path);
            on_video(&report);
            summary.videos.push(report);
        }
        Ok(summary)
    }

    /// Process a single file. Never fails; the outcome is in the report.
    pub fn process_video(&mut self, path: &Path) -> VideoReport {
        let mut report = VideoReport::new(path);
        let name = report.file_name();

        let identity = match filename::parse_path(path) {
            Ok(identity) => identity,
            Err(e) => {
                log::warn!("skipping {}: {}", name, e);
                report.outcome = VideoOutcome::Skipped(e);
                return report;
            }
        };
        report.camera_id = Some(identity.camera_id);

        let video = match VideoSource::open(
            self.opener.as_ref(),
            path,
            identity,
            self.config.default_frame_rate,
        ) {
            Ok(video) => video,
            Err(e) => {
                log::warn!("skipping {}: {}", name, e);
                report.outcome = VideoOutcome::Skipped(e);
                return report;
            }
        };
        log::debug!(
            "scanning {} (camera {}, start {}, {:.3} fps)",
            name,
            identity.camera_id,
            identity.start,
            video.frame_rate()
        );

        match self.scan_frames(video, &mut report) {
            Ok(()) => {}
            Err(e @ ScanError::Decode { .. }) => {
                log::warn!("{}: decoding stopped early: {}", name, e);
                report.outcome = VideoOutcome::Truncated(e);
            }
            Err(e) => {
                log::error!("{}: aborting video: {}", name, e);
                report.outcome = VideoOutcome::Aborted(e);
            }
        }

        log::info!(
            "finished {}: {} violation(s) saved ({} frames, {} evaluated, {} gear checks)",
            name,
            report.violations_saved,
            report.frames_decoded,
            report.frames_evaluated,
            report.gear_checks
        );
        report
    }

    fn scan_frames(&mut self, video: VideoSource, report: &mut VideoReport) -> Result<(), ScanError> {
        let identity = video.identity();
        let mut debouncer = ViolationDebouncer::new(self.config.debounce_interval_s);

        for item in video.frames() {
            let frame = item?;
            report.frames_decoded += 1;
            if !self.config.is_stride_frame(frame.index()) {
                continue;
            }
            report.frames_evaluated += 1;

            let detection = self
                .detector
                .detect(&frame)
                .map_err(|e| ScanError::model(frame.index(), e))?;

            let classifier = &mut self.classifier;
            let decision = debouncer
                .evaluate(frame.presentation_time(), detection.person_present, || {
                    if classifier.presence_check(&frame)? {
                        return Ok(None);
                    }
                    classifier.classify(&frame)
                })
                .map_err(|e| ScanError::model(frame.index(), e))?;

            if decision.checked() {
                report.gear_checks += 1;
            }
            let Decision::Violation(description) = decision else {
                continue;
            };

            match self.persist(identity, &frame, description) {
                Ok(event) => {
                    debouncer.record_saved();
                    report.violations_saved += 1;
                    log::info!(
                        "violation {} in {} at {}: {}",
                        debouncer.violations_saved(),
                        report.file_name(),
                        event.timestamp,
                        event.violation_type
                    );
                }
                Err(e) => {
                    report.violations_discarded += 1;
                    log::warn!(
                        "{}: discarding violation at frame {}: {}",
                        report.file_name(),
                        frame.index(),
                        e
                    );
                }
            }
        }
        Ok(())
    }

    /// Attribute, encode and save one violation. The encoded still is owned
    /// by the returned event or dropped with the error.
    fn persist(
        &mut self,
        identity: VideoIdentity,
        frame: &Frame,
        description: String,
    ) -> Result<ViolationEvent, ScanError> {
        let workshop = self
            .sink
            .resolve_workshop(identity.camera_id)
            .map_err(|e| ScanError::persistence(identity.camera_id, e))?;
        if workshop.is_none() {
            return Err(ScanError::Lookup(identity.camera_id));
        }

        let image = frame
            .encode_jpeg(self.config.jpeg_quality)
            .map_err(|e| ScanError::Encode(e.into()))?;
        let event = ViolationEvent::new(identity, frame.presentation_time(), description, image)
            .ok_or(ScanError::Timestamp {
                frame_index: frame.index(),
                presentation_time: frame.presentation_time(),
            })?;
        self.sink
            .save_violation(&event)
            .map_err(|e| ScanError::persistence(identity.camera_id, e))?;
        Ok(event)
    }
}

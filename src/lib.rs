//! Gear Watch
//!
//! This crate scans recorded surveillance video for people who are not wearing
//! the required protective gear (helmet and uniform) and stores one evidentiary
//! record per violation.
//!
//! # Architecture
//!
//! The scanner is a batch pipeline over a directory of recordings:
//!
//! 1. **Filename timing**: camera id and absolute start time come from the
//!    recorder's filename (`filename`).
//! 2. **Stride sampling**: frames are decoded in order and only every Nth frame
//!    is evaluated (`ingest`).
//! 3. **Inference**: person detection and gear classification sit behind
//!    capability traits with ONNX and scripted adapters (`detect`).
//! 4. **Debounce**: a per-video state machine turns the continuous detection
//!    signal into discrete, non-duplicated gear checks (`debounce`).
//! 5. **Persistence**: accepted violations are attributed to a workshop and
//!    saved atomically (`storage`).
//!
//! Failures are contained at the smallest boundary that makes sense: a bad
//! filename skips one file, a model failure aborts one video, a failed save
//! discards one violation. See `error::ScanError`.
//!
//! # Module Structure
//!
//! - `frame`: decoded frames and evidence encoding
//! - `ingest`: frame sources, stride sampling
//! - `pipeline`: per-directory orchestration
//! - Core types: ViolationEvent, event timestamps

use chrono::{NaiveDateTime, TimeDelta};

pub mod config;
pub mod debounce;
pub mod detect;
pub mod error;
pub mod filename;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod storage;

pub use config::{ModelSettings, ScanConfig};
pub use debounce::{Decision, ViolationDebouncer};
pub use detect::{
    DetectionResult, GearAssessment, GearClassifier, PersonDetection, PersonDetector,
    ScriptedGearClassifier, ScriptedPersonDetector, HELMET_MISSING, UNIFORM_MISSING,
};
pub use error::ScanError;
pub use filename::VideoIdentity;
pub use frame::Frame;
pub use ingest::{
    FileOpener, FrameSampler, FrameSource, SourceOpener, SyntheticOpener, SyntheticSource,
    VideoSource,
};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary, VideoOutcome, VideoReport};
pub use storage::{
    InMemoryViolationStore, ReportSummary, SqliteViolationStore, ViolationSink, WorkshopSummary,
};

// -------------------- Violation Events --------------------

/// A gear violation accepted by the debouncer, ready for persistence.
///
/// The timestamp is always derived from the video's start time and the
/// frame's presentation time, never supplied independently.
#[derive(Clone, Debug, PartialEq)]
pub struct ViolationEvent {
    pub camera_id: i64,
    pub timestamp: NaiveDateTime,
    pub violation_type: String,
    /// JPEG-encoded evidentiary frame.
    pub image: Vec<u8>,
}

impl ViolationEvent {
    pub fn new(
        identity: VideoIdentity,
        presentation_time: f64,
        violation_type: String,
        image: Vec<u8>,
    ) -> Option<Self> {
        Some(Self {
            camera_id: identity.camera_id,
            timestamp: event_timestamp(identity.start, presentation_time)?,
            violation_type,
            image,
        })
    }
}

/// Absolute wall-clock time of a frame, at microsecond precision.
///
/// `None` when the presentation time is negative, not finite, or lands
/// outside the calendar range.
pub fn event_timestamp(start: NaiveDateTime, presentation_time: f64) -> Option<NaiveDateTime> {
    let micros = (presentation_time * 1_000_000.0).round();
    if !micros.is_finite() || micros < 0.0 || micros >= i64::MAX as f64 {
        return None;
    }
    start.checked_add_signed(TimeDelta::microseconds(micros as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn event_timestamp_adds_presentation_time() {
        let ts = event_timestamp(start(), 2.0).unwrap();
        assert_eq!(ts.to_string(), "2025-01-01 09:00:02");

        let ts = event_timestamp(start(), 1.0 / 30.0 * 7.0).unwrap();
        assert_eq!(ts.and_utc().timestamp_subsec_micros(), 233_333);
    }

    #[test]
    fn event_timestamp_crosses_midnight() {
        let late = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 55)
            .unwrap();
        assert_eq!(
            event_timestamp(late, 10.0).unwrap().to_string(),
            "2025-01-01 00:00:05"
        );
    }

    #[test]
    fn event_timestamp_rejects_unrepresentable_offsets() {
        assert_eq!(event_timestamp(start(), f64::INFINITY), None);
        assert_eq!(event_timestamp(start(), f64::NAN), None);
        assert_eq!(event_timestamp(start(), -1.0), None);
        // ~292k years of video overflows the calendar without saturating i64
        assert_eq!(event_timestamp(start(), 9.0e12), None);
        assert_eq!(event_timestamp(NaiveDateTime::MAX, 1.0), None);
    }

    #[test]
    fn violation_event_carries_identity() {
        let identity = VideoIdentity {
            camera_id: 7,
            start: start(),
        };
        let ev = ViolationEvent::new(identity, 12.5, HELMET_MISSING.to_string(), vec![1, 2])
            .unwrap();
        assert_eq!(ev.camera_id, 7);
        assert_eq!(ev.timestamp.to_string(), "2025-01-01 09:00:12.500");
        assert_eq!(ev.violation_type, "helmet missing");
    }
}

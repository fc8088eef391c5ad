use anyhow::Result;

use crate::frame::Frame;

use super::result::{DetectionResult, GearAssessment};

/// Person detection capability.
///
/// # Audit Boundary
///
/// Implementations receive a borrowed frame and MUST NOT:
/// - Keep the pixel buffer beyond the `detect` call
/// - Write frames to disk
/// - Make network requests
///
/// The pipeline relies on detection being a pure function of the frame; any
/// state kept between calls must not depend on call order across videos.
pub trait PersonDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Report whether a person appears in the frame.
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Helmet and uniform presence capability.
///
/// Implementors provide `assess`; the two pipeline-facing operations are
/// derived from it and only need overriding when a backend can answer them
/// more cheaply.
pub trait GearClassifier: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Score both gear items on the frame.
    fn assess(&mut self, frame: &Frame) -> Result<GearAssessment>;

    /// True iff both gear items are present.
    fn presence_check(&mut self, frame: &Frame) -> Result<bool> {
        Ok(self.assess(frame)?.all_present())
    }

    /// Violation description, or `None` when nothing is missing.
    fn classify(&mut self, frame: &Frame) -> Result<Option<String>> {
        Ok(self.assess(frame)?.violation_description())
    }

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

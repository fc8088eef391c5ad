use std::collections::HashSet;

use anyhow::Result;

use crate::detect::backend::{GearClassifier, PersonDetector};
use crate::detect::result::{DetectionResult, GearAssessment};
use crate::frame::Frame;

type PersonScript = Box<dyn FnMut(u64) -> Result<bool> + Send>;
type GearScript = Box<dyn FnMut(u64) -> Result<GearAssessment> + Send>;

/// Deterministic person detector driven by the frame index.
///
/// Used for tests and dry runs; pixel content is ignored.
pub struct ScriptedPersonDetector {
    script: PersonScript,
    calls: usize,
}

impl ScriptedPersonDetector {
    pub fn new<F>(script: F) -> Self
    where
        F: FnMut(u64) -> Result<bool> + Send + 'static,
    {
        Self {
            script: Box::new(script),
            calls: 0,
        }
    }

    pub fn always(present: bool) -> Self {
        Self::new(move |_| Ok(present))
    }

    /// Person present exactly on the listed frame indices.
    pub fn at_frames(indices: impl IntoIterator<Item = u64>) -> Self {
        let set: HashSet<u64> = indices.into_iter().collect();
        Self::new(move |index| Ok(set.contains(&index)))
    }

    /// Person present on every frame from `first` onwards.
    pub fn from_frame(first: u64) -> Self {
        Self::new(move |index| Ok(index >= first))
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl PersonDetector for ScriptedPersonDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        self.calls += 1;
        let present = (self.script)(frame.index())?;
        Ok(DetectionResult::presence(present))
    }
}

/// Deterministic gear classifier driven by the frame index.
pub struct ScriptedGearClassifier {
    script: GearScript,
    calls: usize,
}

impl ScriptedGearClassifier {
    pub fn new<F>(script: F) -> Self
    where
        F: FnMut(u64) -> Result<GearAssessment> + Send + 'static,
    {
        Self {
            script: Box::new(script),
            calls: 0,
        }
    }

    /// Same presence on every frame.
    pub fn constant(helmet_present: bool, uniform_present: bool) -> Self {
        let assessment = GearAssessment::from_presence(helmet_present, uniform_present);
        Self::new(move |_| Ok(assessment))
    }

    /// Number of `assess` invocations, including those made through
    /// `presence_check` and `classify`.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl GearClassifier for ScriptedGearClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn assess(&mut self, frame: &Frame) -> Result<GearAssessment> {
        self.calls += 1;
        (self.script)(frame.index())
    }
}

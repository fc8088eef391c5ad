/// Label for a missing helmet. Always listed first.
pub const HELMET_MISSING: &str = "helmet missing";
/// Label for a missing uniform.
pub const UNIFORM_MISSING: &str = "uniform missing";

/// Result of running person detection on a frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// At least one person above the confidence threshold.
    pub person_present: bool,
    /// Individual detections (normalized 0..1 coordinates), in no particular order.
    pub detections: Vec<PersonDetection>,
}

impl DetectionResult {
    pub fn from_detections(detections: Vec<PersonDetection>) -> Self {
        Self {
            person_present: !detections.is_empty(),
            detections,
        }
    }

    /// Presence without box geometry, as reported by scripted detectors.
    pub fn presence(person_present: bool) -> Self {
        Self {
            person_present,
            detections: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PersonDetection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
}

/// Per-item gear presence for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GearAssessment {
    pub helmet_probability: f32,
    pub uniform_probability: f32,
    pub helmet_present: bool,
    pub uniform_present: bool,
}

impl GearAssessment {
    /// Threshold each probability independently; an item is present only
    /// when its probability is strictly above `threshold`.
    pub fn from_probabilities(helmet: f32, uniform: f32, threshold: f32) -> Self {
        Self {
            helmet_probability: helmet,
            uniform_probability: uniform,
            helmet_present: helmet > threshold,
            uniform_present: uniform > threshold,
        }
    }

    pub fn from_presence(helmet_present: bool, uniform_present: bool) -> Self {
        let p = |present: bool| if present { 1.0 } else { 0.0 };
        Self {
            helmet_probability: p(helmet_present),
            uniform_probability: p(uniform_present),
            helmet_present,
            uniform_present,
        }
    }

    pub fn all_present(&self) -> bool {
        self.helmet_present && self.uniform_present
    }

    /// Missing-item labels joined with ", ", helmet first. `None` when both
    /// items are present.
    pub fn violation_description(&self) -> Option<String> {
        if self.all_present() {
            return None;
        }
        let mut labels = Vec::with_capacity(2);
        if !self.helmet_present {
            labels.push(HELMET_MISSING);
        }
        if !self.uniform_present {
            labels.push(UNIFORM_MISSING);
        }
        Some(labels.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helmet_only_missing_yields_single_label() {
        let a = GearAssessment::from_presence(false, true);
        assert_eq!(a.violation_description().as_deref(), Some("helmet missing"));
    }

    #[test]
    fn uniform_only_missing_yields_single_label() {
        let a = GearAssessment::from_presence(true, false);
        assert_eq!(a.violation_description().as_deref(), Some("uniform missing"));
    }

    #[test]
    fn both_missing_lists_helmet_first() {
        let a = GearAssessment::from_presence(false, false);
        assert_eq!(
            a.violation_description().as_deref(),
            Some("helmet missing, uniform missing")
        );
    }

    #[test]
    fn both_present_has_no_violation() {
        let a = GearAssessment::from_presence(true, true);
        assert!(a.all_present());
        assert_eq!(a.violation_description(), None);
    }

    #[test]
    fn threshold_is_strict() {
        let a = GearAssessment::from_probabilities(0.5, 0.51, 0.5);
        assert!(!a.helmet_present);
        assert!(a.uniform_present);
    }

    #[test]
    fn presence_follows_detections() {
        assert!(!DetectionResult::from_detections(vec![]).person_present);
        let det = PersonDetection {
            x: 0.1,
            y: 0.1,
            w: 0.2,
            h: 0.5,
            confidence: 0.9,
        };
        assert!(DetectionResult::from_detections(vec![det]).person_present);
    }
}

mod backend;
mod backends;
pub mod preprocess;
mod result;
pub mod yolo;

use anyhow::Result;

use crate::config::ModelSettings;

pub use backend::{GearClassifier, PersonDetector};
pub use backends::{ScriptedGearClassifier, ScriptedPersonDetector};
#[cfg(feature = "backend-tract")]
pub use backends::{TractGearClassifier, TractPersonDetector};
pub use result::{
    DetectionResult, GearAssessment, PersonDetection, HELMET_MISSING, UNIFORM_MISSING,
};

/// Person detector and gear classifier pair used by the pipeline.
pub type Backends = (Box<dyn PersonDetector>, Box<dyn GearClassifier>);

/// Build the ONNX backends named in `settings` and warm them up.
#[cfg(feature = "backend-tract")]
pub fn load_backends(settings: &ModelSettings) -> Result<Backends> {
    use anyhow::anyhow;

    let person_model = settings
        .person_model
        .as_ref()
        .ok_or_else(|| anyhow!("person detection model path is not configured"))?;
    let gear_model = settings
        .gear_model
        .as_ref()
        .ok_or_else(|| anyhow!("gear classification model path is not configured"))?;

    let mut detector = TractPersonDetector::new(person_model, settings.person_input_size)?
        .with_threshold(settings.person_confidence);
    let mut classifier =
        TractGearClassifier::new(gear_model)?.with_threshold(settings.gear_threshold);
    detector.warm_up()?;
    classifier.warm_up()?;

    log::info!(
        "loaded backends: detector={} ({}), classifier={} ({})",
        detector.name(),
        person_model.display(),
        classifier.name(),
        gear_model.display()
    );
    Ok((Box::new(detector), Box::new(classifier)))
}

#[cfg(not(feature = "backend-tract"))]
pub fn load_backends(_settings: &ModelSettings) -> Result<Backends> {
    Err(anyhow::anyhow!(
        "model inference requires the backend-tract feature"
    ))
}

pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::{ScriptedGearClassifier, ScriptedPersonDetector};

#[cfg(feature = "backend-tract")]
pub use tract::{TractGearClassifier, TractPersonDetector};

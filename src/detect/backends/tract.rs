#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{GearClassifier, PersonDetector};
use crate::detect::preprocess::{self, GEAR_INPUT_SIZE};
use crate::detect::result::{DetectionResult, GearAssessment};
use crate::detect::yolo;
use crate::frame::Frame;

type Plan = TypedRunnableModel<TypedModel>;

/// Load an ONNX model with a fixed 1x3xHxW f32 input and prepare it for inference.
fn load_plan(model_path: &Path, width: u32, height: u32) -> Result<Plan> {
    tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(
                f32::datum_type(),
                tvec!(1, 3, height as usize, width as usize),
            ),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

/// Run the plan and return the first output flattened, with its shape.
fn run_plan(
    plan: &Plan,
    input: Vec<f32>,
    width: u32,
    height: u32,
) -> Result<(Vec<f32>, Vec<usize>)> {
    let tensor: Tensor =
        tract_ndarray::Array4::from_shape_vec((1, 3, height as usize, width as usize), input)
            .context("input tensor shape")?
            .into();
    let outputs = plan
        .run(tvec!(tensor.into()))
        .context("ONNX inference failed")?;
    let output = outputs
        .first()
        .ok_or_else(|| anyhow!("model produced no outputs"))?;
    let view = output
        .to_array_view::<f32>()
        .context("model output tensor was not f32")?;
    Ok((view.iter().copied().collect(), view.shape().to_vec()))
}

/// Person detector backed by a YOLOv5-style ONNX export.
///
/// Expects a square `1x3xSxS` RGB input scaled to [0, 1] and a
/// `1xNx(5+classes)` output.
pub struct TractPersonDetector {
    plan: Plan,
    input_size: u32,
    confidence_threshold: f32,
}

impl TractPersonDetector {
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let plan = load_plan(model_path.as_ref(), input_size, input_size)?;
        Ok(Self {
            plan,
            input_size,
            confidence_threshold: 0.5,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

impl PersonDetector for TractPersonDetector {
    fn name(&self) -> &'static str {
        "tract-yolo"
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let input = preprocess::detector_tensor(frame.image(), self.input_size);
        let (output, shape) = run_plan(&self.plan, input, self.input_size, self.input_size)?;
        let columns = shape
            .last()
            .copied()
            .ok_or_else(|| anyhow!("detector output is a scalar"))?;
        let detections = yolo::person_detections(
            &output,
            columns,
            self.input_size as f32,
            self.confidence_threshold,
        );
        Ok(DetectionResult::from_detections(detections))
    }
}

/// Helmet/uniform classifier backed by an ONNX model with a `1x2` output of
/// per-item presence probabilities (helmet, uniform).
pub struct TractGearClassifier {
    plan: Plan,
    threshold: f32,
}

impl TractGearClassifier {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let plan = load_plan(model_path.as_ref(), GEAR_INPUT_SIZE, GEAR_INPUT_SIZE)?;
        Ok(Self {
            plan,
            threshold: 0.5,
        })
    }

    /// Override the default presence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl GearClassifier for TractGearClassifier {
    fn name(&self) -> &'static str {
        "tract-gear"
    }

    fn assess(&mut self, frame: &Frame) -> Result<GearAssessment> {
        let input = preprocess::gear_tensor(frame.image());
        let (output, _) = run_plan(&self.plan, input, GEAR_INPUT_SIZE, GEAR_INPUT_SIZE)?;
        match output.as_slice() {
            [helmet, uniform, ..] => Ok(GearAssessment::from_probabilities(
                *helmet,
                *uniform,
                self.threshold,
            )),
            _ => Err(anyhow!(
                "gear model produced {} values, expected 2",
                output.len()
            )),
        }
    }
}

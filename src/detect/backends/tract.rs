#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::RegionDetector;
use crate::detect::classify::{
    blob_from_image, parse_ssd_detections, pick_label, AgeGender, ChannelOrder, AGE_LABELS,
    CLASSIFIER_INPUT_SIZE, CLASSIFIER_MEAN, FACE_CONFIDENCE, FACE_INPUT_SIZE, FACE_MEAN,
    GENDER_LABELS,
};
use crate::frame::{DetectionRegion, Frame};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>>;

/// Load an ONNX model with a fixed `1x3xSxS` float input.
fn load_square_model(model_path: &Path, side: u32) -> Result<Plan> {
    tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(
                f32::datum_type(),
                tvec!(1, 3, side as usize, side as usize),
            ),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

fn run_blob(model: &Plan, blob: Vec<f32>, side: u32) -> Result<Vec<f32>> {
    let side = side as usize;
    let input = tract_ndarray::Array4::from_shape_vec((1, 3, side, side), blob)
        .context("input blob does not match model shape")?;
    let outputs = model
        .run(tvec!(input.into_tensor().into()))
        .context("ONNX inference failed")?;
    let output = outputs
        .first()
        .ok_or_else(|| anyhow!("model produced no outputs"))?;
    let scores = output
        .to_array_view::<f32>()
        .context("model output tensor was not f32")?;
    Ok(scores.iter().copied().collect())
}

/// SSD face detector (300x300 input, per-row `[id, class, conf, x1, y1, x2, y2]`).
pub struct SsdFaceDetector {
    model: Plan,
    confidence_threshold: f32,
}

impl SsdFaceDetector {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = load_square_model(model_path, FACE_INPUT_SIZE)?;
        log::info!("SsdFaceDetector: loaded {}", model_path.display());
        Ok(Self {
            model,
            confidence_threshold: FACE_CONFIDENCE,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

impl RegionDetector for SsdFaceDetector {
    fn name(&self) -> &'static str {
        "ssd-face"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRegion>> {
        let blob = blob_from_image(frame.pixels(), FACE_INPUT_SIZE, FACE_MEAN, ChannelOrder::Rgb);
        let output = run_blob(&self.model, blob, FACE_INPUT_SIZE)?;
        parse_ssd_detections(
            &output,
            frame.width(),
            frame.height(),
            self.confidence_threshold,
        )
    }
}

/// Age bracket and gender classifier over a cropped face.
pub struct AgeGenderClassifier {
    age: Plan,
    gender: Plan,
}

impl AgeGenderClassifier {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(age_model: P, gender_model: Q) -> Result<Self> {
        let age = load_square_model(age_model.as_ref(), CLASSIFIER_INPUT_SIZE)?;
        let gender = load_square_model(gender_model.as_ref(), CLASSIFIER_INPUT_SIZE)?;
        Ok(Self { age, gender })
    }

    pub fn classify(&self, face: &RgbImage) -> Result<AgeGender> {
        let blob = blob_from_image(
            face,
            CLASSIFIER_INPUT_SIZE,
            CLASSIFIER_MEAN,
            ChannelOrder::Bgr,
        );
        let gender_scores = run_blob(&self.gender, blob.clone(), CLASSIFIER_INPUT_SIZE)?;
        let age_scores = run_blob(&self.age, blob, CLASSIFIER_INPUT_SIZE)?;
        Ok(AgeGender {
            gender: pick_label(&GENDER_LABELS, &gender_scores)?,
            age: pick_label(&AGE_LABELS, &age_scores)?,
        })
    }
}

// THEORY:
// Image classification is a capability, not a global. The engine holds an
// `Arc<dyn ImageClassifier>` that is chosen exactly once at start-up and is never
// swapped afterwards. Two implementations exist:
//
// 1.  **StubClassifier**: Deterministic. Always answers `Leaf_Spot` at 0.66. Used in
//     demo mode, when no model is configured, and when the model fails to load.
// 2.  **OnnxClassifier** (feature `onnx`): Runs an ONNX image-classification model
//     with `tract`. The image is resized to the model's square input, normalized to
//     `[0, 1]` in NCHW layout, and the top-ranked class is reported.
//
// A failed model load is a `ModelUnavailable` condition that is logged once and
// then permanently handled by the stub. There is no retry and no hot-reload.
// Inference errors, by contrast, are returned to the caller as `Inference`.
//
// Decoding bytes into an RGB bitmap happens before classification; a decode
// failure never reaches the classifier.

use crate::config::{DoctorConfig, ModelConfig};
use crate::core_modules::prediction::prediction::{Prediction, Score};
use crate::error::{DoctorError, Result};
use image::RgbImage;
use std::sync::Arc;
use tracing::{info, warn};

pub const STUB_LABEL: &str = "Leaf_Spot";
pub const STUB_SCORE: Score = 0.66;

pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> Result<Prediction>;

    /// Short human-readable name for logs and health output.
    fn describe(&self) -> String;

    fn is_model_backed(&self) -> bool {
        false
    }
}

/// The fixed fallback used whenever no real model is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubClassifier;

impl ImageClassifier for StubClassifier {
    fn classify(&self, _image: &RgbImage) -> Result<Prediction> {
        Ok(Prediction::new(STUB_LABEL, STUB_SCORE))
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

/// Decodes any format the `image` crate understands into an RGB bitmap.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| DoctorError::ImageDecode(e.to_string()))
}

/// Picks the top-ranked class from raw model output and turns its value into a
/// probability. Outputs that already form a distribution are taken as-is,
/// anything else goes through a softmax. The result is clamped to `[0, 1]`.
pub fn top_class(outputs: &[f32]) -> Option<(usize, Score)> {
    let (best_idx, best_value) = outputs
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

    let sum: f64 = outputs.iter().map(|v| *v as f64).sum();
    let is_distribution = outputs.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3;

    let score = if is_distribution {
        best_value as f64
    } else {
        let max = best_value as f64;
        let denom: f64 = outputs
            .iter()
            .filter(|v| v.is_finite())
            .map(|v| (*v as f64 - max).exp())
            .sum();
        1.0 / denom
    };

    Some((best_idx, score.clamp(0.0, 1.0)))
}

/// Reads a labels file: one label per line, blank lines ignored.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

pub fn label_for(labels: &[String], idx: usize) -> String {
    labels
        .get(idx)
        .cloned()
        .unwrap_or_else(|| format!("class_{idx}"))
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

#[cfg(feature = "onnx")]
mod onnx {
    use super::{ImageClassifier, label_for, parse_labels, top_class};
    use crate::config::ModelConfig;
    use crate::core_modules::prediction::prediction::Prediction;
    use crate::error::{DoctorError, Result};
    use image::RgbImage;
    use image::imageops::{self, FilterType};
    use tract_onnx::prelude::*;

    pub struct OnnxClassifier {
        plan: TypedRunnableModel<TypedModel>,
        labels: Vec<String>,
        input_size: u32,
        source: String,
    }

    impl OnnxClassifier {
        pub fn load(config: &ModelConfig) -> Result<Self> {
            let size = config.input_size as usize;
            let plan = tract_onnx::onnx()
                .model_for_path(&config.model_path)
                .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
                .and_then(|model| model.into_optimized())
                .and_then(|model| model.into_runnable())
                .map_err(|e| {
                    DoctorError::ModelUnavailable(format!(
                        "failed to load '{}': {e}",
                        config.model_path.display()
                    ))
                })?;

            let labels = match &config.labels_path {
                Some(path) => parse_labels(&std::fs::read_to_string(path).map_err(|e| {
                    DoctorError::ModelUnavailable(format!(
                        "failed to read labels '{}': {e}",
                        path.display()
                    ))
                })?),
                None => Vec::new(),
            };

            Ok(Self {
                plan,
                labels,
                input_size: config.input_size,
                source: config.model_path.display().to_string(),
            })
        }
    }

    impl ImageClassifier for OnnxClassifier {
        fn classify(&self, image: &RgbImage) -> Result<Prediction> {
            let size = self.input_size;
            let resized = imageops::resize(image, size, size, FilterType::Triangle);
            let input: Tensor = tract_ndarray::Array4::<f32>::from_shape_fn(
                (1, 3, size as usize, size as usize),
                |(_, c, y, x)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
            )
            .into();

            let outputs = self
                .plan
                .run(tvec!(input.into()))
                .map_err(|e| DoctorError::Inference(e.to_string()))?;
            let first = outputs
                .first()
                .ok_or_else(|| DoctorError::Inference("model produced no outputs".to_string()))?;
            let view = first
                .to_array_view::<f32>()
                .map_err(|e| DoctorError::Inference(format!("output is not f32: {e}")))?;
            let values: Vec<f32> = view.iter().copied().collect();

            let (idx, score) = top_class(&values)
                .ok_or_else(|| DoctorError::Inference("model output is empty".to_string()))?;
            Ok(Prediction::new(label_for(&self.labels, idx), score))
        }

        fn describe(&self) -> String {
            format!("onnx:{}", self.source)
        }

        fn is_model_backed(&self) -> bool {
            true
        }
    }
}

#[cfg(feature = "onnx")]
fn load_model(config: &ModelConfig) -> Result<Arc<dyn ImageClassifier>> {
    Ok(Arc::new(OnnxClassifier::load(config)?))
}

#[cfg(not(feature = "onnx"))]
fn load_model(config: &ModelConfig) -> Result<Arc<dyn ImageClassifier>> {
    Err(DoctorError::ModelUnavailable(format!(
        "'{}' configured but crop_doctor was built without the `onnx` feature",
        config.model_path.display()
    )))
}

/// Chooses the classifier for the lifetime of the process.
pub fn load_classifier(config: &DoctorConfig) -> Arc<dyn ImageClassifier> {
    if config.demo_mode {
        info!("DEMO_MODE=1: skipping model load; using rule-based stub");
        return Arc::new(StubClassifier);
    }
    let Some(model) = &config.model else {
        info!("no image model configured; using rule-based stub");
        return Arc::new(StubClassifier);
    };
    match load_model(model) {
        Ok(classifier) => {
            info!(classifier = %classifier.describe(), "loaded image model");
            classifier
        }
        Err(e) => {
            warn!("could not load image model, falling back to stub: {e}");
            Arc::new(StubClassifier)
        }
    }
}

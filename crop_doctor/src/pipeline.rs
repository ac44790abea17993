// THEORY:
// The `pipeline` module is the top-level API of the engine. It wires the knowledge
// base and the chosen image classifier together once, and then answers three kinds
// of questions for any number of callers, concurrently:
//
// - `diagnose`: raw input → `Prediction` (image wins over description).
// - `advise_for`: label → `Advice`.
// - `dispatch_action`: action id + context → `ActionResult`.
//
// On top of these sits `report`, the response assembly used by the front ends. It
// is where recoverable failures are absorbed: undecodable images and inference
// errors become a low-confidence Generic prediction carrying the error message,
// so the request still succeeds. Only a request with no input at all is refused.

use crate::config::DoctorConfig;
use crate::core_modules::actions::{self, ACTION_CATALOG, ActionContext, ActionDescriptor, ActionResult};
use crate::core_modules::advice::{self, Advice};
use crate::core_modules::image_classifier::{ImageClassifier, StubClassifier, decode_image, load_classifier};
use crate::core_modules::knowledge_base::KnowledgeBase;
use crate::core_modules::text_classifier;
use crate::error::{DoctorError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::prediction::prediction::{DiseaseLabel, Prediction, Score};

pub const DEFAULT_CROP: &str = actions::DEFAULT_CROP;

/// Already-decoded input for `diagnose`.
#[derive(Debug, Clone, Default)]
pub struct DiagnosisInput {
    pub image: Option<RgbImage>,
    pub description: Option<String>,
}

impl DiagnosisInput {
    pub fn image(image: RgbImage) -> Self {
        Self {
            image: Some(image),
            description: None,
        }
    }

    pub fn description(text: impl Into<String>) -> Self {
        Self {
            image: None,
            description: Some(text.into()),
        }
    }
}

/// Raw request fields as a front end receives them.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub crop: Option<String>,
    pub description: Option<String>,
    pub image_bytes: Option<Vec<u8>>,
}

impl Submission {
    fn crop(&self) -> String {
        self.crop
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CROP)
            .to_string()
    }

    fn description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }

    fn image_bytes(&self) -> Option<&[u8]> {
        self.image_bytes.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub label: DiseaseLabel,
    pub friendly: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The response document for a successful diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisReport {
    pub ok: bool,
    pub timestamp: String,
    pub crop: String,
    pub prediction: PredictionView,
    pub advice: Vec<String>,
    pub actions: &'static [ActionDescriptor],
}

/// The main, top-level struct for the diagnosis engine.
pub struct DiagnosisPipeline {
    knowledge_base: Arc<KnowledgeBase>,
    classifier: Arc<dyn ImageClassifier>,
}

impl DiagnosisPipeline {
    pub fn new(knowledge_base: KnowledgeBase, classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            knowledge_base: Arc::new(knowledge_base),
            classifier,
        }
    }

    /// Builds the engine from configuration. A configured knowledge base file
    /// that cannot be read or lacks a Generic entry is fatal; a model that
    /// cannot be loaded is not.
    pub fn from_config(config: &DoctorConfig) -> Result<Self> {
        let knowledge_base = match &config.knowledge_base_path {
            Some(path) => {
                let kb = KnowledgeBase::from_path(path)?;
                info!(path = %path.display(), entries = kb.len(), "loaded knowledge base");
                kb
            }
            None => KnowledgeBase::builtin(),
        };
        Ok(Self::new(knowledge_base, load_classifier(config)))
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    pub fn classifier(&self) -> &dyn ImageClassifier {
        self.classifier.as_ref()
    }

    pub fn diagnose(&self, input: DiagnosisInput) -> Result<Prediction> {
        let prediction = match (input.image, input.description) {
            (Some(image), _) => self.classifier.classify(&image)?,
            (None, Some(description)) => text_classifier::classify(&description),
            (None, None) => return Err(DoctorError::InputMissing),
        };
        debug!(label = %prediction.label, score = prediction.score, "diagnosed");
        Ok(prediction)
    }

    pub fn advise_for(&self, label: &str) -> Advice {
        advice::resolve(&self.knowledge_base, label)
    }

    pub fn actions(&self) -> &'static [ActionDescriptor] {
        &ACTION_CATALOG
    }

    pub fn dispatch_action(&self, action_id: &str, context: &ActionContext) -> Result<ActionResult> {
        actions::dispatch(&self.knowledge_base, action_id, context)
    }

    /// Classifies a raw submission, absorbing every recoverable failure.
    pub fn predict(&self, submission: &Submission) -> Result<Prediction> {
        // Stage 1: Input selection. Image wins over description.
        let input = match submission.image_bytes() {
            Some(bytes) => match decode_image(bytes) {
                Ok(image) => DiagnosisInput::image(image),
                Err(e) => {
                    warn!("{e}");
                    return Ok(Prediction::degraded(e.to_string()));
                }
            },
            None => match submission.description() {
                Some(description) => DiagnosisInput::description(description),
                None => return Err(DoctorError::InputMissing),
            },
        };

        // Stage 2: Classification, degrading on inference failure.
        match self.diagnose(input) {
            Err(e @ DoctorError::Inference(_)) => {
                warn!("{e}");
                Ok(Prediction::degraded(e.to_string()))
            }
            other => other,
        }
    }

    pub fn report(&self, submission: &Submission) -> Result<DiagnosisReport> {
        self.report_at(submission, Utc::now())
    }

    pub fn report_at(&self, submission: &Submission, now: DateTime<Utc>) -> Result<DiagnosisReport> {
        let prediction = self.predict(submission)?;
        let advice = self.advise_for(&prediction.label);

        Ok(DiagnosisReport {
            ok: true,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, true),
            crop: submission.crop(),
            prediction: PredictionView {
                confidence: prediction.confidence(),
                label: prediction.label,
                friendly: advice.title,
                error: prediction.error,
            },
            advice: advice.steps,
            actions: self.actions(),
        })
    }
}

impl Default for DiagnosisPipeline {
    fn default() -> Self {
        Self::new(KnowledgeBase::builtin(), Arc::new(StubClassifier))
    }
}

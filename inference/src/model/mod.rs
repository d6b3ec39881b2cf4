pub mod artifacts;
pub mod onnx;
pub mod processor;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use image::RgbImage;
use log::{debug, info};
use ndarray::Array4;
use shared::{DecodedImage, PipelineError, VerdictProducer, VerdictResult};

use artifacts::{ModelArtifacts, ModelLoadError, default_label};
use onnx::OnnxClassifier;
use processor::ImageProcessor;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model runtime error: {0}")]
    Runtime(String),
    #[error("Model produced no output")]
    EmptyOutput,
    #[error("Model produced non-finite scores")]
    NonFinite,
}

impl From<InferenceError> for PipelineError {
    fn from(err: InferenceError) -> Self {
        PipelineError::Inference(err.to_string())
    }
}

/// A forward pass from an `NCHW` tensor to one logit per class.
pub trait Classifier: Send + Sync {
    fn logits(&self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    pub confidence: f32,
    pub probabilities: Vec<f32>,
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the largest entry; the first one wins on ties.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((idx, v)),
        })
}

/// Processor, classifier and label table, built once per process and then
/// only read.
pub struct ClassifierEngine {
    processor: ImageProcessor,
    classifier: Box<dyn Classifier>,
    labels: Vec<String>,
}

impl ClassifierEngine {
    pub fn new(processor: ImageProcessor, classifier: Box<dyn Classifier>, labels: Vec<String>) -> Self {
        Self {
            processor,
            classifier,
            labels,
        }
    }

    pub fn load(model_dir: &Path) -> Result<Self, ModelLoadError> {
        let artifacts = ModelArtifacts::locate(model_dir)?;
        let labels = artifacts.labels()?;
        let processor =
            ImageProcessor::new(artifacts.processor()?).map_err(|reason| ModelLoadError::Invalid {
                path: artifacts.processor_config.clone(),
                reason,
            })?;
        let classifier = OnnxClassifier::load(&artifacts.onnx, processor.output_size())?;
        info!(
            "Loaded model from {} ({} labels: {})",
            artifacts.dir.display(),
            labels.len(),
            labels.join(", ")
        );
        Ok(Self::new(processor, Box::new(classifier), labels))
    }

    pub fn predict(&self, pixels: &RgbImage) -> Result<Prediction, InferenceError> {
        let input = self.processor.preprocess(pixels);
        let logits = self.classifier.logits(input)?;
        if logits.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(InferenceError::NonFinite);
        }
        let probabilities = softmax(&logits);
        let (class_index, confidence) = argmax(&probabilities).ok_or(InferenceError::EmptyOutput)?;
        let label = self
            .labels
            .get(class_index)
            .cloned()
            .unwrap_or_else(|| default_label(class_index));
        Ok(Prediction {
            class_index,
            label,
            confidence,
            probabilities,
        })
    }
}

/// Verdicts from the loaded model, each forward pass bounded by `timeout`.
#[derive(Clone)]
pub struct ModelProducer {
    engine: Arc<ClassifierEngine>,
    algorithm: String,
    timeout: Duration,
}

impl ModelProducer {
    pub fn new(engine: ClassifierEngine, algorithm: impl Into<String>, timeout: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            algorithm: algorithm.into(),
            timeout,
        }
    }
}

impl VerdictProducer for ModelProducer {
    async fn produce(&self, image: DecodedImage) -> Result<VerdictResult, PipelineError> {
        let engine = Arc::clone(&self.engine);
        let id = image.upload.id;
        let job = web::block(move || engine.predict(&image.pixels));
        // An expired job keeps its blocking thread until the pass finishes.
        let prediction = tokio::time::timeout(self.timeout, job)
            .await
            .map_err(|_| PipelineError::InferenceTimeout(self.timeout))???;
        debug!(
            "Class probabilities for [{}]: {:?} (top {})",
            id, prediction.probabilities, prediction.class_index
        );
        Ok(VerdictResult::new(
            prediction.label,
            f64::from(prediction.confidence),
            self.algorithm.clone(),
        ))
    }
}

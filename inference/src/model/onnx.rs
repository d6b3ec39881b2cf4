use std::path::Path;

use log::info;
use ndarray::Array4;
use tract_onnx::prelude::*;

use super::artifacts::ModelLoadError;
use super::{Classifier, InferenceError};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX graph optimized once into a runnable plan. `run` takes `&self`, so a
/// single plan serves every in-flight request.
pub struct OnnxClassifier {
    plan: OnnxPlan,
}

impl OnnxClassifier {
    pub fn load(path: &Path, input_size: (u32, u32)) -> Result<Self, ModelLoadError> {
        let (height, width) = input_size;
        info!(
            "Loading ONNX graph {} with input 1x3x{}x{}",
            path.display(),
            height,
            width
        );
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        tvec!(1, 3, height as usize, width as usize),
                    ),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ModelLoadError::Onnx(format!("{}: {:?}", path.display(), e)))?;
        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn logits(&self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let shape = input.shape().to_vec();
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_shape(&shape, &data)
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let first = outputs.first().ok_or(InferenceError::EmptyOutput)?;
        let logits = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        Ok(logits.iter().copied().collect())
    }
}

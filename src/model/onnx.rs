//! ONNX Runtime regressor
//!
//! Expects a graph with one `1 x 41` float input and a scalar-per-row float
//! output, which is what skl2onnx produces for scikit-learn regressors.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::{InferenceError, Regressor};
use crate::features::{FeatureVector, FEATURE_COUNT};

pub struct OnnxRegressor {
    // `Session::run` needs exclusive access
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxRegressor {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        tracing::info!("Loading ONNX model from: {}", path.display());

        let session = Session::builder()
            .map_err(|e| InferenceError::Load(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Load(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| InferenceError::Load(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError::Load("No output defined".to_string()))?;

        if let Some(input) = session.inputs.first() {
            tracing::debug!(input = %input.name, output = %output_name, "ONNX graph signature");
        }

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        // Graph input is f32; out-of-range values saturate to +-inf
        let narrowed: Vec<f32> = features.iter().map(|x| *x as f32).collect();
        let input_array = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), narrowed)
            .map_err(|e| InferenceError::Runtime(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError::Runtime(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError::Runtime("No output".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Runtime(format!("Extract error: {}", e)))?;

        data.first()
            .map(|score| f64::from(*score))
            .ok_or_else(|| InferenceError::Runtime("Empty output tensor".to_string()))
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

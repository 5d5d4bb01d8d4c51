//! Inference Service
//!
//! Loads the grade regression model once at startup and exposes a single
//! `predict` over the 41-column feature vector. The artifact is opaque: all
//! this module relies on is "41 floats in, one real number out". The output
//! is NOT bounded; callers clamp it.
//!
//! Artifact formats, chosen by file extension:
//! - `.onnx` — ONNX Runtime session (see [`onnx`])
//! - `.json` — linear coefficients (see [`linear`])

pub mod linear;
pub mod onnx;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::ModelLoadPolicy;
use crate::features::{layout_hash, FeatureVector, FEATURE_COUNT};

pub use linear::LinearRegressor;
pub use onnx::OnnxRegressor;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("model expects {expected} features, artifact has {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("feature layout mismatch at column {index}: artifact has '{artifact}', server has '{server}'")]
    LayoutMismatch {
        index: usize,
        artifact: String,
        server: String,
    },

    #[error("model not loaded: {0}")]
    NotLoaded(String),

    #[error("inference failed: {0}")]
    Runtime(String),

    #[error("model returned NaN")]
    NotANumber,
}

// ============================================================================
// REGRESSOR TRAIT
// ============================================================================

/// A loaded model. Implementations must be usable from many requests at once.
pub trait Regressor: Send + Sync {
    /// Raw, unclamped score for one feature vector
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError>;

    /// Short engine name for status output
    fn kind(&self) -> &'static str;
}

/// Open a model artifact, dispatching on its extension
pub fn load_regressor(path: &Path) -> Result<Box<dyn Regressor>, InferenceError> {
    if !path.exists() {
        return Err(InferenceError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("onnx") => Ok(Box::new(OnnxRegressor::load(path)?)),
        Some("json") => Ok(Box::new(LinearRegressor::from_file(path)?)),
        Some(other) => Err(InferenceError::UnsupportedFormat(format!(".{}", other))),
        None => Err(InferenceError::UnsupportedFormat(
            "missing file extension".to_string(),
        )),
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Model metadata
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub model_type: String,
    pub features: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Engine status for operators
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_name: String,
    pub model_type: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub load_error: Option<String>,
    pub feature_count: usize,
    pub layout_hash: String,
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

/// Shared, read-only model handle plus latency counters.
///
/// Either holds a regressor, or the reason it could not be loaded
/// (degraded mode).
pub struct InferenceService {
    regressor: Option<Box<dyn Regressor>>,
    metadata: Option<ModelMetadata>,
    load_error: Option<String>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl InferenceService {
    /// Load the artifact at `path`
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        tracing::info!("Loading model from: {}", path.display());

        let regressor = load_regressor(path)?;
        let service = Self::from_regressor(path.display().to_string(), regressor);

        tracing::info!("Model loaded successfully ({})", service.model_type().unwrap_or("?"));
        Ok(service)
    }

    /// Load the artifact at `path`, applying `policy` on failure.
    ///
    /// `Strict` hands the error back to the caller; `Degraded` logs it and
    /// returns a service whose predictions fail with `NotLoaded`.
    pub fn load_with_policy(path: &Path, policy: ModelLoadPolicy) -> Result<Self, InferenceError> {
        match Self::load(path) {
            Ok(service) => Ok(service),
            Err(e) if policy == ModelLoadPolicy::Degraded => {
                tracing::error!(
                    "Could not load model from {}: {}. Serving health checks only",
                    path.display(),
                    e
                );
                Ok(Self::unavailable(&e))
            }
            Err(e) => Err(e),
        }
    }

    /// Wrap an already constructed regressor
    pub fn from_regressor(model_path: String, regressor: Box<dyn Regressor>) -> Self {
        let metadata = ModelMetadata {
            model_path,
            model_type: regressor.kind().to_string(),
            features: FEATURE_COUNT,
            loaded_at: Utc::now(),
        };

        Self {
            regressor: Some(regressor),
            metadata: Some(metadata),
            load_error: None,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Service with no model; every prediction fails with `NotLoaded`
    pub fn unavailable(error: &InferenceError) -> Self {
        Self {
            regressor: None,
            metadata: None,
            load_error: Some(error.to_string()),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.regressor.is_some()
    }

    fn model_type(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.model_type.as_str())
    }

    /// Raw model score. Fails on a missing model or a NaN output;
    /// infinities pass through for the caller to clamp.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let regressor = self.regressor.as_ref().ok_or_else(|| {
            InferenceError::NotLoaded(
                self.load_error
                    .clone()
                    .unwrap_or_else(|| "no model configured".to_string()),
            )
        })?;

        let start_time = Instant::now();
        let score = regressor.predict(features)?;
        let elapsed_us = start_time.elapsed().as_micros() as u64;

        // Track metrics
        self.latency_sum_us.fetch_add(elapsed_us, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if score.is_nan() {
            return Err(InferenceError::NotANumber);
        }

        tracing::debug!(raw_score = score, elapsed_us, "Inference complete");
        Ok(score)
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_loaded: self.is_loaded(),
            model_name: self
                .metadata
                .as_ref()
                .map(|m| m.model_path.clone())
                .unwrap_or_else(|| "None".to_string()),
            model_type: self.metadata.as_ref().map(|m| m.model_type.clone()),
            loaded_at: self.metadata.as_ref().map(|m| m.loaded_at),
            load_error: self.load_error.clone(),
            feature_count: FEATURE_COUNT,
            layout_hash: format!("{:08x}", layout_hash()),
            inference_count: count,
            avg_latency_ms: avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct Constant(f64);

    impl Regressor for Constant {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
            Ok(self.0)
        }

        fn kind(&self) -> &'static str {
            "constant"
        }
    }

    #[test]
    fn test_predict_counts_inferences() {
        let service = InferenceService::from_regressor("memory".into(), Box::new(Constant(12.5)));
        assert_eq!(service.predict(&[0.0; FEATURE_COUNT]).unwrap(), 12.5);
        assert_eq!(service.predict(&[1.0; FEATURE_COUNT]).unwrap(), 12.5);

        let status = service.status();
        assert!(status.model_loaded);
        assert_eq!(status.model_type.as_deref(), Some("constant"));
        assert_eq!(status.inference_count, 2);
        assert_eq!(status.feature_count, FEATURE_COUNT);
    }

    #[test]
    fn test_unbounded_output_passes_through() {
        let service = InferenceService::from_regressor("memory".into(), Box::new(Constant(-42.0)));
        assert_eq!(service.predict(&[0.0; FEATURE_COUNT]).unwrap(), -42.0);
    }

    #[test]
    fn test_infinite_output_passes_through() {
        let service = InferenceService::from_regressor("memory".into(), Box::new(Constant(f64::INFINITY)));
        assert_eq!(service.predict(&[0.0; FEATURE_COUNT]).unwrap(), f64::INFINITY);

        let service = InferenceService::from_regressor("memory".into(), Box::new(Constant(f64::NEG_INFINITY)));
        assert_eq!(service.predict(&[0.0; FEATURE_COUNT]).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_nan_output_is_error() {
        let service = InferenceService::from_regressor("memory".into(), Box::new(Constant(f64::NAN)));
        assert!(matches!(
            service.predict(&[0.0; FEATURE_COUNT]),
            Err(InferenceError::NotANumber)
        ));
    }

    #[test]
    fn test_huge_input_keeps_precision() {
        // Beyond f32 range; must reach the model as a finite f64
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[1] = 1.0; // age
        let model = LinearRegressor::new(0.0, coefficients).unwrap();
        let service = InferenceService::from_regressor("memory".into(), Box::new(model));

        let mut features = [0.0; FEATURE_COUNT];
        features[1] = 1e39;
        assert_eq!(service.predict(&features).unwrap(), 1e39);
    }

    #[test]
    fn test_strict_policy_returns_error() {
        let result = InferenceService::load_with_policy(
            Path::new("/definitely/not/here.onnx"),
            ModelLoadPolicy::Strict,
        );
        assert!(matches!(result, Err(InferenceError::NotFound(_))));
    }

    #[test]
    fn test_degraded_policy_returns_unloaded_service() {
        let service = InferenceService::load_with_policy(
            Path::new("/definitely/not/here.onnx"),
            ModelLoadPolicy::Degraded,
        )
        .unwrap();

        assert!(!service.is_loaded());
        let status = service.status();
        assert!(status.load_error.unwrap().contains("/definitely/not/here.onnx"));
        assert!(matches!(
            service.predict(&[0.0; FEATURE_COUNT]),
            Err(InferenceError::NotLoaded(_))
        ));
    }

    #[test]
    fn test_policy_ignored_on_success() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let model = serde_json::json!({
            "intercept": 11.0,
            "coefficients": vec![0.0; FEATURE_COUNT],
        });
        file.write_all(model.to_string().as_bytes()).unwrap();

        for policy in [ModelLoadPolicy::Strict, ModelLoadPolicy::Degraded] {
            let service = InferenceService::load_with_policy(file.path(), policy).unwrap();
            assert!(service.is_loaded());
            assert_eq!(service.predict(&[0.0; FEATURE_COUNT]).unwrap(), 11.0);
        }
    }

    #[test]
    fn test_unavailable_service() {
        let err = InferenceError::NotFound(PathBuf::from("/missing/model.onnx"));
        let service = InferenceService::unavailable(&err);

        assert!(!service.is_loaded());
        match service.predict(&[0.0; FEATURE_COUNT]) {
            Err(InferenceError::NotLoaded(reason)) => assert!(reason.contains("/missing/model.onnx")),
            other => panic!("expected NotLoaded, got {:?}", other.map(|_| ())),
        }

        let status = service.status();
        assert!(!status.model_loaded);
        assert_eq!(status.model_name, "None");
        assert!(status.load_error.is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let result = InferenceService::load(Path::new("/definitely/not/here.onnx"));
        assert!(matches!(result, Err(InferenceError::NotFound(_))));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let mut file = tempfile::Builder::new().suffix(".joblib").tempfile().unwrap();
        file.write_all(b"not a model").unwrap();

        let result = load_regressor(file.path());
        assert!(matches!(result, Err(InferenceError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_load_linear_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let model = serde_json::json!({
            "intercept": 2.0,
            "coefficients": vec![0.5; FEATURE_COUNT],
        });
        file.write_all(model.to_string().as_bytes()).unwrap();

        let service = InferenceService::load(file.path()).unwrap();
        assert_eq!(service.status().model_type.as_deref(), Some("linear"));
        let score = service.predict(&[2.0; FEATURE_COUNT]).unwrap();
        assert!((score - (2.0 + FEATURE_COUNT as f64)).abs() < 1e-9);
    }
}

//! Linear regression artifact
//!
//! JSON export of a fitted linear model:
//!
//! ```json
//! { "intercept": 1.3, "coefficients": [ ...41 values... ], "feature_names": [ ... ] }
//! ```
//!
//! `feature_names` is optional. When present it must match
//! [`FEATURE_LAYOUT`](crate::features::FEATURE_LAYOUT) column for column.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{InferenceError, Regressor};
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl LinearRegressor {
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Result<Self, InferenceError> {
        let model = Self {
            intercept,
            coefficients,
            feature_names: None,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_file(path: &Path) -> Result<Self, InferenceError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| InferenceError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, InferenceError> {
        let model: Self = serde_json::from_str(text)
            .map_err(|e| InferenceError::Load(format!("invalid linear model: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), InferenceError> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(InferenceError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: self.coefficients.len(),
            });
        }

        if let Some(names) = &self.feature_names {
            if names.len() != FEATURE_COUNT {
                return Err(InferenceError::FeatureCount {
                    expected: FEATURE_COUNT,
                    actual: names.len(),
                });
            }
            if let Some((index, (artifact, server))) = names
                .iter()
                .zip(FEATURE_LAYOUT.iter())
                .enumerate()
                .find(|(_, (artifact, server))| artifact.as_str() != **server)
            {
                return Err(InferenceError::LayoutMismatch {
                    index,
                    artifact: artifact.clone(),
                    server: server.to_string(),
                });
            }
        }

        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(InferenceError::Load("non-finite model parameter".to_string()));
        }

        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(coef, x)| coef * x)
            .sum();
        Ok(self.intercept + dot)
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dot_product() {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[25] = 0.4; // grade_period1
        coefficients[26] = 0.6; // grade_period2
        let model = LinearRegressor::new(0.5, coefficients).unwrap();

        let mut features = [0.0; FEATURE_COUNT];
        features[25] = 10.0;
        features[26] = 15.0;
        let score = model.predict(&features).unwrap();
        assert!((score - 13.5).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_coefficient_count() {
        let result = LinearRegressor::new(0.0, vec![1.0; 40]);
        assert!(matches!(
            result,
            Err(InferenceError::FeatureCount { expected: 41, actual: 40 })
        ));
    }

    #[test]
    fn test_matching_feature_names_accepted() {
        let text = json!({
            "intercept": 0.0,
            "coefficients": vec![1.0; FEATURE_COUNT],
            "feature_names": FEATURE_LAYOUT.to_vec(),
        })
        .to_string();
        assert!(LinearRegressor::from_json_str(&text).is_ok());
    }

    #[test]
    fn test_reordered_feature_names_rejected() {
        let mut names: Vec<&str> = FEATURE_LAYOUT.to_vec();
        names.swap(8, 9);
        let text = json!({
            "intercept": 0.0,
            "coefficients": vec![1.0; FEATURE_COUNT],
            "feature_names": names,
        })
        .to_string();

        match LinearRegressor::from_json_str(&text) {
            Err(InferenceError::LayoutMismatch { index, artifact, server }) => {
                assert_eq!(index, 8);
                assert_eq!(artifact, "past_failures");
                assert_eq!(server, "study_time");
            }
            other => panic!("expected layout mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            LinearRegressor::from_json_str("{\"intercept\": 1.0}"),
            Err(InferenceError::Load(_))
        ));
    }
}

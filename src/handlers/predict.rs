//! Prediction handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::AppJson;
use crate::category::{categorize, clamp_score, round_score, Category};
use crate::features::StudentFeatures;
use crate::prediction_log::PredictionLogRecord;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_score: f64,
    pub category: Category,
    pub detail: String,
}

/// Predict a student's final grade
pub async fn predict(
    State(state): State<AppState>,
    AppJson(features): AppJson<StudentFeatures>,
) -> AppResult<Json<PredictionResult>> {
    let vector = features.to_vector();

    let engine = state.engine.clone();
    let raw_score = tokio::task::spawn_blocking(move || engine.predict(&vector))
        .await
        .map_err(|e| AppError::InternalError(format!("Inference task failed: {}", e)))??;

    // The model extrapolates outside 0-20
    let score = clamp_score(raw_score);
    if score != raw_score {
        tracing::debug!(raw_score, score, "Clamped model output");
    }

    let category = categorize(score);
    let predicted_score = round_score(score);

    state
        .log
        .log(PredictionLogRecord::new(&features, predicted_score, category));

    Ok(Json(PredictionResult {
        predicted_score,
        category,
        detail: format!("Predicted Grade: {:.2}/20", predicted_score),
    }))
}

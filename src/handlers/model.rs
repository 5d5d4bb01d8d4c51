//! Model status handler

use axum::{extract::State, Json};

use crate::model::EngineStatus;
use crate::AppState;

pub async fn status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.engine.status())
}

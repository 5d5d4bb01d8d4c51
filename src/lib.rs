//! Student Grade Predictor
//!
//! Serves a pre-trained regression model that turns 41 student attributes
//! into a predicted final grade (0-20) and a performance category.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  GRADE PREDICTOR API                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  POST /predict                                           │
//! │     │                                                    │
//! │     ▼                                                    │
//! │  features ──► model (ONNX / linear) ──► clamp + category │
//! │                                              │           │
//! │                                              ▼           │
//! │                          prediction log (best-effort)    │
//! │                                              │           │
//! │                                       ┌──────▼──────┐    │
//! │                                       │ PostgreSQL  │    │
//! │                                       └─────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod category;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod handlers;
pub mod model;
pub mod prediction_log;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

use model::InferenceService;
use prediction_log::PredictionLog;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup, read-only afterwards
    pub engine: Arc<InferenceService>,
    pub log: PredictionLog,
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/model", get(handlers::model::status))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

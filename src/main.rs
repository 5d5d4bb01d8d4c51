//! Student Grade Predictor server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grade_predictor::{
    config::Config,
    create_router,
    model::InferenceService,
    prediction_log::PredictionLog,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    init_tracing(&config);

    tracing::info!("Student Grade Prediction API starting...");

    // Load model
    let engine = InferenceService::load_with_policy(&config.model_path, config.model_load_policy)
        .with_context(|| format!("Could not load model from {}", config.model_path.display()))?;

    // Prediction log
    let log = match &config.database_url {
        Some(url) => {
            tracing::info!("Prediction log: {}", config.database_host().unwrap_or("***"));
            PredictionLog::postgres(url.clone(), config.log_write_timeout)
        }
        None => {
            tracing::info!("DATABASE_URL not set, prediction logging disabled");
            PredictionLog::disabled()
        }
    };
    log.prepare().await;

    // Build application state
    let state = AppState {
        engine: Arc::new(engine),
        log,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grade_predictor=debug,tower_http=debug".into());

    let (json, text) = if config.json_logs {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

//! Configuration module

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// What to do when the model artifact cannot be loaded at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLoadPolicy {
    /// Exit the process
    Strict,
    /// Keep serving; `/predict` answers 503
    Degraded,
}

impl ModelLoadPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" | "fail-fast" => Some(Self::Strict),
            "degraded" | "permissive" => Some(Self::Degraded),
            _ => None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Path to the model artifact (`.onnx` or `.json`)
    pub model_path: PathBuf,

    /// Startup behaviour on model load failure
    pub model_load_policy: ModelLoadPolicy,

    /// Prediction log database URL; logging is disabled when unset
    pub database_url: Option<String>,

    /// Upper bound on a single prediction log write
    pub log_write_timeout: Duration,

    /// Emit JSON log lines instead of text
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            model_path: PathBuf::from("model/student_grade_model.onnx"),
            model_load_policy: ModelLoadPolicy::Degraded,
            database_url: None,
            log_write_timeout: Duration::from_millis(2000),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),

            model_load_policy: lookup("MODEL_LOAD_POLICY")
                .and_then(|p| ModelLoadPolicy::parse(&p))
                .unwrap_or(defaults.model_load_policy),

            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),

            log_write_timeout: lookup("LOG_WRITE_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.log_write_timeout),

            json_logs: lookup("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_logs),
        }
    }

    /// Database host for log lines, credentials stripped
    pub fn database_host(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(|url| url.rsplit('@').next().unwrap_or("***"))
    }
}

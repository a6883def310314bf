use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub storage_path: PathBuf,
    pub practice_count: u32,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Local .env first; real environment variables still win.
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let backend_url = settings
            .get_string("backend.url")
            .or_else(|_| env::var("TUTOR_API_URL"))
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let request_timeout_secs = settings
            .get_int("backend.timeout_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let storage_path = settings
            .get_string("storage.path")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_storage_path());

        let practice_count = settings
            .get_int("practice.count")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| (1..=10).contains(v))
            .unwrap_or(crate::services::submission_flow::DEFAULT_PRACTICE_COUNT);

        let otlp_endpoint = settings
            .get_string("telemetry.otlp_endpoint")
            .or_else(|_| env::var("OTEL_EXPORTER_OTLP_ENDPOINT"))
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Config {
            backend_url,
            request_timeout_secs,
            storage_path,
            practice_count,
            otlp_endpoint,
        })
    }
}

fn default_storage_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("homework-tutor");
    path.push("state.json");
    path
}

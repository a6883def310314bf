pub mod cli;
pub mod config;
pub mod metrics;
pub mod models;
pub mod render;
pub mod services;

pub use config::Config;
pub use services::AppState;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

pub mod backend;
pub mod canvas;
pub mod reveal;
pub mod session_store;
pub mod storage;
pub mod submission_flow;

use backend::HttpTutorBackend;
use session_store::SessionStore;
use storage::FileStorage;
use submission_flow::SubmissionFlow;

/// Root composition of the client: one store shared by every view and the
/// flow controller that mutates it.
pub struct AppState {
    pub config: Config,
    pub store: SessionStore,
    pub flow: SubmissionFlow,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
        tracing::info!("Using session storage at {}", storage.path().display());
        let store = SessionStore::load(storage);

        let backend = HttpTutorBackend::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        tracing::info!("Tutoring backend: {}", config.backend_url);

        let flow = SubmissionFlow::new(store.clone(), Arc::new(backend))
            .with_practice_count(config.practice_count);

        Ok(Self {
            config,
            store,
            flow,
        })
    }
}

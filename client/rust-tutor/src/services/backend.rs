use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::metrics::track_backend_call;
use crate::models::{
    CreateSessionRequest, FileUpload, Guidance, LearningSession, PracticeProblem, PracticeQuery,
    PracticeResponse, Provider, Submission,
};

pub const PROVIDER_HEADER: &str = "x-provider";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Api {
        status: u16,
        detail: Option<String>,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Single displayable line for the user; `fallback` covers failures
    /// that carry no message from the backend.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            BackendError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            BackendError::InvalidRequest(reason) => reason.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Pulls a human readable message out of an error body: a `detail` string,
/// else the `msg` of every entry of a `detail` list, else `message`.
pub fn extract_error_detail(body: &serde_json::Value) -> Option<String> {
    match body.get("detail") {
        Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => {
            return Some(detail.clone());
        }
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|v| v.as_str()).or(item.as_str()))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    body.get("message")
        .and_then(|v| v.as_str())
        .filter(|message| !message.trim().is_empty())
        .map(|message| message.to_string())
}

/// Credentials forwarded with guidance requests.
#[derive(Debug, Clone, Default)]
pub struct ProviderHeaders {
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
}

/// Narrow contract of the tutoring backend.
#[async_trait]
pub trait TutorBackend: Send + Sync {
    async fn submit_text(
        &self,
        text: &str,
        session_id: Option<&str>,
    ) -> Result<Submission, BackendError>;

    async fn submit_file(
        &self,
        upload: &FileUpload,
        session_id: Option<&str>,
    ) -> Result<Submission, BackendError>;

    async fn fetch_guidance(
        &self,
        submission_id: Uuid,
        problem_index: usize,
        headers: &ProviderHeaders,
    ) -> Result<Guidance, BackendError>;

    async fn fetch_practice(
        &self,
        submission_id: Uuid,
        query: &PracticeQuery,
    ) -> Result<Vec<PracticeProblem>, BackendError>;

    async fn get_submission(&self, submission_id: Uuid) -> Result<Submission, BackendError>;

    async fn create_session(
        &self,
        student_level: Option<u32>,
    ) -> Result<LearningSession, BackendError>;
}

/// `reqwest` implementation against the backend's `/submissions` routes.
pub struct HttpTutorBackend {
    http_client: Client,
    base_url: String,
}

impl HttpTutorBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        // Parse once so a bad config fails at startup rather than per request.
        let parsed = Url::parse(base_url)?;
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| extract_error_detail(&value));
            tracing::debug!("Backend error {}: {}", status, body);
            return Err(BackendError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TutorBackend for HttpTutorBackend {
    async fn submit_text(
        &self,
        text: &str,
        session_id: Option<&str>,
    ) -> Result<Submission, BackendError> {
        let url = self.url("/submissions/text");
        tracing::debug!("Submitting text ({} chars) to {}", text.len(), url);

        let mut form = vec![("text", text)];
        if let Some(session_id) = session_id {
            form.push(("session_id", session_id));
        }

        track_backend_call("submit_text", async move {
            let response = self.http_client.post(&url).form(&form).send().await?;
            Self::decode(response).await
        })
        .await
    }

    async fn submit_file(
        &self,
        upload: &FileUpload,
        session_id: Option<&str>,
    ) -> Result<Submission, BackendError> {
        upload
            .validate()
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;

        let url = self.url("/submissions/upload");
        tracing::debug!(
            "Uploading {} ({} bytes) to {}",
            upload.file_name,
            upload.bytes.len(),
            url
        );

        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(session_id) = session_id {
            form = form.text("session_id", session_id.to_string());
        }

        track_backend_call("submit_file", async move {
            let response = self.http_client.post(&url).multipart(form).send().await?;
            Self::decode(response).await
        })
        .await
    }

    async fn fetch_guidance(
        &self,
        submission_id: Uuid,
        problem_index: usize,
        headers: &ProviderHeaders,
    ) -> Result<Guidance, BackendError> {
        let url = self.url(&format!("/submissions/{}/guidance", submission_id));
        tracing::debug!(
            "Fetching guidance: submission={}, problem_index={}, provider={:?}",
            submission_id,
            problem_index,
            headers.provider
        );

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("problem_index", problem_index)]);
        if let Some(provider) = headers.provider {
            request = request.header(PROVIDER_HEADER, provider.as_str());
        }
        if let Some(api_key) = headers.api_key.as_deref() {
            request = request.header(API_KEY_HEADER, api_key);
        }

        track_backend_call("guidance", async move {
            let response = request.send().await?;
            Self::decode(response).await
        })
        .await
    }

    async fn fetch_practice(
        &self,
        submission_id: Uuid,
        query: &PracticeQuery,
    ) -> Result<Vec<PracticeProblem>, BackendError> {
        query
            .validate()
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;

        let url = self.url(&format!("/submissions/{}/practice", submission_id));
        tracing::debug!(
            "Fetching {} practice problems: submission={}, problem_index={}",
            query.count,
            submission_id,
            query.problem_index
        );

        let response: PracticeResponse = track_backend_call("practice", async move {
            let response = self.http_client.get(&url).query(query).send().await?;
            Self::decode(response).await
        })
        .await?;

        Ok(response.practice_problems)
    }

    async fn get_submission(&self, submission_id: Uuid) -> Result<Submission, BackendError> {
        let url = self.url(&format!("/submissions/{}", submission_id));

        track_backend_call("get_submission", async move {
            let response = self.http_client.get(&url).send().await?;
            Self::decode(response).await
        })
        .await
    }

    async fn create_session(
        &self,
        student_level: Option<u32>,
    ) -> Result<LearningSession, BackendError> {
        let url = self.url("/submissions/sessions");
        let body = CreateSessionRequest { student_level };

        track_backend_call("create_session", async move {
            let response = self.http_client.post(&url).json(&body).send().await?;
            Self::decode(response).await
        })
        .await
    }
}

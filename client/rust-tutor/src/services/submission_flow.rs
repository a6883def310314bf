use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::metrics::SUBMISSIONS_TOTAL;
use crate::models::{
    submission::ALLOWED_EXTENSIONS, ChatMessage, FileUpload, Persona, PracticeQuery, Submission,
};
use crate::services::backend::{BackendError, ProviderHeaders, TutorBackend};
use crate::services::canvas::{Background, DrawingCanvas};
use crate::services::session_store::{RequestLane, RequestTicket, SessionStore};

pub const DEFAULT_PRACTICE_COUNT: u32 = 5;

pub const EMPTY_CANVAS_MESSAGE: &str = "The whiteboard is empty. Draw your problem first.";
pub const CANVAS_ERROR_PREFIX: &str = "Failed to capture whiteboard: ";
pub const WHITEBOARD_LABEL: &str = "🎨 Whiteboard drawing";
const NO_SUBMISSION_MESSAGE: &str = "Submit a problem first.";
const QUESTION_PENDING_MESSAGE: &str = "Wait for the current question to finish.";

const TEXT_FALLBACK: &str = "Failed to submit. Please try again.";
const UPLOAD_FALLBACK: &str = "Upload failed. Please try again.";
const GUIDANCE_FALLBACK: &str = "Failed to load guidance";
const PRACTICE_FALLBACK: &str = "Failed to load practice problems";
const SESSION_FALLBACK: &str = "Failed to start a session";
const REFRESH_FALLBACK: &str = "Failed to load submission";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing changed.
    Skipped,
    /// Rejected before any network call; the reason is in the store's error.
    Rejected(String),
    Completed,
    Failed(String),
    /// A newer request started while this one was in flight.
    Superseded,
}

impl SubmitOutcome {
    fn label(&self) -> &'static str {
        match self {
            SubmitOutcome::Skipped => "skipped",
            SubmitOutcome::Rejected(_) => "rejected",
            SubmitOutcome::Completed => "completed",
            SubmitOutcome::Failed(_) => "failed",
            SubmitOutcome::Superseded => "superseded",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SubmissionKind {
    Text,
    File,
    Whiteboard,
    Problem,
    Practice,
    Refresh,
}

impl SubmissionKind {
    fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Text => "text",
            SubmissionKind::File => "file",
            SubmissionKind::Whiteboard => "whiteboard",
            SubmissionKind::Problem => "problem",
            SubmissionKind::Practice => "practice",
            SubmissionKind::Refresh => "refresh",
        }
    }

    fn fallback(&self) -> &'static str {
        match self {
            SubmissionKind::Text => TEXT_FALLBACK,
            SubmissionKind::File | SubmissionKind::Whiteboard => UPLOAD_FALLBACK,
            SubmissionKind::Problem => GUIDANCE_FALLBACK,
            SubmissionKind::Practice => PRACTICE_FALLBACK,
            SubmissionKind::Refresh => REFRESH_FALLBACK,
        }
    }
}

enum Payload<'a> {
    Text(&'a str),
    File(FileUpload),
    Whiteboard {
        canvas: &'a dyn DrawingCanvas,
        shape_ids: Vec<String>,
    },
}

impl Payload<'_> {
    fn kind(&self) -> SubmissionKind {
        match self {
            Payload::Text(_) => SubmissionKind::Text,
            Payload::File(_) => SubmissionKind::File,
            Payload::Whiteboard { .. } => SubmissionKind::Whiteboard,
        }
    }
}

/// Ends the request cycle on every exit path; the store keeps the loading
/// flag up while another current cycle is still running.
struct LoadingGuard<'a> {
    store: &'a SessionStore,
    ticket: RequestTicket,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.finish_request(self.ticket);
    }
}

/// Drives one request cycle from user intent to a recorded chat turn.
#[derive(Clone)]
pub struct SubmissionFlow {
    store: SessionStore,
    backend: Arc<dyn TutorBackend>,
    practice_count: u32,
    whiteboard_background: Background,
}

impl SubmissionFlow {
    pub fn new(store: SessionStore, backend: Arc<dyn TutorBackend>) -> Self {
        Self {
            store,
            backend,
            practice_count: DEFAULT_PRACTICE_COUNT,
            whiteboard_background: Background::Opaque,
        }
    }

    pub fn with_practice_count(mut self, count: u32) -> Self {
        self.practice_count = count;
        self
    }

    /// Background of the rendered whiteboard image; opaque unless set.
    pub fn with_whiteboard_background(mut self, background: Background) -> Self {
        self.whiteboard_background = background;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn submit_text(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Skipped;
        }
        self.run_cycle(ChatMessage::user_text(text), Payload::Text(text))
            .await
    }

    pub async fn submit_file(&self, upload: FileUpload) -> SubmitOutcome {
        if let Err(e) = upload.validate() {
            return self.reject(SubmissionKind::File, describe_validation(&e));
        }
        if !upload.has_allowed_extension() {
            return self.reject(
                SubmissionKind::File,
                format!("File type not allowed. Allowed: {}", ALLOWED_EXTENSIONS.join(", ")),
            );
        }

        let label = ChatMessage::user_text(format!("📎 {}", upload.file_name));
        self.run_cycle(label, Payload::File(upload)).await
    }

    pub async fn submit_whiteboard(&self, canvas: &dyn DrawingCanvas) -> SubmitOutcome {
        let shape_ids = canvas.shape_ids();
        if shape_ids.is_empty() {
            return self.reject(SubmissionKind::Whiteboard, EMPTY_CANVAS_MESSAGE.to_string());
        }

        self.run_cycle(
            ChatMessage::user_text(WHITEBOARD_LABEL),
            Payload::Whiteboard { canvas, shape_ids },
        )
        .await
    }

    fn reject(&self, kind: SubmissionKind, reason: String) -> SubmitOutcome {
        tracing::info!("Rejected {} submission: {}", kind.as_str(), reason);
        self.store.set_error(Some(reason.clone()));
        record(kind, SubmitOutcome::Rejected(reason))
    }

    async fn run_cycle(&self, user_message: ChatMessage, payload: Payload<'_>) -> SubmitOutcome {
        let kind = payload.kind();
        let ticket = self.store.begin_request(RequestLane::Question);
        self.store.set_error(None);
        // Recorded before the first await so the turn shows up immediately.
        self.store.append_message(user_message);
        let _loading = LoadingGuard {
            store: &self.store,
            ticket,
        };

        tracing::info!("Starting {} submission", kind.as_str());

        let outcome = self.submit_and_guide(ticket, kind, payload).await;
        record(kind, outcome)
    }

    async fn submit_and_guide(
        &self,
        ticket: RequestTicket,
        kind: SubmissionKind,
        payload: Payload<'_>,
    ) -> SubmitOutcome {
        let session_id = self.store.session_id();
        let session_id = session_id.as_deref();

        let submitted = match payload {
            Payload::Text(text) => self.backend.submit_text(text, session_id).await,
            Payload::File(upload) => self.backend.submit_file(&upload, session_id).await,
            Payload::Whiteboard { canvas, shape_ids } => {
                match canvas.render(&shape_ids, self.whiteboard_background).await {
                    Ok(image) => {
                        self.backend
                            .submit_file(&image.into_upload(), session_id)
                            .await
                    }
                    Err(e) => {
                        return self.fail(ticket, format!("{}{}", CANVAS_ERROR_PREFIX, e));
                    }
                }
            }
        };

        let submission = match submitted {
            Ok(submission) => submission,
            Err(e) => return self.fail_backend(ticket, &e, kind.fallback()),
        };
        if !self.store.is_current(ticket) {
            return superseded(ticket);
        }

        tracing::info!(
            "Submission {} accepted with {} problem(s)",
            submission.id,
            submission.parsed_problems.len()
        );
        self.store.set_submission(Some(submission.clone()));
        self.store.set_problem_index(0);
        self.store.set_practice_problems(Vec::new());

        self.guide(ticket, &submission, 0).await
    }

    async fn guide(
        &self,
        ticket: RequestTicket,
        submission: &Submission,
        problem_index: usize,
    ) -> SubmitOutcome {
        let headers = self.provider_headers();
        let guidance = match self
            .backend
            .fetch_guidance(submission.id, problem_index, &headers)
            .await
        {
            Ok(guidance) => guidance,
            Err(e) => return self.fail_backend(ticket, &e, SubmissionKind::Problem.fallback()),
        };
        if !self.store.is_current(ticket) {
            return superseded(ticket);
        }

        self.store.set_guidance(Some(guidance.clone()));
        self.store
            .append_message(ChatMessage::assistant_guidance(guidance));
        SubmitOutcome::Completed
    }

    fn fail_backend(&self, ticket: RequestTicket, error: &BackendError, fallback: &str) -> SubmitOutcome {
        tracing::error!("Backend request failed: {}", error);
        self.fail(ticket, error.user_message(fallback))
    }

    fn fail(&self, ticket: RequestTicket, message: String) -> SubmitOutcome {
        if !self.store.is_current(ticket) {
            return superseded(ticket);
        }
        self.store.set_error(Some(message.clone()));
        SubmitOutcome::Failed(message)
    }

    fn provider_headers(&self) -> ProviderHeaders {
        let settings = self.store.settings();
        ProviderHeaders {
            provider: Some(settings.provider),
            api_key: settings.api_key,
        }
    }

    /// Switches to another parsed problem of the current submission and
    /// loads its guidance.
    pub async fn select_problem(&self, index: usize) -> SubmitOutcome {
        let Some(submission) = self.store.submission() else {
            return self.reject(SubmissionKind::Problem, NO_SUBMISSION_MESSAGE.to_string());
        };
        if submission.problem(index).is_none() {
            return self.reject(
                SubmissionKind::Problem,
                format!(
                    "Problem {} does not exist (submission has {})",
                    index + 1,
                    submission.parsed_problems.len()
                ),
            );
        }
        // Switching would supersede a question whose turn is already shown.
        if self.store.is_pending(RequestLane::Question) {
            return self.reject(
                SubmissionKind::Problem,
                QUESTION_PENDING_MESSAGE.to_string(),
            );
        }

        let ticket = self.store.begin_request(RequestLane::Question);
        self.store.set_error(None);
        let _loading = LoadingGuard {
            store: &self.store,
            ticket,
        };

        self.store.set_problem_index(index);
        self.store.set_practice_problems(Vec::new());
        let outcome = self.guide(ticket, &submission, index).await;
        record(SubmissionKind::Problem, outcome)
    }

    /// Fetches practice variants for the current problem into the store.
    pub async fn load_practice(&self, count: Option<u32>) -> SubmitOutcome {
        let Some(submission) = self.store.submission() else {
            return self.reject(SubmissionKind::Practice, NO_SUBMISSION_MESSAGE.to_string());
        };
        let query = PracticeQuery {
            problem_index: self.store.problem_index(),
            count: count.unwrap_or(self.practice_count),
        };
        if let Err(e) = query.validate() {
            return self.reject(SubmissionKind::Practice, describe_validation(&e));
        }

        let ticket = self.store.begin_request(RequestLane::Practice);
        self.store.set_error(None);
        let _loading = LoadingGuard {
            store: &self.store,
            ticket,
        };

        let outcome = match self.backend.fetch_practice(submission.id, &query).await {
            Ok(_) if !self.store.is_current(ticket) => superseded(ticket),
            // A new question or problem landed while practice was loading.
            Ok(_) if !self.on_problem(submission.id, query.problem_index) => {
                superseded(ticket)
            }
            Ok(problems) => {
                tracing::info!(
                    "Loaded {} practice problem(s) for submission {}",
                    problems.len(),
                    submission.id
                );
                self.store.set_practice_problems(problems);
                SubmitOutcome::Completed
            }
            Err(e) => self.fail_backend(ticket, &e, SubmissionKind::Practice.fallback()),
        };
        record(SubmissionKind::Practice, outcome)
    }

    fn on_problem(&self, submission_id: Uuid, problem_index: usize) -> bool {
        self.store.problem_index() == problem_index
            && self
                .store
                .submission()
                .is_some_and(|current| current.id == submission_id)
    }

    /// Reloads the current submission from the backend.
    pub async fn refresh_submission(&self) -> SubmitOutcome {
        let Some(current) = self.store.submission() else {
            return self.reject(SubmissionKind::Refresh, NO_SUBMISSION_MESSAGE.to_string());
        };

        let outcome = match self.backend.get_submission(current.id).await {
            Ok(submission) => {
                let still_current = self
                    .store
                    .submission()
                    .is_some_and(|stored| stored.id == submission.id);
                if still_current {
                    self.store.set_submission(Some(submission));
                    SubmitOutcome::Completed
                } else {
                    tracing::warn!("Discarding refresh of replaced submission {}", current.id);
                    SubmitOutcome::Superseded
                }
            }
            Err(e) => {
                tracing::error!("Failed to refresh submission {}: {}", current.id, e);
                let message = e.user_message(REFRESH_FALLBACK);
                self.store.set_error(Some(message.clone()));
                SubmitOutcome::Failed(message)
            }
        };
        record(SubmissionKind::Refresh, outcome)
    }

    /// Returns the stored session id, creating a backend session first if
    /// there is none yet.
    pub async fn ensure_session(&self, persona: Persona) -> Option<String> {
        if let Some(session_id) = self.store.session_id() {
            return Some(session_id);
        }

        match self.backend.create_session(Some(persona.grade_level())).await {
            Ok(session) => {
                let session_id = session.id.to_string();
                tracing::info!(
                    "Learning session {} started at grade level {}",
                    session_id,
                    persona.grade_level()
                );
                self.store.set_session_id(Some(session_id.clone()));
                Some(session_id)
            }
            Err(e) => {
                tracing::error!("Failed to create learning session: {}", e);
                self.store.set_error(Some(e.user_message(SESSION_FALLBACK)));
                None
            }
        }
    }
}

fn superseded(ticket: RequestTicket) -> SubmitOutcome {
    tracing::warn!("Discarding response of superseded request {:?}", ticket);
    SubmitOutcome::Superseded
}

fn record(kind: SubmissionKind, outcome: SubmitOutcome) -> SubmitOutcome {
    SUBMISSIONS_TOTAL
        .with_label_values(&[kind.as_str(), outcome.label()])
        .inc();
    outcome
}

fn describe_validation(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|field_errors| field_errors.iter())
        .map(|error| {
            error
                .message
                .as_ref()
                .map(|message| message.to_string())
                .unwrap_or_else(|| error.code.to_string())
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use homework_tutor::models::{
    FileUpload, Guidance, GuidanceStep, LearningSession, ParsedProblem, PracticeProblem,
    PracticeQuery, Provider, RevealKind, RevealStep, Submission,
};
use homework_tutor::services::backend::{BackendError, ProviderHeaders, TutorBackend};
use homework_tutor::services::canvas::{Background, CanvasError, DrawingCanvas, RenderedImage};
use homework_tutor::services::session_store::SessionStore;
use homework_tutor::services::storage::MemoryStorage;
use homework_tutor::services::submission_flow::SubmissionFlow;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn sample_submission(problems: usize) -> Submission {
    Submission {
        id: Uuid::new_v4(),
        subject: Some("algebra".to_string()),
        topic: Some("linear equations".to_string()),
        grade_level: Some(8),
        difficulty: Some("medium".to_string()),
        raw_text: None,
        parsed_problems: (0..problems)
            .map(|i| ParsedProblem {
                text: format!("Solve {}x + 5 = 13", i + 2),
                order: i as u32 + 1,
                problem_type: Some("equation".to_string()),
            })
            .collect(),
        created_at: None,
    }
}

pub fn sample_guidance() -> Guidance {
    Guidance {
        micro_explanation: "Undo operations in reverse order.".to_string(),
        step_breakdown: vec![GuidanceStep {
            order: 1,
            text: "Subtract 5 from both sides".to_string(),
            hint: Some("What cancels +5?".to_string()),
        }],
        error_warnings: vec!["Apply each step to both sides".to_string()],
        interactive_checks: Vec::new(),
        reveal_sequence: vec![
            reveal(1, "Start by removing the constant.", RevealKind::Hint),
            reveal(2, "2x = 8", RevealKind::Partial),
            reveal(3, "x = 4", RevealKind::Full),
        ],
    }
}

pub fn reveal(level: u8, content: &str, kind: RevealKind) -> RevealStep {
    RevealStep {
        level,
        content: content.to_string(),
        kind,
    }
}

pub fn sample_practice(count: usize) -> Vec<PracticeProblem> {
    (0..count)
        .map(|i| PracticeProblem {
            id: Some(format!("p{}", i + 1)),
            text: format!("Solve 3x + {} = 20", i + 1),
            difficulty: "same".to_string(),
            variation_type: "numbers".to_string(),
            solution: None,
        })
        .collect()
}

/// Scripted answer of the fake backend; rebuilt into a `BackendError` on
/// every call.
#[derive(Clone)]
pub enum Reply<T> {
    Ok(T),
    Fail { status: u16, detail: Option<String> },
}

impl<T: Clone> Reply<T> {
    fn get(&self) -> Result<T, BackendError> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Fail { status, detail } => Err(BackendError::Api {
                status: *status,
                detail: detail.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuidanceRequest {
    pub submission_id: Uuid,
    pub problem_index: usize,
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
}

pub struct FakeBackend {
    pub submission: Mutex<Reply<Submission>>,
    pub guidance: Mutex<Reply<Guidance>>,
    pub practice: Mutex<Reply<Vec<PracticeProblem>>>,
    pub session: Mutex<Reply<LearningSession>>,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    practice_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    submit_calls: AtomicUsize,
    pub texts: Mutex<Vec<(String, Option<String>)>>,
    pub uploads: Mutex<Vec<FileUpload>>,
    pub guidance_requests: Mutex<Vec<GuidanceRequest>>,
    pub practice_requests: Mutex<Vec<PracticeQuery>>,
    pub session_levels: Mutex<Vec<Option<u32>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            submission: Mutex::new(Reply::Ok(sample_submission(2))),
            guidance: Mutex::new(Reply::Ok(sample_guidance())),
            practice: Mutex::new(Reply::Ok(sample_practice(5))),
            session: Mutex::new(Reply::Ok(LearningSession {
                id: Uuid::new_v4(),
                student_level: None,
                pace: None,
                scaffolding_mode: None,
                started_at: None,
            })),
            gates: Mutex::new(VecDeque::new()),
            practice_gates: Mutex::new(VecDeque::new()),
            submit_calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            guidance_requests: Mutex::new(Vec::new()),
            practice_requests: Mutex::new(Vec::new()),
            session_levels: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_submit(&self, status: u16, detail: Option<&str>) {
        *self.submission.lock().unwrap() = Reply::Fail {
            status,
            detail: detail.map(str::to_string),
        };
    }

    pub fn fail_guidance(&self, status: u16, detail: Option<&str>) {
        *self.guidance.lock().unwrap() = Reply::Fail {
            status,
            detail: detail.map(str::to_string),
        };
    }

    /// Holds the next submit call until the returned sender fires (or is
    /// dropped).
    pub fn gate_next_submit(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn gate_next_practice(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.practice_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    async fn enter_submit(&self) {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }
}

#[async_trait]
impl TutorBackend for FakeBackend {
    async fn submit_text(
        &self,
        text: &str,
        session_id: Option<&str>,
    ) -> Result<Submission, BackendError> {
        self.texts
            .lock()
            .unwrap()
            .push((text.to_string(), session_id.map(str::to_string)));
        self.enter_submit().await;
        let reply = self.submission.lock().unwrap().clone();
        reply.get()
    }

    async fn submit_file(
        &self,
        upload: &FileUpload,
        _session_id: Option<&str>,
    ) -> Result<Submission, BackendError> {
        self.uploads.lock().unwrap().push(upload.clone());
        self.enter_submit().await;
        let reply = self.submission.lock().unwrap().clone();
        reply.get()
    }

    async fn fetch_guidance(
        &self,
        submission_id: Uuid,
        problem_index: usize,
        headers: &ProviderHeaders,
    ) -> Result<Guidance, BackendError> {
        self.guidance_requests.lock().unwrap().push(GuidanceRequest {
            submission_id,
            problem_index,
            provider: headers.provider,
            api_key: headers.api_key.clone(),
        });
        let reply = self.guidance.lock().unwrap().clone();
        reply.get()
    }

    async fn fetch_practice(
        &self,
        _submission_id: Uuid,
        query: &PracticeQuery,
    ) -> Result<Vec<PracticeProblem>, BackendError> {
        self.practice_requests.lock().unwrap().push(query.clone());
        let gate = self.practice_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let reply = self.practice.lock().unwrap().clone();
        reply.get()
    }

    async fn get_submission(&self, _submission_id: Uuid) -> Result<Submission, BackendError> {
        let reply = self.submission.lock().unwrap().clone();
        reply.get()
    }

    async fn create_session(
        &self,
        student_level: Option<u32>,
    ) -> Result<LearningSession, BackendError> {
        self.session_levels.lock().unwrap().push(student_level);
        let reply = self.session.lock().unwrap().clone();
        reply.get()
    }
}

pub struct FakeCanvas {
    pub shapes: Vec<String>,
    pub failure: Option<String>,
    pub rendered: Mutex<Vec<(Vec<String>, Background)>>,
}

impl FakeCanvas {
    pub fn with_shapes(shapes: &[&str]) -> Self {
        Self {
            shapes: shapes.iter().map(|s| s.to_string()).collect(),
            failure: None,
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(shapes: &[&str], reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::with_shapes(shapes)
        }
    }
}

#[async_trait]
impl DrawingCanvas for FakeCanvas {
    fn shape_ids(&self) -> Vec<String> {
        self.shapes.clone()
    }

    async fn render(
        &self,
        shape_ids: &[String],
        background: Background,
    ) -> Result<RenderedImage, CanvasError> {
        self.rendered
            .lock()
            .unwrap()
            .push((shape_ids.to_vec(), background));
        match &self.failure {
            Some(reason) => Err(CanvasError::Render(reason.clone())),
            None => Ok(RenderedImage {
                png: vec![0x89, b'P', b'N', b'G'],
            }),
        }
    }
}

pub fn create_test_flow() -> (SubmissionFlow, Arc<FakeBackend>, Arc<MemoryStorage>) {
    init_tracing();
    let storage = Arc::new(MemoryStorage::new());
    let backend = Arc::new(FakeBackend::new());
    let store = SessionStore::new(storage.clone());
    let flow = SubmissionFlow::new(store, backend.clone());
    (flow, backend, storage)
}

/// Polls `condition` until it holds; panics after roughly a second.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_mock_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("mock backend has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("mock backend stopped");
    });
    format!("http://{}/api", addr)
}

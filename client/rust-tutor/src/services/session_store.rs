use std::sync::{Arc, Mutex, MutexGuard};

use crate::metrics::REVEALS_TOTAL;
use crate::models::{ChatMessage, Guidance, PracticeProblem, Settings, SettingsUpdate, Submission};
use crate::services::reveal::{self, RevealView};
use crate::services::storage::{PersistedState, StateStorage};

/// Everything the client knows about the current visit.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub session_id: Option<String>,
    pub settings: Settings,
    pub history: Vec<ChatMessage>,
    pub submission: Option<Submission>,
    pub guidance: Option<Guidance>,
    pub practice_problems: Vec<PracticeProblem>,
    pub problem_index: usize,
    pub reveal_level: u8,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl StoreState {
    fn persisted(&self) -> PersistedState {
        PersistedState {
            session_id: self.session_id.clone(),
            settings: self.settings.clone(),
            history: self.history.clone(),
        }
    }
}

/// Independent streams of requests. A newer request only supersedes older
/// ones on the same lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLane {
    /// Submissions and guidance for the current problem.
    Question,
    Practice,
}

/// Identifies one request cycle; only the newest ticket of its lane may
/// publish results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    lane: RequestLane,
    id: u64,
}

#[derive(Default)]
struct Inner {
    state: StoreState,
    latest_question: u64,
    latest_practice: u64,
    in_flight: Vec<RequestTicket>,
}

impl Inner {
    fn latest(&mut self, lane: RequestLane) -> &mut u64 {
        match lane {
            RequestLane::Question => &mut self.latest_question,
            RequestLane::Practice => &mut self.latest_practice,
        }
    }
}

/// Shared handle to the session state. Clones observe the same state.
///
/// Every operation is a short synchronous critical section; the lock is
/// never held across an `.await`, so two mutations cannot interleave.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
    storage: Arc<dyn StateStorage>,
    // Serializes snapshot + save so an older snapshot never lands last.
    persist_lock: Arc<Mutex<()>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            storage,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Rehydrate session id, settings and history from `storage`.
    pub fn load(storage: Arc<dyn StateStorage>) -> Self {
        let persisted = match storage.load() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => PersistedState::default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable session state: {}", e);
                PersistedState::default()
            }
        };

        tracing::debug!(
            "Session state loaded: session_id={:?}, history={}",
            persisted.session_id,
            persisted.history.len()
        );

        let store = Self::new(storage);
        store.update(|state| {
            state.session_id = persisted.session_id;
            state.settings = persisted.settings;
            state.history = persisted.history;
        });
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        f(&mut self.lock().state)
    }

    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.lock().state)
    }

    // Best effort: the in-memory mutation already happened.
    fn persist(&self) {
        let _writing = self
            .persist_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let snapshot = self.read(StoreState::persisted);
        if let Err(e) = self.storage.save(&snapshot) {
            tracing::warn!("Failed to persist session state: {}", e);
        }
    }

    pub fn append_message(&self, message: ChatMessage) {
        self.update(|state| state.history.push(message));
        self.persist();
    }

    pub fn clear_history(&self) {
        self.update(|state| state.history.clear());
        self.persist();
    }

    pub fn set_loading(&self, loading: bool) {
        self.update(|state| state.is_loading = loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|state| state.error = error);
    }

    pub fn set_submission(&self, submission: Option<Submission>) {
        self.update(|state| state.submission = submission);
    }

    /// Replaces the guidance and rewinds the reveal counter.
    pub fn set_guidance(&self, guidance: Option<Guidance>) {
        self.update(|state| {
            state.guidance = guidance;
            state.reveal_level = 0;
        });
    }

    pub fn set_practice_problems(&self, problems: Vec<PracticeProblem>) {
        self.update(|state| state.practice_problems = problems);
    }

    pub fn set_problem_index(&self, index: usize) {
        self.update(|state| state.problem_index = index);
    }

    pub fn set_session_id(&self, session_id: Option<String>) {
        self.update(|state| state.session_id = session_id);
        self.persist();
    }

    pub fn update_settings(&self, update: SettingsUpdate) {
        self.update(|state| state.settings.merge(update));
        self.persist();
    }

    /// Discloses one more level if the sequence allows it. Returns the
    /// resulting level.
    pub fn advance_reveal(&self) -> u8 {
        self.update(|state| {
            let guidance = state.guidance.as_ref();
            if reveal::can_advance(guidance, state.reveal_level) {
                state.reveal_level += 1;
                if let RevealView::Step(step) = reveal::view(guidance, state.reveal_level) {
                    REVEALS_TOTAL.with_label_values(&[step.kind.as_str()]).inc();
                }
            }
            state.reveal_level
        })
    }

    pub fn reset_reveal(&self) {
        self.update(|state| state.reveal_level = 0);
    }

    /// Soft reset for a new question: keeps settings, session id and history.
    pub fn reset_session(&self) {
        self.update(|state| {
            state.submission = None;
            state.guidance = None;
            state.practice_problems.clear();
            state.problem_index = 0;
            state.reveal_level = 0;
            state.is_loading = false;
            state.error = None;
        });
    }

    /// Starts a request cycle on `lane` and raises the loading flag. Any
    /// older cycle on the same lane stops being current.
    pub fn begin_request(&self, lane: RequestLane) -> RequestTicket {
        let mut inner = self.lock();
        let latest = inner.latest(lane);
        *latest += 1;
        let ticket = RequestTicket { lane, id: *latest };
        inner.in_flight.retain(|pending| pending.lane != lane);
        inner.in_flight.push(ticket);
        inner.state.is_loading = true;
        ticket
    }

    /// Ends a request cycle. Loading drops once no current cycle is left.
    pub fn finish_request(&self, ticket: RequestTicket) {
        let mut inner = self.lock();
        inner.in_flight.retain(|pending| *pending != ticket);
        if inner.in_flight.is_empty() {
            inner.state.is_loading = false;
        }
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        *self.lock().latest(ticket.lane) == ticket.id
    }

    pub fn is_pending(&self, lane: RequestLane) -> bool {
        self.lock()
            .in_flight
            .iter()
            .any(|pending| pending.lane == lane)
    }

    pub fn snapshot(&self) -> StoreState {
        self.read(StoreState::clone)
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.read(|state| state.history.clone())
    }

    pub fn history_len(&self) -> usize {
        self.read(|state| state.history.len())
    }

    pub fn settings(&self) -> Settings {
        self.read(|state| state.settings.clone())
    }

    pub fn session_id(&self) -> Option<String> {
        self.read(|state| state.session_id.clone())
    }

    pub fn submission(&self) -> Option<Submission> {
        self.read(|state| state.submission.clone())
    }

    pub fn guidance(&self) -> Option<Guidance> {
        self.read(|state| state.guidance.clone())
    }

    pub fn practice_problems(&self) -> Vec<PracticeProblem> {
        self.read(|state| state.practice_problems.clone())
    }

    pub fn problem_index(&self) -> usize {
        self.read(|state| state.problem_index)
    }

    pub fn reveal_level(&self) -> u8 {
        self.read(|state| state.reveal_level)
    }

    pub fn is_loading(&self) -> bool {
        self.read(|state| state.is_loading)
    }

    pub fn error(&self) -> Option<String> {
        self.read(|state| state.error.clone())
    }
}

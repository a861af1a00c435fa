use shared::{DiagnosisRecord, EnvironmentAnalysis};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const MAX_SENSOR_READINGS: usize = 3;
const MAX_DIAGNOSES: usize = 100;
const MAX_SESSIONS: usize = 10_000;

/// Per-session dashboard state. Both lists are most-recent-first.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub diagnoses: VecDeque<DiagnosisRecord>,
    pub sensor_readings: VecDeque<EnvironmentAnalysis>,
    last_touched: u64,
}

impl SessionContext {
    fn push_diagnosis(&mut self, record: DiagnosisRecord) {
        self.diagnoses.push_front(record);
        self.diagnoses.truncate(MAX_DIAGNOSES);
    }

    fn push_sensor_reading(&mut self, analysis: EnvironmentAnalysis) {
        self.sensor_readings.push_front(analysis);
        self.sensor_readings.truncate(MAX_SENSOR_READINGS);
    }
}

#[derive(Debug, Default)]
struct Sessions {
    contexts: HashMap<Uuid, SessionContext>,
    clock: u64,
}

impl Sessions {
    /// Context for `session`, created if needed. Creating one past `max_sessions` evicts the
    /// session written to least recently.
    fn touch(&mut self, session: Uuid, max_sessions: usize) -> &mut SessionContext {
        self.clock += 1;
        if !self.contexts.contains_key(&session) && self.contexts.len() >= max_sessions {
            let stalest = self
                .contexts
                .iter()
                .min_by_key(|(_, ctx)| ctx.last_touched)
                .map(|(id, _)| *id);
            if let Some(id) = stalest {
                log::debug!("Evicting idle session {}", id);
                self.contexts.remove(&id);
            }
        }

        let ctx = self.contexts.entry(session).or_default();
        ctx.last_touched = self.clock;
        ctx
    }
}

/// In-memory dashboard state keyed by session id, holding at most `max_sessions` sessions.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<Sessions>>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_max_sessions(MAX_SESSIONS)
    }

    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn record_diagnosis(&self, session: Uuid, record: DiagnosisRecord) {
        let mut sessions = self.sessions.write().await;
        sessions.touch(session, self.max_sessions).push_diagnosis(record);
    }

    pub async fn record_sensor_reading(&self, session: Uuid, analysis: EnvironmentAnalysis) {
        let mut sessions = self.sessions.write().await;
        sessions
            .touch(session, self.max_sessions)
            .push_sensor_reading(analysis);
    }

    pub async fn diagnoses(&self, session: Uuid) -> Vec<DiagnosisRecord> {
        let sessions = self.sessions.read().await;
        sessions
            .contexts
            .get(&session)
            .map(|ctx| ctx.diagnoses.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn latest_diagnosis(&self, session: Uuid) -> Option<DiagnosisRecord> {
        let sessions = self.sessions.read().await;
        sessions
            .contexts
            .get(&session)
            .and_then(|ctx| ctx.diagnoses.front().cloned())
    }

    pub async fn sensor_readings(&self, session: Uuid) -> Vec<EnvironmentAnalysis> {
        let sessions = self.sessions.read().await;
        sessions
            .contexts
            .get(&session)
            .map(|ctx| ctx.sensor_readings.iter().cloned().collect())
            .unwrap_or_default()
    }
}

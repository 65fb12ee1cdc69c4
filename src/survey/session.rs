//! In-memory survey sessions, keyed by conversation identity.
//!
//! Sessions are ephemeral by design: they live only in process memory and
//! are destroyed on completion or `/start` reset.  The store is a plain
//! keyed map passed as a dependency to the engine — no globals.

use std::collections::HashMap;
use std::sync::Mutex;

/// Where a conversation is in the survey.  Strictly linear and
/// forward-only; validation failures re-prompt without advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyState {
    AwaitingPatientId,
    AwaitingTrialChoice,
    AwaitingScore,
    AwaitingDrugChoice,
}

/// Fields accumulated across turns.  Each state fills in its own field on a
/// successful transition; nothing is persisted until the final step.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub patient_id: Option<i64>,
    pub trial_id: Option<i64>,
    pub trial_name: Option<String>,
    /// The selected trial's registered drug — one of the two valid choices
    /// at the final step (the other being the placebo marker).
    pub drug_name: Option<String>,
    pub score: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub state: SurveyState,
    pub draft: Draft,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SurveyState::AwaitingPatientId,
            draft: Draft::default(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyed map from conversation identity to its live [`Session`].
///
/// The mutex is never held across an await point — callers take a clone,
/// work on it, and write the updated session back (or remove it).
/// Conversations are independent; a lost race between two simultaneous
/// turns of the *same* conversation resolves last-write-wins.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { sessions: Mutex::new(HashMap::new()) }
    }

    /// Snapshot of the session for `conversation_id`, if one is live.
    pub fn get(&self, conversation_id: &str) -> Option<Session> {
        self.sessions.lock().expect("session store poisoned").get(conversation_id).cloned()
    }

    /// Create or replace the session — `/start` resets unconditionally.
    pub fn put(&self, conversation_id: &str, session: Session) {
        self.sessions
            .lock()
            .expect("session store poisoned")
            .insert(conversation_id.to_string(), session);
    }

    /// Destroy the session; returns it if one existed.
    pub fn remove(&self, conversation_id: &str) -> Option<Session> {
        self.sessions.lock().expect("session store poisoned").remove(conversation_id)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

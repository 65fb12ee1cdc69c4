//! The survey engine — the conversational state machine.
//!
//! One handler function per [`SurveyState`], invoked by a central dispatch
//! on the live session's state.  Handlers follow a uniform policy:
//!
//! - **Success**: fill the draft field, advance the state, write the session
//!   back, prompt for the next step.
//! - **Validation failure**: re-prompt the same state with the error detail;
//!   the stored session is not touched and storage is never written.
//!
//! The final step computes the drug statistics *before* the insert so the
//! new submission is excluded from its own comparison baseline, then
//! persists, emits the feedback, and destroys the session.  A save failure
//! after a valid choice also destroys the session — the user must restart.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::storage::{Database, Trial};
use super::reply::Reply;
use super::session::{Session, SessionStore, SurveyState};

/// The trigger that starts or resets a survey conversation.
pub const START_COMMAND: &str = "/start";

/// The placebo marker — always a valid drug choice, for every trial.
pub const PLACEBO: &str = "Placebo";

// ── Prompt text ──────────────────────────────────────────────────────────────

const WELCOME: &str = "Welcome to the clinical trial survey!\n\
    Please enter your patient ID (it must be registered in the system):";

const NO_SESSION_HINT: &str = "Send /start to begin a new survey.";

const TRIAL_PROMPT: &str = "Select a trial:";

const NO_TRIALS: &str = "No trials are available right now. \
    Send any message in a little while to see the list again.";

const SCORE_PROMPT: &str = "Enter your wellbeing score (0-100):";

const SCORE_REPROMPT: &str = "The score must be a whole number from 0 to 100. \
    Please enter a valid value:";

const DRUG_PROMPT: &str = "Select the drug you are taking:";

const SAVE_FAILURE: &str = "Something went wrong while saving your submission.\n\
    Please try again later by sending /start.";

pub struct SurveyEngine {
    db: Arc<Database>,
    sessions: SessionStore,
}

impl SurveyEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db, sessions: SessionStore::new() }
    }

    /// Process one inbound turn for `conversation_id` and produce the reply.
    ///
    /// Never fails: every internal error degrades into re-prompt or restart
    /// text, with the detail going to the operator log only.
    pub async fn handle_turn(&self, conversation_id: &str, text: &str) -> Reply {
        // Only the start trigger tolerates surrounding whitespace; handlers
        // decide per-state how strict to be (drug matching stays exact).
        if text.trim() == START_COMMAND {
            return self.start(conversation_id);
        }

        let Some(session) = self.sessions.get(conversation_id) else {
            debug!(conversation_id, "turn without live session");
            return Reply::clear(NO_SESSION_HINT);
        };

        match session.state {
            SurveyState::AwaitingPatientId => {
                self.on_patient_id(conversation_id, session, text).await
            }
            SurveyState::AwaitingTrialChoice => {
                self.on_trial_choice(conversation_id, session, text).await
            }
            SurveyState::AwaitingScore => self.on_score(conversation_id, session, text).await,
            SurveyState::AwaitingDrugChoice => {
                self.on_drug_choice(conversation_id, session, text).await
            }
        }
    }

    /// `/start` — unconditionally discard any prior session and begin anew.
    fn start(&self, conversation_id: &str) -> Reply {
        info!(conversation_id, "survey started");
        self.sessions.put(conversation_id, Session::new());
        Reply::clear(WELCOME)
    }

    // ── State handlers ────────────────────────────────────────────────

    async fn on_patient_id(
        &self,
        conversation_id: &str,
        mut session: Session,
        text: &str,
    ) -> Reply {
        let patient_id = match parse_patient_id(text) {
            Ok(id) => id,
            Err(detail) => {
                return Reply::clear(format!(
                    "Error: {detail}. Please enter a valid patient ID:"
                ));
            }
        };

        if !self.db.patient_exists(patient_id).await {
            return Reply::clear(format!(
                "Error: patient {patient_id} is not registered in the system. \
                 Please enter a valid patient ID:"
            ));
        }

        session.draft.patient_id = Some(patient_id);
        session.state = SurveyState::AwaitingTrialChoice;
        self.sessions.put(conversation_id, session);

        self.trial_menu().await
    }

    async fn on_trial_choice(
        &self,
        conversation_id: &str,
        mut session: Session,
        text: &str,
    ) -> Reply {
        let trial = match parse_trial_choice(text) {
            Some(trial_id) => self.db.find_trial(trial_id).await,
            None => None,
        };

        let Some(trial) = trial else {
            let mut reply = self.trial_menu().await;
            reply.text = format!("Please select a trial from the list:\n{}", reply.text);
            return reply;
        };

        session.draft.trial_id = Some(trial.trial_id);
        session.draft.trial_name = Some(trial.name);
        session.draft.drug_name = Some(trial.drug_name);
        session.state = SurveyState::AwaitingScore;
        self.sessions.put(conversation_id, session);

        Reply::clear(SCORE_PROMPT)
    }

    async fn on_score(&self, conversation_id: &str, mut session: Session, text: &str) -> Reply {
        let Some(score) = parse_score(text) else {
            return Reply::clear(SCORE_REPROMPT);
        };

        session.draft.score = Some(score);
        session.state = SurveyState::AwaitingDrugChoice;

        let trial_drug = session.draft.drug_name.clone().unwrap_or_default();
        self.sessions.put(conversation_id, session);

        Reply::with_options(DRUG_PROMPT, vec![PLACEBO.to_string(), trial_drug])
    }

    async fn on_drug_choice(
        &self,
        conversation_id: &str,
        session: Session,
        text: &str,
    ) -> Reply {
        // Draft fields were all filled by the earlier transitions; a hole
        // here would be a state-machine bug, so fail the session rather
        // than panic.
        let (Some(patient_id), Some(trial_id), Some(trial_name), Some(trial_drug), Some(score)) = (
            session.draft.patient_id,
            session.draft.trial_id,
            session.draft.trial_name.clone(),
            session.draft.drug_name.clone(),
            session.draft.score,
        ) else {
            error!(conversation_id, "incomplete draft at final step — destroying session");
            self.sessions.remove(conversation_id);
            return Reply::clear(SAVE_FAILURE);
        };

        // Exact match only: the placebo marker or the trial's registered
        // drug, case- and whitespace-sensitive.
        if text != PLACEBO && text != trial_drug {
            return Reply::with_options(
                format!(
                    "Please choose a drug for the trial {trial_name}:\n\
                     Available options: {PLACEBO} or {trial_drug}"
                ),
                vec![PLACEBO.to_string(), trial_drug],
            );
        }
        let drug = text;

        // Baseline is computed before the insert so the new submission
        // cannot influence the range it is judged against.
        let stats = self.db.drug_statistics(trial_id, drug).await;

        let today = chrono::Utc::now().date_naive();
        if let Err(e) = self
            .db
            .save_measurement(patient_id, trial_id, drug, score, today)
            .await
        {
            error!(conversation_id, patient_id, trial_id, drug, "save failed: {e}");
            self.sessions.remove(conversation_id);
            return Reply::clear(SAVE_FAILURE);
        }

        self.sessions.remove(conversation_id);
        info!(conversation_id, patient_id, trial_id, drug, score, "survey completed");

        let analysis = match stats {
            Some(stats) => {
                let verdict = if stats.within_band(score) {
                    "Your wellbeing is within the normal range."
                } else {
                    "Your wellbeing is outside the normal range."
                };
                format!(
                    "{verdict}\n\
                     Average for {drug}: {avg}\n\
                     Normal range: {lo} to {hi}\n\
                     Based on {count} measurement(s)",
                    avg = stats.avg_score,
                    lo = stats.lower_bound,
                    hi = stats.upper_bound,
                    count = stats.count,
                )
            }
            None => "This is the first measurement for this drug in the trial.\n\
                     A normal range will emerge once more data has been collected."
                .to_string(),
        };

        Reply::clear(format!(
            "Thank you for your submission!\n\
             Patient ID: {patient_id}\n\
             Trial: {trial_name}\n\
             Wellbeing: {score}/100\n\
             Drug: {drug}\n\n\
             {analysis}"
        ))
    }

    /// The trial selection prompt with one option per catalog entry.
    /// An empty (or unavailable) catalog degrades to a retry-later note.
    async fn trial_menu(&self) -> Reply {
        let trials = self.db.list_trials().await;
        if trials.is_empty() {
            return Reply::clear(NO_TRIALS);
        }
        let options = trials.iter().map(Trial::menu_label).collect();
        Reply::with_options(TRIAL_PROMPT, options)
    }
}

// ── Input parsing ────────────────────────────────────────────────────────────

/// A patient id is a digits-only positive integer (surrounding whitespace
/// tolerated).
fn parse_patient_id(text: &str) -> Result<i64, &'static str> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err("the ID must contain digits only");
    }
    let id: i64 = text.parse().map_err(|_| "the ID is out of range")?;
    if id <= 0 {
        return Err("the ID must be positive");
    }
    Ok(id)
}

/// A trial selection is matched by the leading numeric token of the menu
/// label, e.g. `"1. Trial A (DrugX)"` → `1`.  Bare `"1"` works too.
fn parse_trial_choice(text: &str) -> Option<i64> {
    text.split('.').next()?.trim().parse().ok()
}

/// A score is a whole number in `[0, 100]` (surrounding whitespace
/// tolerated).
fn parse_score(text: &str) -> Option<i64> {
    let score: i64 = text.trim().parse().ok()?;
    (0..=100).contains(&score).then_some(score)
}

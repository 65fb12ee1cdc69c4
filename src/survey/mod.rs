//! Survey subsystem — the conversational state machine.
//!
//! The [`SurveyEngine`] drives data collection one turn at a time:
//! identity verification → trial selection → score entry → drug selection →
//! persistence → feedback.  Per-conversation progress lives in an in-memory
//! [`SessionStore`]; nothing about a session survives the process.
//!
//! Channels talk to the engine exclusively through
//! [`SurveyEngine::handle_turn`], which maps any inbound text to exactly one
//! transport-agnostic [`Reply`].

pub mod engine;
pub mod reply;
pub mod session;

pub use engine::{SurveyEngine, PLACEBO, START_COMMAND};
pub use reply::{Markup, Reply};
pub use session::{Draft, Session, SessionStore, SurveyState};

//! End-to-end survey flow tests: full conversations against a real SQLite
//! database, from `/start` through persistence and feedback.
//!
//! Run with:
//!   cargo test --test test_survey_flow

use std::sync::Arc;

use tempfile::TempDir;

use cohort_bot::storage::Database;
use cohort_bot::survey::{Markup, SurveyEngine, PLACEBO, START_COMMAND};

// ── helpers ──────────────────────────────────────────────────────────────────

struct Fixture {
    _dir: TempDir,
    db_path: std::path::PathBuf,
    engine: SurveyEngine,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let db_path = dir.path().join("cohort.db");
    let db = Database::open(&db_path).expect("open db");

    // Trials and patients are external reference data; seed them the way an
    // operator would, directly in SQL.
    let conn = rusqlite::Connection::open(&db_path).expect("seed connection");
    conn.execute("INSERT INTO patients (patient_id) VALUES (42)", []).unwrap();
    conn.execute(
        "INSERT INTO trials (trial_id, trial_name, med) VALUES (1, 'Trial A', 'DrugX')",
        [],
    )
    .unwrap();

    Fixture { _dir: dir, db_path, engine: SurveyEngine::new(Arc::new(db)) }
}

fn measurements(f: &Fixture) -> Vec<(i64, i64, String, String, i64)> {
    let conn = rusqlite::Connection::open(&f.db_path).unwrap();
    let mut stmt = conn
        .prepare(
            "SELECT patient_id, trial_id, measurement_date, drug, condition_score
             FROM measurements ORDER BY rowid",
        )
        .unwrap();
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .unwrap();
    rows.collect::<Result<Vec<_>, _>>().unwrap()
}

// ── scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_measurement_full_conversation() {
    let f = fixture();
    let convo = "telegram0:1001";

    let reply = f.engine.handle_turn(convo, START_COMMAND).await;
    assert!(reply.text.contains("patient ID"));
    assert_eq!(reply.markup, Markup::Clear);

    let reply = f.engine.handle_turn(convo, "42").await;
    assert!(reply.text.contains("Select a trial"));
    assert_eq!(reply.markup, Markup::Options(vec!["1. Trial A (DrugX)".into()]));

    let reply = f.engine.handle_turn(convo, "1. Trial A (DrugX)").await;
    assert!(reply.text.contains("0-100"));

    let reply = f.engine.handle_turn(convo, "75").await;
    assert_eq!(
        reply.markup,
        Markup::Options(vec![PLACEBO.to_string(), "DrugX".to_string()])
    );

    let reply = f.engine.handle_turn(convo, "DrugX").await;
    assert!(reply.text.contains("Thank you"));
    assert!(reply.text.contains("Patient ID: 42"));
    assert!(reply.text.contains("Trial: Trial A"));
    assert!(reply.text.contains("Wellbeing: 75/100"));
    assert!(reply.text.contains("Drug: DrugX"));
    // No prior rows for (1, DrugX): first measurement, no baseline.
    assert!(reply.text.contains("first measurement"));

    let rows = measurements(&f);
    assert_eq!(rows.len(), 1);
    let (patient_id, trial_id, date, drug, score) = &rows[0];
    assert_eq!(*patient_id, 42);
    assert_eq!(*trial_id, 1);
    assert_eq!(drug, "DrugX");
    assert_eq!(*score, 75);
    assert_eq!(*date, chrono::Utc::now().date_naive().to_string());
}

#[tokio::test]
async fn second_measurement_compared_against_prior_baseline() {
    let f = fixture();

    // First conversation leaves one row: (1, DrugX, 75).
    let convo = "telegram0:1001";
    f.engine.handle_turn(convo, START_COMMAND).await;
    f.engine.handle_turn(convo, "42").await;
    f.engine.handle_turn(convo, "1. Trial A (DrugX)").await;
    f.engine.handle_turn(convo, "75").await;
    f.engine.handle_turn(convo, "DrugX").await;

    // Second submission with score 95 is judged against the pre-existing
    // baseline only: avg 75.0, band [67.5, 82.5] → out of range.
    let convo = "telegram0:2002";
    f.engine.handle_turn(convo, START_COMMAND).await;
    f.engine.handle_turn(convo, "42").await;
    f.engine.handle_turn(convo, "1. Trial A (DrugX)").await;
    f.engine.handle_turn(convo, "95").await;
    let reply = f.engine.handle_turn(convo, "DrugX").await;

    assert!(reply.text.contains("outside the normal range"));
    assert!(reply.text.contains("Average for DrugX: 75"));
    assert!(reply.text.contains("67.5 to 82.5"));
    assert!(reply.text.contains("Based on 1 measurement"));

    assert_eq!(measurements(&f).len(), 2);
}

#[tokio::test]
async fn unknown_patient_goes_nowhere() {
    let f = fixture();
    let convo = "telegram0:3003";

    f.engine.handle_turn(convo, START_COMMAND).await;
    let reply = f.engine.handle_turn(convo, "999").await;
    assert!(reply.text.contains("not registered"));

    // Still awaiting a patient id; a trial label is rejected as one.
    let reply = f.engine.handle_turn(convo, "1. Trial A (DrugX)").await;
    assert!(reply.text.contains("Error"));

    assert!(measurements(&f).is_empty());
}

#[tokio::test]
async fn restart_mid_survey_discards_progress() {
    let f = fixture();
    let convo = "telegram0:4004";

    f.engine.handle_turn(convo, START_COMMAND).await;
    f.engine.handle_turn(convo, "42").await;
    f.engine.handle_turn(convo, "1. Trial A (DrugX)").await;

    // Reset mid-way; the score turn must now be read as a patient id.
    let reply = f.engine.handle_turn(convo, START_COMMAND).await;
    assert!(reply.text.contains("patient ID"));
    let reply = f.engine.handle_turn(convo, "42").await;
    assert!(reply.text.contains("Select a trial"));

    assert!(measurements(&f).is_empty());
}

#[tokio::test]
async fn save_failure_after_valid_choice_aborts_session() {
    let f = fixture();
    let convo = "telegram0:6006";

    f.engine.handle_turn(convo, START_COMMAND).await;
    f.engine.handle_turn(convo, "42").await;
    f.engine.handle_turn(convo, "1. Trial A (DrugX)").await;
    f.engine.handle_turn(convo, "75").await;

    // The trial disappears between the choice and the write; the write
    // boundary re-validates and refuses to insert.
    let conn = rusqlite::Connection::open(&f.db_path).unwrap();
    conn.execute("DELETE FROM trials", []).unwrap();

    let reply = f.engine.handle_turn(convo, "DrugX").await;
    assert!(reply.text.contains("try again later"));
    assert!(reply.text.contains("/start"));
    assert_eq!(reply.markup, Markup::Clear);

    // The session was destroyed despite the valid choice: the next turn is
    // greeted as a stranger, not re-prompted for a drug.
    let reply = f.engine.handle_turn(convo, "DrugX").await;
    assert!(reply.text.contains("begin a new survey"));

    // No partial write.
    assert!(measurements(&f).is_empty());
}

#[tokio::test]
async fn placebo_is_always_accepted() {
    let f = fixture();
    let convo = "telegram0:5005";

    f.engine.handle_turn(convo, START_COMMAND).await;
    f.engine.handle_turn(convo, "42").await;
    f.engine.handle_turn(convo, "1. Trial A (DrugX)").await;
    f.engine.handle_turn(convo, "60").await;
    let reply = f.engine.handle_turn(convo, PLACEBO).await;

    assert!(reply.text.contains("Drug: Placebo"));
    let rows = measurements(&f);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].3, "Placebo");
}

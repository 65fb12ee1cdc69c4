//! Cohort Bot — process entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at the configured level (`RUST_LOG` wins if set)
//!   4. Open storage (pool + schema)
//!   5. Build the survey engine
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Start comms channels and join them

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use cohort_bot::{comms, config, error, logger, storage, survey};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), error::AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;

    logger::parse_level(&config.log_level)?;
    logger::init(&config.log_level)?;

    info!(
        bot_name = %config.bot_name,
        db_path = %config.storage.db_path.display(),
        log_level = %config.log_level,
        "config loaded"
    );

    let db = Arc::new(storage::Database::open(&config.storage.db_path)?);
    let engine = Arc::new(survey::SurveyEngine::new(db));

    // Shared shutdown token — Ctrl-C cancels it, all tasks watch it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    info!("starting comms channels");
    let comms_handle = comms::start(&config, engine, shutdown.clone());
    comms_handle.join().await?;

    info!("all channels stopped — exiting");
    Ok(())
}

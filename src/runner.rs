use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::cleaning::{clean_group, CleaningConfig};
use crate::db::Database;
use crate::models::{CleaningRun, RunStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Cleans every location in the store and records the run.
///
/// Each location is loaded, cleaned on the blocking pool and written back
/// in its own transaction. A location that fails is counted and logged;
/// the others still complete.
pub async fn run_cleaning(db: &Database, config: &CleaningConfig) -> Result<CleaningRun> {
    let mut run = CleaningRun {
        id: Uuid::new_v4().to_string(),
        started_at: Utc::now(),
        finished_at: None,
        status: RunStatus::Running,
        groups_total: 0,
        groups_failed: 0,
        readings_total: 0,
        config_json: serde_json::to_string(config)?,
    };
    db.insert_run(&run).await?;

    let result = clean_locations(db, &mut run, config).await;

    run.finished_at = Some(Utc::now());
    run.status = match &result {
        Ok(()) => RunStatus::Completed,
        Err(err) => {
            log_error!("cleaning run {} aborted: {err:#}", run.id);
            RunStatus::Failed
        }
    };
    db.finish_run(&run).await?;
    result?;

    log_info!(
        "cleaning run {} finished: {} locations, {} failed, {} readings",
        run.id,
        run.groups_total,
        run.groups_failed,
        run.readings_total
    );

    Ok(run)
}

async fn clean_locations(db: &Database, run: &mut CleaningRun, config: &CleaningConfig) -> Result<()> {
    let location_ids = db.list_location_ids().await?;
    let config = Arc::new(config.clone());

    let mut tasks = JoinSet::new();
    for location_id in location_ids {
        let db = db.clone();
        let config = Arc::clone(&config);
        let run_id = run.id.clone();
        tasks.spawn(async move {
            let result = clean_location(&db, &run_id, &location_id, config).await;
            (location_id, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (location_id, result) = joined.context("location cleaning task panicked")?;
        run.groups_total += 1;
        match result {
            Ok(count) => run.readings_total += count as u64,
            Err(err) => {
                run.groups_failed += 1;
                log_warn!("location {} not cleaned: {err:#}", location_id);
            }
        }
    }

    Ok(())
}

async fn clean_location(
    db: &Database,
    run_id: &str,
    location_id: &str,
    config: Arc<CleaningConfig>,
) -> Result<usize> {
    let readings = db.get_readings_for_location(location_id).await?;

    let id = location_id.to_string();
    let outcome = tokio::task::spawn_blocking(move || clean_group(&id, &readings, &config))
        .await
        .context("cleaning task panicked")??;

    db.save_cleaned_group(location_id, Some(run_id), &outcome.readings)
        .await?;

    Ok(outcome.readings.len())
}

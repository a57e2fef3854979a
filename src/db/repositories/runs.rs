use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_optional_datetime, parse_run_status, to_i64, to_u64},
    Database,
};
use crate::models::CleaningRun;

fn row_to_run(row: &Row) -> Result<CleaningRun> {
    let started_at: String = row.get("started_at")?;
    let status: String = row.get("status")?;

    Ok(CleaningRun {
        id: row.get("id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        finished_at: parse_optional_datetime(row.get("finished_at")?, "finished_at")?,
        status: parse_run_status(&status)?,
        groups_total: to_u64(row.get("groups_total")?, "groups_total")?,
        groups_failed: to_u64(row.get("groups_failed")?, "groups_failed")?,
        readings_total: to_u64(row.get("readings_total")?, "readings_total")?,
        config_json: row.get("config_json")?,
    })
}

impl Database {
    pub async fn insert_run(&self, run: &CleaningRun) -> Result<()> {
        let record = run.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO cleaning_runs (id, started_at, finished_at, status, groups_total, groups_failed, readings_total, config_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.finished_at.map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.groups_total)?,
                    to_i64(record.groups_failed)?,
                    to_i64(record.readings_total)?,
                    record.config_json,
                ],
            )
            .with_context(|| "failed to insert cleaning run")?;
            Ok(())
        })
        .await
    }

    /// Stores the final counters and status of a run.
    pub async fn finish_run(&self, run: &CleaningRun) -> Result<()> {
        let record = run.clone();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE cleaning_runs
                 SET finished_at = ?1,
                     status = ?2,
                     groups_total = ?3,
                     groups_failed = ?4,
                     readings_total = ?5
                 WHERE id = ?6",
                params![
                    record.finished_at.map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.groups_total)?,
                    to_i64(record.groups_failed)?,
                    to_i64(record.readings_total)?,
                    record.id,
                ],
            )
            .with_context(|| "failed to finish cleaning run")?;
            Ok(())
        })
        .await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<CleaningRun>> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, finished_at, status, groups_total, groups_failed, readings_total, config_json
                 FROM cleaning_runs
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![run_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_run(row)?)),
                None => Ok(None),
            }
        })
        .await
    }
}

use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::models::{Classification, Coordinate, CoordinateSource, RunStatus};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// Both halves of a nullable coordinate pair, or nothing.
pub fn coordinate_from_columns(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinate> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
        _ => None,
    }
}

pub fn parse_classification(value: &str) -> Result<Classification> {
    Classification::parse(value).ok_or_else(|| anyhow!("unknown classification {value}"))
}

pub fn parse_coordinate_source(value: &str) -> Result<CoordinateSource> {
    CoordinateSource::parse(value).ok_or_else(|| anyhow!("unknown coordinate source {value}"))
}

pub fn parse_run_status(value: &str) -> Result<RunStatus> {
    match value {
        "Running" => Ok(RunStatus::Running),
        "Completed" => Ok(RunStatus::Completed),
        "Failed" => Ok(RunStatus::Failed),
        other => Err(anyhow!("unknown run status {other}")),
    }
}

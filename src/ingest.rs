//! JSON import and export around the cleaning core.
//!
//! Upstream exports are loosely typed: rows may lack fields or carry
//! timestamps as strings. Rows without a distance or timestamp are dropped
//! here; any other broken row rejects its whole location so the cleaning
//! core only ever sees complete groups.

use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::cleaning::GroupFailure;
use crate::models::{CleanedReading, RawReading, Reading};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub readings: Vec<Reading>,
    /// Rows discarded for lacking a distance or timestamp.
    pub dropped: usize,
    /// One entry per rejected location, carrying its first error.
    pub failures: Vec<GroupFailure>,
}

pub fn import_rows(rows: Vec<RawReading>) -> ImportOutcome {
    let mut converted = Vec::with_capacity(rows.len());
    let mut outcome = ImportOutcome::default();

    for (row, raw) in rows.into_iter().enumerate() {
        if raw.is_incomplete() {
            outcome.dropped += 1;
            continue;
        }

        match raw.into_reading(row) {
            Ok(reading) => converted.push(reading),
            Err(error) => {
                let location_id = error.location_id().unwrap_or_default().to_string();
                if outcome.failures.iter().all(|f| f.location_id != location_id) {
                    log_warn!("rejecting location {}: {}", location_id, error);
                    outcome.failures.push(GroupFailure { location_id, error });
                }
            }
        }
    }

    outcome.readings = converted
        .into_iter()
        .filter(|r| outcome.failures.iter().all(|f| f.location_id != r.location_id))
        .collect();

    if outcome.dropped > 0 {
        log_info!("dropped {} rows without distance or timestamp", outcome.dropped);
    }

    outcome
}

pub fn read_rows(path: &Path) -> Result<Vec<RawReading>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read readings from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse readings in {}", path.display()))
}

pub fn write_cleaned(path: &Path, readings: &[CleanedReading]) -> Result<()> {
    let serialized = serde_json::to_string_pretty(readings)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write cleaned readings to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::CleaningError;

    fn row(location_id: &str, minute: u32, distance: f64) -> RawReading {
        RawReading {
            id: None,
            location_id: Some(location_id.into()),
            container_id: Some(format!("{location_id}0101")),
            recorded_at: Some(format!("2024-03-01T06:{minute:02}:00Z")),
            distance: Some(distance),
            sensed_lat: Some(47.0),
            sensed_lon: Some(8.0),
            reference_lat: Some(47.0),
            reference_lon: Some(8.0),
        }
    }

    #[test]
    fn test_incomplete_rows_are_dropped() {
        let mut missing_distance = row("A", 1, 0.0);
        missing_distance.distance = None;
        let mut missing_time = row("A", 2, 0.0);
        missing_time.recorded_at = None;

        let outcome = import_rows(vec![row("A", 0, 5.0), missing_distance, missing_time]);
        assert_eq!(outcome.dropped, 2);
        assert_eq!(outcome.readings.len(), 1);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_broken_row_rejects_only_its_location() {
        let mut broken = row("B", 1, 20.0);
        broken.sensed_lat = None;

        let outcome = import_rows(vec![row("A", 0, 5.0), row("B", 0, 5.0), broken, row("A", 1, 6.0)]);

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].location_id, "B");
        assert!(matches!(
            outcome.failures[0].error,
            CleaningError::MissingField { field: "sensed_lat", row: 2, .. }
        ));
        assert!(outcome.readings.iter().all(|r| r.location_id == "A"));
        assert_eq!(outcome.readings.len(), 2);
    }

    #[test]
    fn test_rows_parse_from_camel_case_json() {
        let json = r#"[{
            "locationId": "1042",
            "containerId": "10420103",
            "recordedAt": "2024-03-01T06:00:00+01:00",
            "distance": 22.5,
            "sensedLat": 47.1,
            "sensedLon": 8.2
        }]"#;
        let rows: Vec<RawReading> = serde_json::from_str(json).unwrap();
        let outcome = import_rows(rows);
        assert_eq!(outcome.readings.len(), 1);
        assert!(outcome.readings[0].reference.is_none());
        assert_eq!(outcome.readings[0].recorded_at.to_rfc3339(), "2024-03-01T05:00:00+00:00");
    }
}

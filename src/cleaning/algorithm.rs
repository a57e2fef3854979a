use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cleaning::config::CleaningConfig;
use crate::cleaning::error::CleaningError;
use crate::cleaning::outliers::classify_outliers;
use crate::cleaning::reconcile::{find_phases, reconcile_with_phases};
use crate::cleaning::shifts::{detect_shifts, ShiftThresholds};
use crate::cleaning::validate::validate_group;
use crate::models::{Classification, CleanedReading, CoordinateSource, Reading};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

/// All readings of one location, ordered by `recorded_at`.
#[derive(Debug, Clone)]
pub struct LocationGroup {
    pub location_id: String,
    pub readings: Vec<Reading>,
}

/// Per-location counters after cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub location_id: String,
    pub readings: usize,
    pub accurate: usize,
    pub outliers: usize,
    pub temporary_shifts: usize,
    pub phases: usize,
    pub interpolated: usize,
    pub unresolved: usize,
    pub thresholds: Option<ShiftThresholds>,
}

#[derive(Debug, Clone)]
pub struct GroupOutcome {
    pub summary: GroupSummary,
    pub readings: Vec<CleanedReading>,
}

#[derive(Debug, Clone)]
pub struct GroupFailure {
    pub location_id: String,
    pub error: CleaningError,
}

/// Result of a batch: cleaned groups plus the groups that were rejected.
#[derive(Debug, Clone, Default)]
pub struct CleaningReport {
    pub groups: Vec<GroupOutcome>,
    pub failures: Vec<GroupFailure>,
}

impl CleaningReport {
    pub fn readings(&self) -> impl Iterator<Item = &CleanedReading> {
        self.groups.iter().flat_map(|group| group.readings.iter())
    }

    pub fn into_readings(self) -> Vec<CleanedReading> {
        self.groups
            .into_iter()
            .flat_map(|group| group.readings)
            .collect()
    }

    fn record(&mut self, location_id: String, result: Result<GroupOutcome, CleaningError>) {
        match result {
            Ok(outcome) => self.groups.push(outcome),
            Err(error) => {
                log_warn!("skipping location {}: {}", location_id, error);
                self.failures.push(GroupFailure { location_id, error });
            }
        }
    }
}

/// Groups readings by location, keeping locations in order of first
/// appearance and sorting each group stably by `recorded_at`.
pub fn partition_by_location(readings: Vec<Reading>) -> Vec<LocationGroup> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<LocationGroup> = Vec::new();

    for reading in readings {
        match slots.get(&reading.location_id).copied() {
            Some(slot) => groups[slot].readings.push(reading),
            None => {
                slots.insert(reading.location_id.clone(), groups.len());
                groups.push(LocationGroup {
                    location_id: reading.location_id.clone(),
                    readings: vec![reading],
                });
            }
        }
    }

    for group in &mut groups {
        group.readings.sort_by_key(|r| r.recorded_at);
    }

    groups
}

/// Runs the three cleaning stages over one time-ordered location group.
pub fn clean_group(
    location_id: &str,
    readings: &[Reading],
    config: &CleaningConfig,
) -> Result<GroupOutcome, CleaningError> {
    validate_group(location_id, readings)?;

    let classified = classify_outliers(readings, config);
    let detection = detect_shifts(&classified, config);
    let phases = find_phases(&detection.readings);
    let cleaned = reconcile_with_phases(&detection.readings, &phases);

    let count = |class: Classification| cleaned.iter().filter(|r| r.classification == class).count();
    let summary = GroupSummary {
        location_id: location_id.to_string(),
        readings: cleaned.len(),
        accurate: count(Classification::Accurate),
        outliers: count(Classification::Outlier),
        temporary_shifts: count(Classification::TemporaryShift),
        phases: phases.len(),
        interpolated: cleaned
            .iter()
            .filter(|r| r.source == CoordinateSource::Interpolated)
            .count(),
        unresolved: cleaned.iter().filter(|r| r.is_unresolved()).count(),
        thresholds: detection.thresholds,
    };

    log_debug!(
        "location {}: {} accurate, {} outliers, {} shifted in {} phases",
        location_id,
        summary.accurate,
        summary.outliers,
        summary.temporary_shifts,
        summary.phases
    );

    Ok(GroupOutcome {
        summary,
        readings: cleaned,
    })
}

/// Cleans every location sequentially. A rejected group never stops the
/// remaining ones.
pub fn clean_all(readings: Vec<Reading>, config: &CleaningConfig) -> CleaningReport {
    let mut report = CleaningReport::default();

    for group in partition_by_location(readings) {
        let result = clean_group(&group.location_id, &group.readings, config);
        report.record(group.location_id, result);
    }

    report
}

/// Cleans every location on the blocking pool, one task per location.
///
/// Groups share nothing, so they run independently; results come back in
/// partition order.
pub async fn clean_all_parallel(readings: Vec<Reading>, config: &CleaningConfig) -> CleaningReport {
    let config = Arc::new(config.clone());

    let tasks: Vec<_> = partition_by_location(readings)
        .into_iter()
        .map(|group| {
            let config = Arc::clone(&config);
            let location_id = group.location_id.clone();
            let handle = tokio::task::spawn_blocking(move || {
                clean_group(&group.location_id, &group.readings, &config)
            });
            (location_id, handle)
        })
        .collect();

    let mut report = CleaningReport::default();
    for (location_id, handle) in tasks {
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                log_error!("cleaning task for location {} failed: {join_err}", location_id);
                Err(CleaningError::TaskFailed {
                    location_id: location_id.clone(),
                    reason: join_err.to_string(),
                })
            }
        };
        report.record(location_id, result);
    }

    report
}

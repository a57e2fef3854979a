pub mod algorithm;
pub mod config;
pub mod error;
pub mod outliers;
pub mod reconcile;
pub mod rolling;
pub mod shifts;
pub mod validate;

pub use algorithm::{
    clean_all, clean_all_parallel, clean_group, partition_by_location, CleaningReport,
    GroupFailure, GroupOutcome, GroupSummary, LocationGroup,
};
pub use config::CleaningConfig;
pub use error::CleaningError;
pub use outliers::{classify_outliers, prune_statistical_outliers, PruningOutcome};
pub use reconcile::{find_phases, reconcile_coordinates, reconcile_with_phases, Phase};
pub use shifts::{detect_shifts, ShiftDetection, ShiftThresholds};
pub use validate::validate_group;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::models::{Coordinate, Reading};

    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
    }

    /// One reading per distance, a minute apart, sensed north of a fixed
    /// reference point by roughly the given distance.
    pub fn readings_for_location(location_id: &str, distances: &[f64]) -> Vec<Reading> {
        distances
            .iter()
            .enumerate()
            .map(|(i, &distance)| Reading {
                id: None,
                location_id: location_id.to_string(),
                container_id: format!("{location_id}-01"),
                recorded_at: base_time() + Duration::minutes(i as i64),
                distance,
                sensed: Coordinate::new(47.0 + distance * 9e-6 + i as f64 * 1e-7, 8.0),
                reference: Some(Coordinate::new(47.0, 8.0)),
            })
            .collect()
    }

    pub fn readings_from_distances(distances: &[f64]) -> Vec<Reading> {
        readings_for_location("L1", distances)
    }
}

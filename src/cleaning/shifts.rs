use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::cleaning::config::CleaningConfig;
use crate::cleaning::rolling::{mean, rolling_median};
use crate::models::{Classification, ClassifiedReading};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Thresholds derived from the non-outlier distances of one location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftThresholds {
    /// Maximum deviation from the rolling median inside a shift run.
    pub shift_span: f64,
    /// Minimum distance a reading needs to be part of a shift run.
    pub min_distance_for_shift: f64,
}

impl ShiftThresholds {
    pub fn from_distances(distances: &[f64], config: &CleaningConfig) -> Option<Self> {
        let mean_distance = mean(distances)?;
        let max = distances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = distances.iter().copied().fold(f64::INFINITY, f64::min);

        Some(Self {
            shift_span: config
                .min_shift_span
                .max(config.scaling_factor_span * (max - min)),
            min_distance_for_shift: config
                .min_shift_threshold
                .max(config.scaling_factor_min_distance * mean_distance),
        })
    }
}

/// Output of the shift detector.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftDetection {
    pub readings: Vec<ClassifiedReading>,
    /// `None` when every reading of the group is an outlier.
    pub thresholds: Option<ShiftThresholds>,
}

/// Finds runs of consecutive qualifying readings in a single pass.
///
/// A reading qualifies when it is far enough from the reference point and
/// close to its rolling median. Runs shorter than `min_points` are dropped.
/// Ranges index into `distances`.
pub fn find_shift_runs(
    distances: &[f64],
    medians: &[Option<f64>],
    thresholds: &ShiftThresholds,
    min_points: usize,
) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;

    for (index, (&distance, median)) in distances.iter().zip(medians).enumerate() {
        let qualifies = distance >= thresholds.min_distance_for_shift
            && median
                .map(|m| (distance - m).abs() <= thresholds.shift_span)
                .unwrap_or(false);

        match (qualifies, run_start) {
            (true, None) => run_start = Some(index),
            (false, Some(start)) => {
                if index - start >= min_points {
                    runs.push(start..index);
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        if distances.len() - start >= min_points {
            runs.push(start..distances.len());
        }
    }

    runs
}

/// Upgrades lone accurate readings sandwiched between two shift readings at
/// a similar distance. `positions` maps the non-outlier sequence back into
/// `readings`. Returns the number of bridged readings.
fn bridge_single_gaps(
    readings: &mut [ClassifiedReading],
    positions: &[usize],
    distances: &[f64],
    shift_span: f64,
) -> usize {
    let mut bridged = 0;

    for k in 1..positions.len().saturating_sub(1) {
        let prev = &readings[positions[k - 1]];
        let next = &readings[positions[k + 1]];
        let current = &readings[positions[k]];

        if prev.is_shift()
            && next.is_shift()
            && current.classification == Classification::Accurate
            && (distances[k - 1] - distances[k + 1]).abs() <= shift_span
        {
            readings[positions[k]].classification = Classification::TemporaryShift;
            bridged += 1;
        }
    }

    bridged
}

/// Marks sustained relocations among the non-outlier readings of a
/// time-ordered group. Outliers are skipped entirely and keep their label.
pub fn detect_shifts(classified: &[ClassifiedReading], config: &CleaningConfig) -> ShiftDetection {
    let mut readings = classified.to_vec();

    let positions: Vec<usize> = readings
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_outlier())
        .map(|(i, _)| i)
        .collect();

    // Detection starts from a clean slate for every non-outlier.
    for &position in &positions {
        readings[position].classification = Classification::Accurate;
    }

    let distances: Vec<f64> = positions
        .iter()
        .map(|&i| readings[i].reading.distance)
        .collect();

    let Some(thresholds) = ShiftThresholds::from_distances(&distances, config) else {
        return ShiftDetection {
            readings,
            thresholds: None,
        };
    };

    let medians = rolling_median(&distances, config.rolling_window_size);
    let runs = find_shift_runs(&distances, &medians, &thresholds, config.min_points_for_shift);

    for run in &runs {
        for k in run.clone() {
            readings[positions[k]].classification = Classification::TemporaryShift;
        }
    }

    let bridged = bridge_single_gaps(&mut readings, &positions, &distances, thresholds.shift_span);

    if let Some(first) = readings.first() {
        log_debug!(
            "location {}: span={:.1} min_distance={:.1}, {} shift runs, {} bridged",
            first.reading.location_id,
            thresholds.shift_span,
            thresholds.min_distance_for_shift,
            runs.len(),
            bridged
        );
    }

    ShiftDetection {
        readings,
        thresholds: Some(thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::test_support::readings_from_distances;

    fn accurate(distances: &[f64]) -> Vec<ClassifiedReading> {
        readings_from_distances(distances)
            .into_iter()
            .map(ClassifiedReading::accurate)
            .collect()
    }

    fn shift_indices(readings: &[ClassifiedReading]) -> Vec<usize> {
        readings
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_shift())
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_dynamic_thresholds() {
        let config = CleaningConfig::default();
        let thresholds = ShiftThresholds::from_distances(&[10.0, 110.0], &config).unwrap();
        assert!((thresholds.shift_span - 30.0).abs() < 1e-9);
        assert_eq!(thresholds.min_distance_for_shift, 35.0);

        let flat = ShiftThresholds::from_distances(&[200.0, 200.0], &config).unwrap();
        assert_eq!(flat.shift_span, 10.0);
        assert!((flat.min_distance_for_shift - 60.0).abs() < 1e-9);

        assert!(ShiftThresholds::from_distances(&[], &config).is_none());
    }

    #[test]
    fn test_runs_need_a_defined_median() {
        let thresholds = ShiftThresholds {
            shift_span: 50.0,
            min_distance_for_shift: 35.0,
        };
        let distances = [100.0, 100.0, 100.0, 100.0];
        let medians = rolling_median(&distances, 3);
        // The first and last readings have no median and break the run.
        assert_eq!(find_shift_runs(&distances, &medians, &thresholds, 3), vec![]);
        assert_eq!(find_shift_runs(&distances, &medians, &thresholds, 2), vec![1..3]);
    }

    #[test]
    fn test_run_at_end_of_sequence_is_kept() {
        let thresholds = ShiftThresholds {
            shift_span: 50.0,
            min_distance_for_shift: 35.0,
        };
        let distances = [5.0, 100.0, 100.0, 100.0];
        let medians = vec![None, Some(100.0), Some(100.0), Some(100.0)];
        assert_eq!(find_shift_runs(&distances, &medians, &thresholds, 3), vec![1..4]);
    }

    #[test]
    fn test_run_of_three_becomes_shift() {
        let detection = detect_shifts(
            &accurate(&[5.0, 5.0, 200.0, 205.0, 210.0, 6.0, 5.0]),
            &CleaningConfig::default(),
        );
        assert_eq!(shift_indices(&detection.readings), vec![2, 3, 4]);
    }

    #[test]
    fn test_run_of_two_is_discarded() {
        let detection = detect_shifts(
            &accurate(&[5.0, 5.0, 5.0, 200.0, 205.0, 5.0, 5.0, 5.0]),
            &CleaningConfig::default(),
        );
        assert!(shift_indices(&detection.readings).is_empty());
    }

    #[test]
    fn test_single_point_bridging() {
        let detection = detect_shifts(
            &accurate(&[5.0, 200.0, 205.0, 210.0, 20.0, 205.0, 210.0, 200.0, 5.0]),
            &CleaningConfig::default(),
        );
        assert_eq!(shift_indices(&detection.readings), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_outliers_are_skipped_and_untouched() {
        let mut readings = accurate(&[5.0, 5.0, 200.0, 205.0, 900.0, 210.0, 6.0, 5.0]);
        readings[4].classification = Classification::Outlier;

        let detection = detect_shifts(&readings, &CleaningConfig::default());
        assert_eq!(shift_indices(&detection.readings), vec![2, 3, 5]);
        assert!(detection.readings[4].is_outlier());
    }

    #[test]
    fn test_all_outliers_leaves_group_unchanged() {
        let mut readings = accurate(&[500.0, 600.0]);
        for reading in &mut readings {
            reading.classification = Classification::Outlier;
        }
        let detection = detect_shifts(&readings, &CleaningConfig::default());
        assert!(detection.thresholds.is_none());
        assert_eq!(detection.readings, readings);
    }
}

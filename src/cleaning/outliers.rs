use crate::cleaning::config::CleaningConfig;
use crate::cleaning::rolling::{rolling_mean, rolling_std};
use crate::models::{Classification, ClassifiedReading, Reading};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Result of the iterative statistical pruning.
#[derive(Debug, Clone, PartialEq)]
pub struct PruningOutcome {
    /// Outlier mask over the whole group, including the initial flags.
    pub flagged: Vec<bool>,
    /// Indices newly flagged by each pass. The last pass is always empty.
    pub passes: Vec<Vec<usize>>,
}

impl PruningOutcome {
    pub fn outlier_count(&self) -> usize {
        self.flagged.iter().filter(|f| **f).count()
    }
}

/// Flags every reading beyond the hard distance limit.
pub fn hard_threshold_flags(distances: &[f64], config: &CleaningConfig) -> Vec<bool> {
    distances
        .iter()
        .map(|d| *d > config.hard_outlier_threshold)
        .collect()
}

/// Repeatedly flags readings that deviate from the centered rolling mean of
/// the still unflagged readings, until a pass finds nothing new.
///
/// Statistics are recomputed on the shrinking set after every pass, so a
/// reading masked by a large neighbour can surface once that neighbour is
/// gone. Positions without a full window are never flagged here.
pub fn prune_statistical_outliers(
    distances: &[f64],
    initially_flagged: &[bool],
    config: &CleaningConfig,
) -> PruningOutcome {
    let mut flagged = initially_flagged.to_vec();
    let mut passes = Vec::new();

    loop {
        let remaining: Vec<usize> = (0..distances.len()).filter(|&i| !flagged[i]).collect();
        let values: Vec<f64> = remaining.iter().map(|&i| distances[i]).collect();
        let means = rolling_mean(&values, config.outlier_window_size);
        let stds = rolling_std(&values, config.outlier_window_size);

        let new_outliers: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter_map(|(pos, &index)| {
                let mean = means[pos]?;
                let diff = (distances[index] - mean).abs();
                let beyond_std = stds[pos]
                    .map(|std| std > 0.0 && diff > config.outlier_multiplier * std)
                    .unwrap_or(false);

                (diff > config.outlier_absolute_threshold || beyond_std).then_some(index)
            })
            .collect();

        for &index in &new_outliers {
            flagged[index] = true;
        }

        let done = new_outliers.is_empty();
        passes.push(new_outliers);
        if done {
            break;
        }
    }

    PruningOutcome { flagged, passes }
}

/// Classifies each reading of a time-ordered group as accurate or outlier.
///
/// Hard threshold first, then statistical pruning, then the small-distance
/// amnesty which overrides both.
pub fn classify_outliers(readings: &[Reading], config: &CleaningConfig) -> Vec<ClassifiedReading> {
    let distances: Vec<f64> = readings.iter().map(|r| r.distance).collect();

    let hard = hard_threshold_flags(&distances, config);
    let outcome = prune_statistical_outliers(&distances, &hard, config);

    if let Some(first) = readings.first() {
        log_debug!(
            "location {}: {} hard outliers, {} after {} pruning passes",
            first.location_id,
            hard.iter().filter(|f| **f).count(),
            outcome.outlier_count(),
            outcome.passes.len()
        );
    }

    readings
        .iter()
        .zip(outcome.flagged)
        .map(|(reading, flagged)| {
            let classification = if reading.distance < config.min_distance_for_shift || !flagged {
                Classification::Accurate
            } else {
                Classification::Outlier
            };

            ClassifiedReading {
                reading: reading.clone(),
                classification,
            }
        })
        .collect()
}

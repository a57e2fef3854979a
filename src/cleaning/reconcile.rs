use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Classification, ClassifiedReading, CleanedReading, Coordinate, CoordinateSource,
};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// A maximal run of consecutive `temporary_shift` readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    /// First index of the phase in the group.
    pub start: usize,
    /// One past the last index.
    pub end: usize,
    /// Mean sensed position of the phase members.
    pub mean: Coordinate,
    pub first_recorded_at: DateTime<Utc>,
    pub last_recorded_at: DateTime<Utc>,
}

impl Phase {
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn from_run(readings: &[ClassifiedReading], start: usize, end: usize) -> Option<Self> {
        let members = &readings[start..end];
        let mean = Coordinate::mean(members.iter().map(|r| &r.reading.sensed))?;

        Some(Phase {
            start,
            end,
            mean,
            first_recorded_at: members.first()?.reading.recorded_at,
            last_recorded_at: members.last()?.reading.recorded_at,
        })
    }
}

/// Splits the shift readings into phases. Any reading of another class,
/// outliers included, closes the current phase.
pub fn find_phases(readings: &[ClassifiedReading]) -> Vec<Phase> {
    let mut phases = Vec::new();
    let mut phase_start: Option<usize> = None;

    for (index, reading) in readings.iter().enumerate() {
        match (reading.is_shift(), phase_start) {
            (true, None) => phase_start = Some(index),
            (false, Some(start)) => {
                phases.extend(Phase::from_run(readings, start, index));
                phase_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = phase_start {
        phases.extend(Phase::from_run(readings, start, readings.len()));
    }

    phases
}

/// Assigns a corrected coordinate to every reading of a classified group.
///
/// Accurate readings sit on the reference point, shift readings on their
/// phase mean. An outlier recorded strictly after one phase ended and
/// strictly before another began is taken as a reading in transit: it
/// moves to the midpoint of those two phase means and becomes a shift
/// itself. Other outliers fall back to the reference point, or stay
/// unresolved when the group has none.
pub fn reconcile_coordinates(classified: &[ClassifiedReading]) -> Vec<CleanedReading> {
    reconcile_with_phases(classified, &find_phases(classified))
}

/// Same as [`reconcile_coordinates`] with phases already found by
/// [`find_phases`] on the same readings.
pub fn reconcile_with_phases(classified: &[ClassifiedReading], phases: &[Phase]) -> Vec<CleanedReading> {
    let group_reference = classified.iter().find_map(|r| r.reading.reference);

    let cleaned: Vec<CleanedReading> = classified
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let reference = item.reading.reference.or(group_reference);

            let (classification, corrected, source) = match item.classification {
                Classification::Accurate => match reference {
                    Some(reference) => (
                        Classification::Accurate,
                        Some(reference),
                        CoordinateSource::Reference,
                    ),
                    None => (
                        Classification::Accurate,
                        Some(item.reading.sensed),
                        CoordinateSource::SensedFallback,
                    ),
                },
                Classification::TemporaryShift => {
                    let mean = phases
                        .iter()
                        .find(|phase| phase.contains(index))
                        .map(|phase| phase.mean)
                        .unwrap_or(item.reading.sensed);
                    (
                        Classification::TemporaryShift,
                        Some(mean),
                        CoordinateSource::PhaseMean,
                    )
                }
                Classification::Outlier => {
                    let at = item.reading.recorded_at;
                    let before = phases.iter().rev().find(|phase| phase.last_recorded_at < at);
                    let after = phases.iter().find(|phase| phase.first_recorded_at > at);

                    match (before, after, reference) {
                        (Some(before), Some(after), _) => (
                            Classification::TemporaryShift,
                            Some(before.mean.midpoint(&after.mean)),
                            CoordinateSource::Interpolated,
                        ),
                        (_, _, Some(reference)) => (
                            Classification::Outlier,
                            Some(reference),
                            CoordinateSource::ReferenceFallback,
                        ),
                        _ => (Classification::Outlier, None, CoordinateSource::Unresolved),
                    }
                }
            };

            CleanedReading {
                reading: item.reading.clone(),
                classification,
                corrected,
                source,
            }
        })
        .collect();

    if let Some(first) = classified.first() {
        log_debug!(
            "location {}: {} phases, {} interpolated, {} unresolved",
            first.reading.location_id,
            phases.len(),
            cleaned
                .iter()
                .filter(|r| r.source == CoordinateSource::Interpolated)
                .count(),
            cleaned.iter().filter(|r| r.is_unresolved()).count()
        );
    }

    cleaned
}

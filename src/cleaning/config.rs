use serde::{Deserialize, Serialize};

/// Readings farther than this from the reference point are outliers outright.
pub const HARD_OUTLIER_THRESHOLD: f64 = 400.0;
/// Maximum deviation from the local rolling mean before a reading is an outlier.
pub const OUTLIER_ABSOLUTE_THRESHOLD: f64 = 150.0;
/// Deviation limit in multiples of the local rolling standard deviation.
pub const OUTLIER_MULTIPLIER: f64 = 3.5;
/// Centered window used for the outlier rolling statistics.
pub const OUTLIER_WINDOW_SIZE: usize = 4;
/// Readings closer than this are sensor jitter and always accurate.
pub const MIN_DISTANCE_FOR_SHIFT: f64 = 15.0;

/// Share of the group's distance range used as shift span.
pub const SCALING_FACTOR_SPAN: f64 = 0.3;
/// Share of the group's mean distance used as minimum shift distance.
pub const SCALING_FACTOR_MIN_DISTANCE: f64 = 0.3;
/// Floor of the dynamic shift span.
pub const MIN_SHIFT_SPAN: f64 = 10.0;
/// Floor of the dynamic minimum shift distance.
pub const MIN_SHIFT_THRESHOLD: f64 = 35.0;
/// Shortest run of consecutive readings accepted as a temporary shift.
pub const MIN_POINTS_FOR_SHIFT: usize = 3;
/// Centered window used for the shift detector's rolling median.
pub const ROLLING_WINDOW_SIZE: usize = 3;

/// Tunable thresholds for the cleaning pipeline.
///
/// Passed by reference into every stage so that differently tuned
/// configurations can run side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleaningConfig {
    pub hard_outlier_threshold: f64,
    pub outlier_absolute_threshold: f64,
    pub outlier_multiplier: f64,
    pub outlier_window_size: usize,

    /// Amnesty limit: anything below is forced back to accurate.
    pub min_distance_for_shift: f64,

    pub scaling_factor_span: f64,
    pub scaling_factor_min_distance: f64,
    pub min_shift_span: f64,
    pub min_shift_threshold: f64,
    pub min_points_for_shift: usize,
    pub rolling_window_size: usize,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            hard_outlier_threshold: HARD_OUTLIER_THRESHOLD,
            outlier_absolute_threshold: OUTLIER_ABSOLUTE_THRESHOLD,
            outlier_multiplier: OUTLIER_MULTIPLIER,
            outlier_window_size: OUTLIER_WINDOW_SIZE,
            min_distance_for_shift: MIN_DISTANCE_FOR_SHIFT,
            scaling_factor_span: SCALING_FACTOR_SPAN,
            scaling_factor_min_distance: SCALING_FACTOR_MIN_DISTANCE,
            min_shift_span: MIN_SHIFT_SPAN,
            min_shift_threshold: MIN_SHIFT_THRESHOLD,
            min_points_for_shift: MIN_POINTS_FOR_SHIFT,
            rolling_window_size: ROLLING_WINDOW_SIZE,
        }
    }
}

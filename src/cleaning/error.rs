/// Input contract violations detected while preparing a location group.
///
/// Every variant names the location and the offending row so a failing
/// group can be reported without aborting the rest of the batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CleaningError {
    #[error("location {location_id}: row {row} is missing required field `{field}`")]
    MissingField {
        location_id: String,
        row: usize,
        field: &'static str,
    },

    #[error("location {location_id}: row {row} has unparseable timestamp '{value}'")]
    UnparseableTimestamp {
        location_id: String,
        row: usize,
        value: String,
    },

    #[error("location {location_id}: row {row} has invalid distance {value}")]
    InvalidDistance {
        location_id: String,
        row: usize,
        value: f64,
    },

    #[error("location {location_id}: row {row} has non-finite `{field}`")]
    InvalidCoordinate {
        location_id: String,
        row: usize,
        field: &'static str,
    },

    #[error("location {location_id}: row {row} is recorded before the row preceding it")]
    UnorderedTimestamps { location_id: String, row: usize },

    #[error("location {location_id}: row {row} belongs to location {found}")]
    ForeignReading {
        location_id: String,
        row: usize,
        found: String,
    },

    #[error("location id must not be empty")]
    EmptyLocationId,

    #[error("location {location_id}: cleaning task failed: {reason}")]
    TaskFailed { location_id: String, reason: String },
}

impl CleaningError {
    pub fn location_id(&self) -> Option<&str> {
        match self {
            CleaningError::MissingField { location_id, .. }
            | CleaningError::UnparseableTimestamp { location_id, .. }
            | CleaningError::InvalidDistance { location_id, .. }
            | CleaningError::InvalidCoordinate { location_id, .. }
            | CleaningError::UnorderedTimestamps { location_id, .. }
            | CleaningError::ForeignReading { location_id, .. }
            | CleaningError::TaskFailed { location_id, .. } => Some(location_id),
            CleaningError::EmptyLocationId => None,
        }
    }
}

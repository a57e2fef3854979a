use crate::cleaning::error::CleaningError;
use crate::models::{Coordinate, Reading};

fn check_coordinate(
    location_id: &str,
    row: usize,
    coordinate: &Coordinate,
    fields: (&'static str, &'static str),
) -> Result<(), CleaningError> {
    if coordinate.is_finite() {
        return Ok(());
    }

    let field = if coordinate.lat.is_finite() { fields.1 } else { fields.0 };
    Err(CleaningError::InvalidCoordinate {
        location_id: location_id.to_string(),
        row,
        field,
    })
}

/// Checks the input contract of one location group before cleaning.
///
/// Readings must belong to `location_id`, carry finite non-negative
/// distances and finite coordinates, and be ordered by `recorded_at`
/// (equal timestamps are allowed and keep their input order).
pub fn validate_group(location_id: &str, readings: &[Reading]) -> Result<(), CleaningError> {
    if location_id.trim().is_empty() {
        return Err(CleaningError::EmptyLocationId);
    }

    for (row, reading) in readings.iter().enumerate() {
        if reading.location_id != location_id {
            return Err(CleaningError::ForeignReading {
                location_id: location_id.to_string(),
                row,
                found: reading.location_id.clone(),
            });
        }

        if !reading.distance.is_finite() || reading.distance < 0.0 {
            return Err(CleaningError::InvalidDistance {
                location_id: location_id.to_string(),
                row,
                value: reading.distance,
            });
        }

        check_coordinate(location_id, row, &reading.sensed, ("sensed_lat", "sensed_lon"))?;
        if let Some(reference) = &reading.reference {
            check_coordinate(location_id, row, reference, ("reference_lat", "reference_lon"))?;
        }

        if row > 0 && reading.recorded_at < readings[row - 1].recorded_at {
            return Err(CleaningError::UnorderedTimestamps {
                location_id: location_id.to_string(),
                row,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::test_support::readings_from_distances;

    #[test]
    fn test_valid_group() {
        let readings = readings_from_distances(&[0.0, 10.0, 20.0]);
        assert!(validate_group("L1", &readings).is_ok());
        assert!(validate_group("L1", &[]).is_ok());
    }

    #[test]
    fn test_negative_distance() {
        let readings = readings_from_distances(&[10.0, -1.0]);
        assert_eq!(
            validate_group("L1", &readings),
            Err(CleaningError::InvalidDistance {
                location_id: "L1".into(),
                row: 1,
                value: -1.0,
            })
        );
    }

    #[test]
    fn test_nan_distance() {
        let readings = readings_from_distances(&[f64::NAN]);
        assert!(matches!(
            validate_group("L1", &readings),
            Err(CleaningError::InvalidDistance { row: 0, .. })
        ));
    }

    #[test]
    fn test_unordered_timestamps() {
        let mut readings = readings_from_distances(&[10.0, 20.0, 30.0]);
        readings.swap(1, 2);
        assert_eq!(
            validate_group("L1", &readings),
            Err(CleaningError::UnorderedTimestamps {
                location_id: "L1".into(),
                row: 2,
            })
        );
    }

    #[test]
    fn test_equal_timestamps_are_allowed() {
        let mut readings = readings_from_distances(&[10.0, 20.0]);
        readings[1].recorded_at = readings[0].recorded_at;
        assert!(validate_group("L1", &readings).is_ok());
    }

    #[test]
    fn test_foreign_reading() {
        let mut readings = readings_from_distances(&[10.0, 20.0]);
        readings[1].location_id = "L2".into();
        assert!(matches!(
            validate_group("L1", &readings),
            Err(CleaningError::ForeignReading { row: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_reference_coordinate() {
        let mut readings = readings_from_distances(&[10.0]);
        readings[0].reference = Some(Coordinate::new(47.0, f64::INFINITY));
        assert_eq!(
            validate_group("L1", &readings),
            Err(CleaningError::InvalidCoordinate {
                location_id: "L1".into(),
                row: 0,
                field: "reference_lon",
            })
        );
    }

    #[test]
    fn test_non_finite_sensed_latitude_is_named_first() {
        let mut readings = readings_from_distances(&[10.0, 20.0]);
        readings[1].sensed = Coordinate::new(f64::NAN, f64::NAN);
        assert!(matches!(
            validate_group("L1", &readings),
            Err(CleaningError::InvalidCoordinate { row: 1, field: "sensed_lat", .. })
        ));
    }

    #[test]
    fn test_empty_location_id() {
        assert_eq!(validate_group(" ", &[]), Err(CleaningError::EmptyLocationId));
    }
}

//! Reading data model.
//!
//! A reading is one distance observation reported by the phone mounted on a
//! container. The cleaning stages never mutate a reading; they wrap it in a
//! new record that carries the classification and, at the end, the
//! corrected coordinate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cleaning::error::CleaningError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Planar midpoint. Locations span a few hundred meters at most, so
    /// averaging degrees is accurate enough.
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate {
            lat: (self.lat + other.lat) / 2.0,
            lon: (self.lon + other.lon) / 2.0,
        }
    }

    /// Arithmetic mean of a set of coordinates, `None` when empty.
    pub fn mean<'a, I>(coordinates: I) -> Option<Coordinate>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let (mut lat, mut lon, mut count) = (0.0, 0.0, 0usize);
        for coordinate in coordinates {
            lat += coordinate.lat;
            lon += coordinate.lon;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        Some(Coordinate {
            lat: lat / count as f64,
            lon: lon / count as f64,
        })
    }
}

/// One sensor observation for a container at a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: Option<i64>,
    pub location_id: String,
    pub container_id: String,
    pub recorded_at: DateTime<Utc>,
    /// Meters between the sensed position and the location's reference point.
    pub distance: f64,
    pub sensed: Coordinate,
    pub reference: Option<Coordinate>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    Accurate,
    Outlier,
    TemporaryShift,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Accurate => "accurate",
            Classification::Outlier => "outlier",
            Classification::TemporaryShift => "temporary_shift",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accurate" => Some(Classification::Accurate),
            "outlier" => Some(Classification::Outlier),
            "temporary_shift" => Some(Classification::TemporaryShift),
            _ => None,
        }
    }
}

/// A reading together with the classification assigned so far.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedReading {
    pub reading: Reading,
    pub classification: Classification,
}

impl ClassifiedReading {
    pub fn accurate(reading: Reading) -> Self {
        Self {
            reading,
            classification: Classification::Accurate,
        }
    }

    pub fn is_outlier(&self) -> bool {
        self.classification == Classification::Outlier
    }

    pub fn is_shift(&self) -> bool {
        self.classification == Classification::TemporaryShift
    }
}

/// Where the corrected coordinate of a cleaned reading came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    /// Accurate reading placed on the location's reference point.
    Reference,
    /// Accurate reading in a group without any reference coordinate.
    SensedFallback,
    /// Member of a shift phase, placed on the phase's mean position.
    PhaseMean,
    /// Outlier between two phases, placed between their mean positions.
    Interpolated,
    /// Outlier without bracketing phases, placed on the reference point.
    ReferenceFallback,
    /// Outlier without bracketing phases and without a reference.
    Unresolved,
}

impl CoordinateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateSource::Reference => "reference",
            CoordinateSource::SensedFallback => "sensed_fallback",
            CoordinateSource::PhaseMean => "phase_mean",
            CoordinateSource::Interpolated => "interpolated",
            CoordinateSource::ReferenceFallback => "reference_fallback",
            CoordinateSource::Unresolved => "unresolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reference" => Some(CoordinateSource::Reference),
            "sensed_fallback" => Some(CoordinateSource::SensedFallback),
            "phase_mean" => Some(CoordinateSource::PhaseMean),
            "interpolated" => Some(CoordinateSource::Interpolated),
            "reference_fallback" => Some(CoordinateSource::ReferenceFallback),
            "unresolved" => Some(CoordinateSource::Unresolved),
            _ => None,
        }
    }
}

/// Final output record of the cleaning pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CleanedReading {
    #[serde(flatten)]
    pub reading: Reading,
    pub classification: Classification,
    pub corrected: Option<Coordinate>,
    pub source: CoordinateSource,
}

impl CleanedReading {
    /// Data-quality flag: the reading could not be placed anywhere.
    pub fn is_unresolved(&self) -> bool {
        self.source == CoordinateSource::Unresolved
    }
}

/// Loosely typed import row, as produced by upstream exports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    pub id: Option<i64>,
    pub location_id: Option<String>,
    pub container_id: Option<String>,
    pub recorded_at: Option<String>,
    pub distance: Option<f64>,
    pub sensed_lat: Option<f64>,
    pub sensed_lon: Option<f64>,
    pub reference_lat: Option<f64>,
    pub reference_lon: Option<f64>,
}

impl RawReading {
    /// Rows without a distance or timestamp are filtered upstream of the
    /// cleaning core rather than rejected.
    pub fn is_incomplete(&self) -> bool {
        self.distance.is_none() || self.recorded_at.is_none()
    }

    pub fn into_reading(self, row: usize) -> Result<Reading, CleaningError> {
        let location_id = self
            .location_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| CleaningError::MissingField {
                location_id: "<unknown>".into(),
                row,
                field: "location_id",
            })?;

        let missing = |field: &'static str| CleaningError::MissingField {
            location_id: location_id.clone(),
            row,
            field,
        };

        let raw_timestamp = self.recorded_at.clone().ok_or_else(|| missing("recorded_at"))?;
        let recorded_at = DateTime::parse_from_rfc3339(&raw_timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| CleaningError::UnparseableTimestamp {
                location_id: location_id.clone(),
                row,
                value: raw_timestamp.clone(),
            })?;

        let distance = self.distance.ok_or_else(|| missing("distance"))?;
        let sensed_lat = self.sensed_lat.ok_or_else(|| missing("sensed_lat"))?;
        let sensed_lon = self.sensed_lon.ok_or_else(|| missing("sensed_lon"))?;

        let reference = match (self.reference_lat, self.reference_lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        };

        Ok(Reading {
            id: self.id,
            container_id: self.container_id.unwrap_or_default(),
            location_id,
            recorded_at,
            distance,
            sensed: Coordinate::new(sensed_lat, sensed_lon),
            reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_row() -> RawReading {
        RawReading {
            id: None,
            location_id: Some("1042".into()),
            container_id: Some("10420103".into()),
            recorded_at: Some("2024-03-01T08:15:00Z".into()),
            distance: Some(12.5),
            sensed_lat: Some(47.37),
            sensed_lon: Some(8.54),
            reference_lat: Some(47.3701),
            reference_lon: Some(8.5402),
        }
    }

    #[test]
    fn test_classification_wire_names() {
        let json = serde_json::to_string(&Classification::TemporaryShift).unwrap();
        assert_eq!(json, "\"temporary_shift\"");
        for class in [
            Classification::Accurate,
            Classification::Outlier,
            Classification::TemporaryShift,
        ] {
            assert_eq!(Classification::parse(class.as_str()), Some(class));
        }
        assert_eq!(Classification::parse("shifted"), None);
        assert_eq!(Classification::default(), Classification::Accurate);
    }

    #[test]
    fn test_coordinate_mean_and_midpoint() {
        let points = [Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 6.0)];
        let mean = Coordinate::mean(points.iter()).unwrap();
        assert_eq!(mean, Coordinate::new(2.0, 4.0));
        assert_eq!(points[0].midpoint(&points[1]), mean);
        assert!(Coordinate::mean(std::iter::empty()).is_none());
        assert!(mean.is_finite());
        assert!(!Coordinate::new(1.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_raw_reading_conversion() {
        let reading = raw_row().into_reading(0).unwrap();
        assert_eq!(reading.location_id, "1042");
        assert_eq!(reading.distance, 12.5);
        assert_eq!(reading.reference, Some(Coordinate::new(47.3701, 8.5402)));
    }

    #[test]
    fn test_raw_reading_partial_reference_is_dropped() {
        let mut row = raw_row();
        row.reference_lon = None;
        let reading = row.into_reading(0).unwrap();
        assert!(reading.reference.is_none());
    }

    #[test]
    fn test_raw_reading_missing_sensed_coordinate() {
        let mut row = raw_row();
        row.sensed_lon = None;
        let err = row.into_reading(7).unwrap_err();
        assert_eq!(
            err,
            CleaningError::MissingField {
                location_id: "1042".into(),
                row: 7,
                field: "sensed_lon",
            }
        );
    }

    #[test]
    fn test_raw_reading_bad_timestamp() {
        let mut row = raw_row();
        row.recorded_at = Some("yesterday".into());
        assert!(matches!(
            row.into_reading(3),
            Err(CleaningError::UnparseableTimestamp { row: 3, .. })
        ));
    }

    #[test]
    fn test_incomplete_rows() {
        let mut row = raw_row();
        assert!(!row.is_incomplete());
        row.distance = None;
        assert!(row.is_incomplete());
    }
}

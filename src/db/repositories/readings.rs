use anyhow::{bail, Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{coordinate_from_columns, parse_classification, parse_coordinate_source, parse_datetime},
    Database,
};
use crate::models::{CleanedReading, Coordinate, Reading};

const READING_COLUMNS: &str = "id, location_id, container_id, recorded_at, distance,
    sensed_lat, sensed_lon, reference_lat, reference_lon,
    classification, corrected_lat, corrected_lon, coordinate_source";

fn row_to_reading(row: &Row) -> Result<Reading> {
    let recorded_at: String = row.get("recorded_at")?;

    Ok(Reading {
        id: row.get("id")?,
        location_id: row.get("location_id")?,
        container_id: row.get("container_id")?,
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
        distance: row.get("distance")?,
        sensed: Coordinate::new(row.get("sensed_lat")?, row.get("sensed_lon")?),
        reference: coordinate_from_columns(row.get("reference_lat")?, row.get("reference_lon")?),
    })
}

fn row_to_cleaned_reading(row: &Row) -> Result<CleanedReading> {
    let classification: String = row.get("classification")?;
    let source: String = row.get("coordinate_source")?;

    Ok(CleanedReading {
        reading: row_to_reading(row)?,
        classification: parse_classification(&classification)?,
        corrected: coordinate_from_columns(row.get("corrected_lat")?, row.get("corrected_lon")?),
        source: parse_coordinate_source(&source)?,
    })
}

impl Database {
    /// Inserts raw readings in one transaction, returning how many were stored.
    pub async fn insert_readings(&self, readings: &[Reading]) -> Result<usize> {
        let records = readings.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO readings (
                        location_id,
                        container_id,
                        recorded_at,
                        distance,
                        sensed_lat,
                        sensed_lon,
                        reference_lat,
                        reference_lon
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;

                for record in &records {
                    stmt.execute(params![
                        record.location_id,
                        record.container_id,
                        record.recorded_at.to_rfc3339(),
                        record.distance,
                        record.sensed.lat,
                        record.sensed.lon,
                        record.reference.map(|c| c.lat),
                        record.reference.map(|c| c.lon),
                    ])
                    .with_context(|| {
                        format!("failed to insert reading for location {}", record.location_id)
                    })?;
                }
            }
            tx.commit().context("failed to commit reading import")?;
            Ok(records.len())
        })
        .await
    }

    pub async fn list_location_ids(&self) -> Result<Vec<String>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT location_id
                 FROM readings
                 GROUP BY location_id
                 ORDER BY MIN(id) ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            Ok(ids)
        })
        .await
    }

    /// All raw readings of a location in time order.
    pub async fn get_readings_for_location(&self, location_id: &str) -> Result<Vec<Reading>> {
        let location_id = location_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {READING_COLUMNS}
                 FROM readings
                 WHERE location_id = ?1
                 ORDER BY recorded_at ASC, id ASC"
            ))?;

            let mut rows = stmt.query(params![location_id])?;
            let mut readings = Vec::new();
            while let Some(row) = rows.next()? {
                readings.push(row_to_reading(row)?);
            }
            Ok(readings)
        })
        .await
    }

    /// Writes the cleaning output of one location atomically: either every
    /// reading of the group is updated or none is.
    pub async fn save_cleaned_group(
        &self,
        location_id: &str,
        run_id: Option<&str>,
        cleaned: &[CleanedReading],
    ) -> Result<()> {
        let location_id = location_id.to_string();
        let run_id = run_id.map(str::to_string);
        let records = cleaned.to_vec();

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "UPDATE readings
                     SET classification = ?1,
                         corrected_lat = ?2,
                         corrected_lon = ?3,
                         coordinate_source = ?4,
                         cleaned_by_run = ?5
                     WHERE id = ?6 AND location_id = ?7",
                )?;

                for record in &records {
                    let Some(id) = record.reading.id else {
                        bail!("location {location_id}: cleaned reading has no stored id");
                    };

                    let updated = stmt.execute(params![
                        record.classification.as_str(),
                        record.corrected.map(|c| c.lat),
                        record.corrected.map(|c| c.lon),
                        record.source.as_str(),
                        run_id,
                        id,
                        location_id,
                    ])?;

                    if updated != 1 {
                        bail!("location {location_id}: reading {id} not found");
                    }
                }
            }
            tx.commit()
                .with_context(|| format!("failed to commit cleaned location {location_id}"))?;
            Ok(())
        })
        .await
    }

    pub async fn get_cleaned_readings_for_location(
        &self,
        location_id: &str,
    ) -> Result<Vec<CleanedReading>> {
        let location_id = location_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {READING_COLUMNS}
                 FROM readings
                 WHERE location_id = ?1 AND classification IS NOT NULL
                 ORDER BY recorded_at ASC, id ASC"
            ))?;

            let mut rows = stmt.query(params![location_id])?;
            let mut readings = Vec::new();
            while let Some(row) = rows.next()? {
                readings.push(row_to_cleaned_reading(row)?);
            }
            Ok(readings)
        })
        .await
    }

    pub async fn get_all_cleaned_readings(&self) -> Result<Vec<CleanedReading>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {READING_COLUMNS}
                 FROM readings
                 WHERE classification IS NOT NULL
                 ORDER BY location_id ASC, recorded_at ASC, id ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut readings = Vec::new();
            while let Some(row) = rows.next()? {
                readings.push(row_to_cleaned_reading(row)?);
            }
            Ok(readings)
        })
        .await
    }
}

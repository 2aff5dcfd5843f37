//! ADS-B input records and CSV ingestion.
//!
//! This module provides the `AdsbRecord` struct for reading position/integrity
//! reports from CSV dumps (readsb/adsbexchange style tables). Each row carries
//! the aircraft hex code, barometric altitude, navigation integrity category
//! (NIC), a fractional Unix-epoch timestamp, and the reported position. The
//! altitude column is special: aircraft on the ground report the literal string
//! `ground` instead of a number, so it is modeled as an enum rather than a raw
//! integer.
//!
//! Malformed rows are skipped with a warning rather than aborting the read; the
//! row indices of the surviving records still refer to positions in the source
//! table so that detections can be cross-referenced against the original file.

use chrono::{DateTime, Utc};
use log::warn;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

/// Barometric altitude as reported over ADS-B.
///
/// Transponders report the literal string `ground` while on the surface, so
/// the column cannot be typed as a plain integer. Anything that is neither an
/// integer nor the ground marker is a malformed record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Altitude {
    /// Barometric altitude in feet.
    Feet(i32),
    /// The aircraft is reporting on-ground status.
    Ground,
}

impl Altitude {
    /// Returns the altitude in feet, or `None` for the ground marker.
    pub fn feet(&self) -> Option<i32> {
        match self {
            Altitude::Feet(ft) => Some(*ft),
            Altitude::Ground => None,
        }
    }
}

impl<'de> Deserialize<'de> for Altitude {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let value = raw.trim();
        if value.eq_ignore_ascii_case("ground") {
            return Ok(Altitude::Ground);
        }
        value
            .parse::<i32>()
            .map(Altitude::Feet)
            .map_err(|_| de::Error::custom(format!("invalid altitude '{raw}'")))
    }
}

impl Serialize for Altitude {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Altitude::Feet(ft) => serializer.serialize_i32(*ft),
            Altitude::Ground => serializer.serialize_str("ground"),
        }
    }
}

/// Deserialize a `DateTime<Utc>` from fractional Unix-epoch seconds.
fn epoch_seconds<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    let millis = (seconds * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| de::Error::custom(format!("timestamp {seconds} out of range")))
}

/// A single row of an ADS-B position/integrity table.
///
/// Fields correspond to the columns of a readsb-style CSV dump, with `row`
/// assigned by the reader as the 0-based index of the row in the source table.
#[derive(Clone, Debug, Deserialize)]
pub struct AdsbRecord {
    /// ICAO 24-bit address of the aircraft as a hex string.
    pub hex: String,
    /// Barometric altitude in feet, or the on-ground marker.
    pub alt_baro: Altitude,
    /// Navigation integrity category. Low values indicate degraded or spoofed
    /// positioning.
    pub nic: f64,
    /// Report time, parsed from fractional Unix-epoch seconds.
    #[serde(deserialize_with = "epoch_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Reported latitude in degrees.
    pub lat: f64,
    /// Reported longitude in degrees.
    pub lon: f64,
    /// 0-based index of this row in the source table. Assigned by the reader,
    /// not read from the file.
    #[serde(skip)]
    pub row: usize,
}

impl AdsbRecord {
    /// Reads a CSV file and returns the parseable records in file order.
    ///
    /// Rows that fail to parse (unreadable altitude, missing fields) are
    /// logged and skipped; they never abort the read. The `row` index of each
    /// returned record refers to its position in the source table, counting
    /// skipped rows, so detections remain cross-referenceable against the
    /// original file.
    ///
    /// # Errors
    /// Returns an error only if the file itself cannot be opened or read.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, Box<dyn Error>> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for (row, result) in rdr.deserialize::<Self>().enumerate() {
            match result {
                Ok(mut record) => {
                    record.row = row;
                    records.push(record);
                }
                Err(e) => {
                    warn!("Skipping malformed record at row {row}: {e}");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).expect("Failed to create temp CSV");
        write!(file, "{body}").expect("Failed to write temp CSV");
        path
    }

    #[test]
    fn test_from_csv_parses_rows() {
        let path = write_temp_csv(
            "records_basic.csv",
            "hex,alt_baro,nic,timestamp,lat,lon\n\
             a1b2c3,35000,8,1700000000.25,44.5,-0.6\n\
             a1b2c3,ground,0,1700000010.0,44.5,-0.6\n",
        );
        let records = AdsbRecord::from_csv(&path).expect("Failed to read CSV");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hex, "a1b2c3");
        assert_eq!(records[0].alt_baro, Altitude::Feet(35000));
        assert_eq!(records[0].row, 0);
        assert_eq!(records[0].timestamp.timestamp_millis(), 1_700_000_000_250);
        assert_eq!(records[1].alt_baro, Altitude::Ground);
        assert_eq!(records[1].row, 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_from_csv_skips_malformed_rows() {
        let path = write_temp_csv(
            "records_malformed.csv",
            "hex,alt_baro,nic,timestamp,lat,lon\n\
             a1b2c3,35000,8,1700000000.0,44.5,-0.6\n\
             a1b2c3,not-a-number,8,1700000001.0,44.5,-0.6\n\
             a1b2c3,36000,7,1700000002.0,44.6,-0.7\n",
        );
        let records = AdsbRecord::from_csv(&path).expect("Failed to read CSV");
        assert_eq!(records.len(), 2);
        // Row indices still refer to the source table positions.
        assert_eq!(records[0].row, 0);
        assert_eq!(records[1].row, 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_from_csv_missing_file() {
        let result = AdsbRecord::from_csv("nonexistent.csv");
        assert!(result.is_err(), "Should error on missing file");
    }

    #[test]
    fn test_altitude_feet_accessor() {
        assert_eq!(Altitude::Feet(12000).feet(), Some(12000));
        assert_eq!(Altitude::Ground.feet(), None);
    }
}

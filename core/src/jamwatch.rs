//! GPS interference detection toolbox for ADS-B integrity data
//!
//! This crate detects the signature of GPS jamming and spoofing in time-ordered
//! ADS-B position reports: an abrupt transition in the reported navigation
//! integrity category (NIC) from consistently high to near zero, or back. Each
//! detected transition is located at a specific report and extended with a
//! geofenced "visibility circle" approximating the radio horizon from which an
//! interfering transmitter could plausibly be observed at the aircraft's
//! altitude.
//!
//! Detection is a streaming, keyed, stateful algorithm: every aircraft gets a
//! bounded buffer of its most recent integrity samples, validated for temporal
//! contiguity, and a full buffer is split into equal halves whose mean NIC
//! values are compared against a pair of thresholds. The engine consumes the
//! input strictly in arrival order and its memory use is bounded by the number
//! of distinct aircraft, not the input length.
//!
//! Primarily built off of three crate dependencies:
//! - [`csv`](https://crates.io/crates/csv): Provides ingestion of the ADS-B
//!   source tables.
//! - [`serde`](https://crates.io/crates/serde): Provides deserialization of
//!   input rows and serialization of detected events.
//! - [`chrono`](https://crates.io/crates/chrono): Provides the timestamp
//!   arithmetic behind the window contiguity checks.
//!
//! ## Crate overview
//!
//! This crate is organized into several modules:
//! - [records]: ADS-B input records and CSV ingestion.
//! - [window]: The per-aircraft sliding-window zero-crossing detector.
//! - [geofence]: Radio-horizon radius derivation and visibility-circle rings.
//! - [export]: JSON event export and KML overlay output.
//!
//! The `jamwatch` binary wires these together into a batch pipeline over one
//! or more CSV files, with run summaries and structured logging.

pub mod export;
pub mod geofence;
pub mod records;
pub mod window;

pub use geofence::GeofenceEvent;
pub use records::{AdsbRecord, Altitude};
pub use window::{CrossingKind, DetectorConfig, ZeroCrossingDetector, ZeroCrossingEvent};

use std::error::Error;

/// Runs every record through a fresh detector and returns the crossings in
/// detection order.
///
/// Records are processed strictly in slice order; per-aircraft window state is
/// kept inside the detector and discarded when this function returns. This is
/// the library entry point used by the `jamwatch` binary for each input file.
///
/// # Errors
/// Returns an error if the configuration is invalid (odd buffer size).
///
/// # Example
/// ```rust
/// use jamwatch::{AdsbRecord, DetectorConfig, detect_crossings};
///
/// let records: Vec<AdsbRecord> = Vec::new();
/// let crossings = detect_crossings(&records, DetectorConfig::default()).unwrap();
/// assert!(crossings.is_empty());
/// ```
pub fn detect_crossings(
    records: &[AdsbRecord],
    config: DetectorConfig,
) -> Result<Vec<ZeroCrossingEvent>, Box<dyn Error>> {
    let mut detector = ZeroCrossingDetector::new(config)?;
    Ok(records
        .iter()
        .filter_map(|record| detector.process(record))
        .collect())
}

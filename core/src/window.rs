//! Per-aircraft sliding-window zero-crossing detection.
//!
//! This module implements the core detection algorithm: each aircraft gets a
//! bounded, time-validated buffer of its most recent integrity samples. When a
//! buffer fills, the mean NIC of its first half is compared against the mean
//! of its second half. A transition from consistently-high to
//! consistently-low integrity (or the reverse) across the window midpoint is a
//! "zero crossing" and is interpreted as the onset or end of GPS jamming or
//! spoofing as experienced by that aircraft.
//!
//! Buffers are temporally contiguous: a sample arriving more than
//! `max_sample_delta_s` after the previous one flushes the buffer first, so a
//! crossing can never be assembled from samples on opposite sides of a
//! coverage gap. Samples that arrive out of time order flush the buffer the
//! same way, since the prior/later split is meaningless across them.
//!
//! Each buffered sample carries a full copy of the relevant record fields
//! rather than an index back into the source table, so resolving a detected
//! crossing cannot fail on a stale cross-reference.

use crate::records::{AdsbRecord, Altitude};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::error::Error;

/// Default number of samples held per aircraft. Must be even.
pub const DEFAULT_BUFFER_SIZE: usize = 12;
/// Default maximum allowed spacing between adjacent samples in a window (seconds).
pub const DEFAULT_MAX_SAMPLE_DELTA_S: f64 = 120.0;
/// Default minimum barometric altitude for a sample to be admitted (feet).
/// Low-altitude and ground integrity noise is not representative of en-route
/// jamming signatures.
pub const DEFAULT_MIN_ALT_FEET: i32 = 10_000;
/// Default NIC level below which integrity is considered lost.
pub const DEFAULT_THRESHOLD_LOW: f64 = 0.3;
/// Default NIC level at or above which integrity is considered good.
pub const DEFAULT_THRESHOLD_HIGH: f64 = 8.0;

/// Tunable parameters of the zero-crossing detector.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    /// Samples held per aircraft before a window is evaluated. Must be even
    /// and at least 2 so the window splits into equal halves.
    pub buffer_size: usize,
    /// Maximum spacing between adjacent samples in a live window (seconds).
    /// A larger gap flushes the buffer before the new sample is inserted.
    pub max_sample_delta_s: f64,
    /// Minimum barometric altitude (feet) for a sample to enter a buffer.
    pub min_alt_feet: i32,
    /// NIC mean below which a window half counts as "integrity lost".
    pub threshold_low: f64,
    /// NIC mean at or above which a window half counts as "integrity good".
    pub threshold_high: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_sample_delta_s: DEFAULT_MAX_SAMPLE_DELTA_S,
            min_alt_feet: DEFAULT_MIN_ALT_FEET,
            threshold_low: DEFAULT_THRESHOLD_LOW,
            threshold_high: DEFAULT_THRESHOLD_HIGH,
        }
    }
}

/// Direction of a detected integrity transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingKind {
    /// Integrity dropped from good to lost: jamming or spoofing onset.
    Loss,
    /// Integrity rose from lost to good: jamming or spoofing ended.
    Recovery,
}

/// A detected integrity transition, located at the midpoint of the window
/// that triggered it.
#[derive(Clone, Debug, Serialize)]
pub struct ZeroCrossingEvent {
    /// Hex code of the affected aircraft.
    pub hex: String,
    /// Whether integrity was lost or recovered.
    pub kind: CrossingKind,
    /// Barometric altitude (feet) of the representative sample.
    pub altitude_ft: i32,
    /// Row index of the representative sample in the source table.
    pub row: usize,
    /// Latitude of the representative sample (degrees).
    pub lat: f64,
    /// Longitude of the representative sample (degrees).
    pub lon: f64,
    /// The full ordered NIC sequence of the triggering window.
    pub nics: Vec<f64>,
}

/// One buffered integrity sample. Copies the record fields needed to build an
/// event so no lookup back into the source table is ever required.
#[derive(Clone, Debug)]
struct WindowSample {
    nic: f64,
    timestamp: DateTime<Utc>,
    altitude_ft: i32,
    row: usize,
    lat: f64,
    lon: f64,
}

/// Streaming zero-crossing detector over a multiplexed record sequence.
///
/// Owns one bounded sample buffer per aircraft hex code. Records are fed in
/// arrival order via [`process`](ZeroCrossingDetector::process); each call
/// returns at most one event. Buffers for aircraft that stop appearing are
/// retained for the lifetime of the detector; memory is bounded by the number
/// of distinct aircraft times the buffer size, not by input length.
pub struct ZeroCrossingDetector {
    config: DetectorConfig,
    flights: HashMap<String, VecDeque<WindowSample>>,
    admitted: u64,
    gap_flushes: u64,
    out_of_order: u64,
}

impl ZeroCrossingDetector {
    /// Creates a detector with the given configuration.
    ///
    /// # Errors
    /// Returns an error if `buffer_size` is odd or smaller than 2, since the
    /// window could not be split into equal halves.
    pub fn new(config: DetectorConfig) -> Result<Self, Box<dyn Error>> {
        if config.buffer_size < 2 || config.buffer_size % 2 != 0 {
            return Err(format!(
                "buffer_size must be an even number >= 2, got {}",
                config.buffer_size
            )
            .into());
        }
        Ok(ZeroCrossingDetector {
            config,
            flights: HashMap::new(),
            admitted: 0,
            gap_flushes: 0,
            out_of_order: 0,
        })
    }

    /// Feeds one record through the detector, returning a crossing event if
    /// this record completed a window that straddles an integrity transition.
    ///
    /// Records on the ground or below the minimum altitude are discarded
    /// without touching any buffer. After an emitted event the aircraft's
    /// buffer is empty, so the same physical transition is never reported
    /// twice as the window slides.
    pub fn process(&mut self, record: &AdsbRecord) -> Option<ZeroCrossingEvent> {
        let altitude_ft = match record.alt_baro {
            Altitude::Ground => return None,
            Altitude::Feet(ft) if ft < self.config.min_alt_feet => return None,
            Altitude::Feet(ft) => ft,
        };
        self.admitted += 1;

        let buffer = self
            .flights
            .entry(record.hex.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.config.buffer_size));

        // Temporal contiguity: adjacent samples in a live window must be in
        // order and strictly closer together than max_sample_delta_s.
        if let Some(last) = buffer.back() {
            let elapsed_s =
                (record.timestamp - last.timestamp).num_milliseconds() as f64 / 1000.0;
            if elapsed_s < 0.0 {
                self.out_of_order += 1;
                buffer.clear();
            } else if elapsed_s >= self.config.max_sample_delta_s {
                self.gap_flushes += 1;
                buffer.clear();
            }
        }

        // A full window that did not cross slides by one.
        if buffer.len() == self.config.buffer_size {
            buffer.pop_front();
        }
        buffer.push_back(WindowSample {
            nic: record.nic,
            timestamp: record.timestamp,
            altitude_ft,
            row: record.row,
            lat: record.lat,
            lon: record.lon,
        });

        if buffer.len() < self.config.buffer_size {
            return None;
        }

        let half = self.config.buffer_size / 2;
        let prior_mean = buffer.iter().take(half).map(|s| s.nic).sum::<f64>() / half as f64;
        let later_mean = buffer.iter().skip(half).map(|s| s.nic).sum::<f64>() / half as f64;

        let kind = if prior_mean < self.config.threshold_low
            && later_mean >= self.config.threshold_high
        {
            CrossingKind::Recovery
        } else if prior_mean >= self.config.threshold_high
            && later_mean < self.config.threshold_low
        {
            CrossingKind::Loss
        } else {
            return None;
        };

        let mid = &buffer[half];
        let event = ZeroCrossingEvent {
            hex: record.hex.clone(),
            kind,
            altitude_ft: mid.altitude_ft,
            row: mid.row,
            lat: mid.lat,
            lon: mid.lon,
            nics: buffer.iter().map(|s| s.nic).collect(),
        };
        buffer.clear();
        Some(event)
    }

    /// The detector configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Number of distinct aircraft with a window state.
    pub fn tracked_aircraft(&self) -> usize {
        self.flights.len()
    }

    /// Current buffer length for an aircraft, 0 if it has never been seen.
    pub fn buffer_len(&self, hex: &str) -> usize {
        self.flights.get(hex).map_or(0, VecDeque::len)
    }

    /// Number of records that passed the admission filter.
    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Number of buffer flushes caused by temporal gaps.
    pub fn gap_flushes(&self) -> u64 {
        self.gap_flushes
    }

    /// Number of buffer flushes caused by out-of-order timestamps. A non-zero
    /// value usually means the source table is not sorted by time.
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }
}

//! Radio-horizon geofence derivation.
//!
//! Given the altitude of a detected integrity transition, this module derives
//! the "visibility circle": the area on the ground from which an interfering
//! transmitter could plausibly have line of sight to the aircraft. The radius
//! is the distance to the radio horizon from height $h$ over a spherical
//! Earth of mean radius $R$:
//!
//! $$ d = \sqrt{2 R h + h^2} $$
//!
//! The circle is rendered as a closed polygon ring for overlay output.

use crate::window::ZeroCrossingEvent;
use serde::Serialize;

/// Earth's mean radius in meters.
pub const MEAN_RADIUS: f64 = 6_371_000.0;
/// Conversion factor from feet to meters.
pub const FEET_TO_METERS: f64 = 0.3048;
/// Number of vertices used to approximate a visibility circle.
pub const CIRCLE_VERTICES: usize = 36;
/// Rough conversion factor from meters to degrees of latitude via nautical
/// miles (1 degree ~ 60 nautical miles; 1 nautical mile ~ 1852 meters).
pub const METERS_TO_DEGREES: f64 = 1.0 / (60.0 * 1852.0);

/// Line-of-sight distance to the radio horizon, in meters, from an altitude
/// given in feet.
///
/// Monotonically increasing in altitude and 0 at altitude 0. Altitudes are
/// non-negative by construction: the detection engine only admits samples
/// above its minimum-altitude cutoff.
///
/// # Example
/// ```rust
/// use jamwatch::geofence::horizon_radius_m;
/// let radius = horizon_radius_m(10_000.0);
/// assert!((radius - 197_096.2).abs() < 0.5);
/// ```
pub fn horizon_radius_m(altitude_ft: f64) -> f64 {
    let h = altitude_ft * FEET_TO_METERS;
    (2.0 * MEAN_RADIUS * h + h * h).sqrt()
}

/// A zero-crossing event extended with its derived visibility circle, ready
/// for overlay rendering.
#[derive(Clone, Debug, Serialize)]
pub struct GeofenceEvent {
    /// The detected integrity transition.
    #[serde(flatten)]
    pub crossing: ZeroCrossingEvent,
    /// Radio-horizon radius derived from the event altitude (meters).
    pub radius_m: f64,
    /// Number of polygon vertices used to approximate the circle.
    pub vertices: usize,
}

impl GeofenceEvent {
    /// Derives the visibility circle for a detected crossing.
    pub fn from_crossing(crossing: ZeroCrossingEvent) -> Self {
        let radius_m = horizon_radius_m(crossing.altitude_ft as f64);
        GeofenceEvent {
            crossing,
            radius_m,
            vertices: CIRCLE_VERTICES,
        }
    }
}

/// Builds a closed ring of `(longitude, latitude)` pairs approximating a
/// circle of `radius_m` meters centered at the given position.
///
/// The first vertex is repeated at the end so the ring closes, giving
/// `vertices + 1` points. Longitude offsets are scaled by the inverse cosine
/// of the latitude to keep the circle roughly round away from the equator.
pub fn circle_ring(
    lat_deg: f64,
    lon_deg: f64,
    radius_m: f64,
    vertices: usize,
) -> Vec<(f64, f64)> {
    let lat_scale = radius_m * METERS_TO_DEGREES;
    let lon_scale = lat_scale / lat_deg.to_radians().cos();
    let mut ring = Vec::with_capacity(vertices + 1);
    for i in 0..=vertices {
        let theta = 2.0 * std::f64::consts::PI * i as f64 / vertices as f64;
        ring.push((
            lon_deg + lon_scale * theta.sin(),
            lat_deg + lat_scale * theta.cos(),
        ));
    }
    ring
}

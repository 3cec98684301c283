use crate::math::geo::GeoPoint;
use crate::prelude::{Band, Mode};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A classified, located and scored spot. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spot {
    /// Frequency exactly as it appeared on the feed line.
    pub raw_frequency: f64,
    pub frequency_khz: f64,
    pub band: Band,
    pub mode: Mode,
    pub callsign: String,
    pub comment: String,
    /// Country label, with the comment locator appended when one was used.
    pub country: String,
    pub position: Option<GeoPoint>,
    pub distance_km: f64,
    pub score: u8,
    pub wanted: bool,
    pub received_at: DateTime<Utc>,
    pub color: &'static str,
}

impl Spot {
    pub fn frequency_mhz(&self) -> f64 {
        self.frequency_khz / 1_000.0
    }

    pub fn is_active(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        now - self.received_at < lifetime
    }
}

use crate::interface::alert::Alert;
use crate::interface::spot::Spot;
use crate::prelude::SpotError;
use crate::processing::surge::SurgeEvent;
use log::{debug, info, warn};

/// Log lines for the ingestion path, under one target.
pub struct LogManager {
    target: &'static str,
}

impl LogManager {
    pub fn new() -> Self {
        Self { target: "spotcore" }
    }

    pub fn spot(&self, spot: &Spot) {
        debug!(
            target: self.target,
            "{} {:.1} kHz {} {} score={} from {}",
            spot.callsign,
            spot.frequency_khz,
            spot.band,
            spot.mode,
            spot.score,
            spot.country
        );
    }

    pub fn rejected(&self, line: &str, error: &SpotError) {
        debug!(target: self.target, "dropped line {:?}: {}", line.trim(), error);
    }

    pub fn surge(&self, event: &SurgeEvent) {
        if event.surging {
            info!(target: self.target, "opening on {} at {}", event.key, event.at);
        } else {
            info!(target: self.target, "{} back to normal at {}", event.key, event.at);
        }
    }

    pub fn alert(&self, alert: &Alert) {
        warn!(target: self.target, "{}", alert.message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

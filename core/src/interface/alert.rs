use crate::interface::spot::Spot;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const ALERT_SCORE: u8 = 70;
pub const ALERT_MIN_DISTANCE_KM: f64 = 1000.0;
pub const ALERT_TTL_SECS: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    Watchlist,
    RareDx,
}

/// Spoken/visual notification about one spot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub callsign: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Builds an alert for a watched call or a strong, distant spot.
pub fn alert_for(spot: &Spot, own_call: &str, watched: bool) -> Option<Alert> {
    if spot.callsign.eq_ignore_ascii_case(own_call) {
        return None;
    }

    let (kind, message) = if watched {
        (
            AlertKind::Watchlist,
            format!(
                "WATCHLIST {} on {:.3} MHz, {} {}, from {}",
                spot.callsign,
                spot.frequency_mhz(),
                spot.band,
                spot.mode,
                spot.country
            ),
        )
    } else if spot.score >= ALERT_SCORE && spot.distance_km > ALERT_MIN_DISTANCE_KM {
        (
            AlertKind::RareDx,
            format!(
                "RARE DX {} from {} on {} {}, {} km",
                spot.callsign,
                spot.country,
                spot.band,
                spot.mode,
                spot.distance_km.round() as i64
            ),
        )
    } else {
        return None;
    };

    Some(Alert {
        kind,
        callsign: spot.callsign.clone(),
        message,
        raised_at: spot.received_at,
    })
}

/// Holds the latest alert until it is read once or goes stale.
#[derive(Debug, Default)]
pub struct AlertSlot {
    latest: Option<Alert>,
}

impl AlertSlot {
    pub fn raise(&mut self, alert: Alert) {
        self.latest = Some(alert);
    }

    pub fn take(&mut self, now: DateTime<Utc>) -> Option<Alert> {
        let alert = self.latest.take()?;
        (now - alert.raised_at < Duration::seconds(ALERT_TTL_SECS)).then_some(alert)
    }
}

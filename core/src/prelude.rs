use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Amateur bands the watcher knows about. Anything outside is discarded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    #[serde(rename = "160m")]
    M160,
    #[serde(rename = "80m")]
    M80,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "40m")]
    M40,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "20m")]
    M20,
    #[serde(rename = "17m")]
    M17,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "12m")]
    M12,
    #[serde(rename = "10m")]
    M10,
    #[serde(rename = "6m")]
    M6,
    #[serde(rename = "4m")]
    M4,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "70cm")]
    Cm70,
    #[serde(rename = "23cm")]
    Cm23,
    #[serde(rename = "13cm")]
    Cm13,
    #[serde(rename = "QO-100")]
    Qo100,
}

/// Coarse partition used by leaderboards and live band counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FrequencyClass {
    Hf,
    Vhf,
}

impl Band {
    pub const ALL: [Band; 17] = [
        Band::M160,
        Band::M80,
        Band::M60,
        Band::M40,
        Band::M30,
        Band::M20,
        Band::M17,
        Band::M15,
        Band::M12,
        Band::M10,
        Band::M6,
        Band::M4,
        Band::M2,
        Band::Cm70,
        Band::Cm23,
        Band::Cm13,
        Band::Qo100,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Band::M160 => "160m",
            Band::M80 => "80m",
            Band::M60 => "60m",
            Band::M40 => "40m",
            Band::M30 => "30m",
            Band::M20 => "20m",
            Band::M17 => "17m",
            Band::M15 => "15m",
            Band::M12 => "12m",
            Band::M10 => "10m",
            Band::M6 => "6m",
            Band::M4 => "4m",
            Band::M2 => "2m",
            Band::Cm70 => "70cm",
            Band::Cm23 => "23cm",
            Band::Cm13 => "13cm",
            Band::Qo100 => "QO-100",
        }
    }

    /// 6m is grouped with HF, as on most cluster displays.
    pub fn class(self) -> FrequencyClass {
        match self {
            Band::M4 | Band::M2 | Band::Cm70 | Band::Cm23 | Band::Cm13 | Band::Qo100 => {
                FrequencyClass::Vhf
            }
            _ => FrequencyClass::Hf,
        }
    }

    /// Display color tag carried on every spot.
    pub fn color(self) -> &'static str {
        match self {
            Band::M160 => "#5c4b51",
            Band::M80 => "#8e44ad",
            Band::M60 => "#2c3e50",
            Band::M40 => "#2980b9",
            Band::M30 => "#16a085",
            Band::M20 => "#27ae60",
            Band::M17 => "#f1c40f",
            Band::M15 => "#e67e22",
            Band::M12 => "#d35400",
            Band::M10 => "#c0392b",
            Band::M6 => "#e84393",
            Band::M4 => "#ff9ff3",
            Band::M2 => "#f1c40f",
            Band::Cm70 => "#c0392b",
            Band::Cm23 => "#8e44ad",
            Band::Cm13 => "#bdc3c7",
            Band::Qo100 => "#00a8ff",
        }
    }

    pub fn from_label(label: &str) -> Option<Band> {
        Band::ALL
            .iter()
            .copied()
            .find(|band| band.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transmission mode assigned by the classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Cw,
    Ssb,
    Fm,
    Rtty,
    Psk,
    Sstv,
    Ft8,
    Ft4,
    Msk144,
    #[serde(rename = "DATA")]
    Digital,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Cw => "CW",
            Mode::Ssb => "SSB",
            Mode::Fm => "FM",
            Mode::Rtty => "RTTY",
            Mode::Psk => "PSK",
            Mode::Sstv => "SSTV",
            Mode::Ft8 => "FT8",
            Mode::Ft4 => "FT4",
            Mode::Msk144 => "MSK144",
            Mode::Digital => "DATA",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds for the opening detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeSettings {
    pub window_secs: i64,
    pub recent_secs: i64,
    pub enter_multiplier: f64,
    pub release_multiplier: f64,
    pub min_spots: usize,
    pub meteor_min_spots: usize,
}

impl Default for SurgeSettings {
    fn default() -> Self {
        Self {
            window_secs: 900,
            recent_secs: 60,
            enter_multiplier: 3.0,
            release_multiplier: 1.5,
            min_spots: 3,
            meteor_min_spots: 2,
        }
    }
}

/// Shared configuration for the ingestion pipeline and its stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Our own callsign; never raised as an alert.
    pub callsign: String,
    pub buffer_capacity: usize,
    pub spot_lifetime_secs: i64,
    pub history_bands: Vec<Band>,
    pub surge: SurgeSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            callsign: "N0CALL".to_string(),
            buffer_capacity: 6000,
            spot_lifetime_secs: 1800,
            history_bands: vec![Band::M12, Band::M10, Band::M6],
            surge: SurgeSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn spot_lifetime(&self) -> Duration {
        Duration::seconds(self.spot_lifetime_secs)
    }
}

/// Common error type for the spot core.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SpotError {
    #[error("malformed line: {0}")]
    Malformed(String),
    #[error("frequency {0} kHz is outside every known band")]
    UnknownBand(f64),
    #[error("invalid grid locator: {0}")]
    InvalidLocator(String),
    #[error("entity database: {0}")]
    Database(String),
    #[error("illegal connection transition: {0}")]
    Transition(String),
}

pub type SpotResult<T> = Result<T, SpotError>;

/// Time source for every windowed structure.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for replays and tests.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut current) = self.current.lock() {
            *current = at;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn band_labels_round_trip() {
        for band in Band::ALL {
            assert_eq!(Band::from_label(band.label()), Some(band));
        }
        assert_eq!(Band::from_label("qo-100"), Some(Band::Qo100));
        assert_eq!(Band::from_label("11m"), None);
    }

    #[test]
    fn six_meters_counts_as_hf() {
        assert_eq!(Band::M6.class(), FrequencyClass::Hf);
        assert_eq!(Band::M2.class(), FrequencyClass::Vhf);
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 8, 12, 10, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), start + Duration::seconds(90));
    }
}

use crate::processing::surge::active_shower;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static SOLAR_FLUX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)solar[- ]flux\s*:?\s*(\d+)").unwrap());
static A_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)a-index\s*:?\s*(\d+)").unwrap());
// Either "K-index : 2" or "K-index at 1200 UTC on 12 August was 3".
static K_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)k-index(?:\s*:\s*|\s+at\s+\d{4}\s+UTC\s+on\s+\d+\s+\w+\s+was\s+)(\d+)").unwrap()
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BulletinStatus {
    Pending,
    Ready,
    Unavailable(String),
}

/// Propagation indices from the periodic solar bulletin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bulletin {
    pub status: BulletinStatus,
    pub solar_flux: Option<u32>,
    pub a_index: Option<u32>,
    pub k_index: Option<u32>,
    pub meteor_shower: Option<&'static str>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Bulletin {
    fn default() -> Self {
        Self {
            status: BulletinStatus::Pending,
            solar_flux: None,
            a_index: None,
            k_index: None,
            meteor_shower: None,
            updated_at: None,
        }
    }
}

impl Bulletin {
    /// Pulls SFI, A and K out of a WWV-style text bulletin.
    pub fn from_wwv_text(text: &str, at: DateTime<Utc>) -> Self {
        let index = |pattern: &Regex| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        };
        Self {
            status: BulletinStatus::Ready,
            solar_flux: index(&SOLAR_FLUX),
            a_index: index(&A_INDEX),
            k_index: index(&K_INDEX),
            meteor_shower: active_shower(at).map(|shower| shower.name),
            updated_at: Some(at),
        }
    }

    /// Placeholder kept until the next scheduled refresh.
    pub fn unavailable(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: BulletinStatus::Unavailable(reason.into()),
            meteor_shower: active_shower(at).map(|shower| shower.name),
            updated_at: Some(at),
            ..Self::default()
        }
    }

    pub fn summary(&self) -> String {
        let show = |value: Option<u32>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
        format!(
            "SFI: {} | A: {} | K: {} | MS: {}",
            show(self.solar_flux),
            show(self.a_index),
            show(self.k_index),
            self.meteor_shower.unwrap_or("None")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const WWV: &str = "\
:Product: Geophysical Alert Message wwv.txt
:Issued: 2024 Aug 12 1205 UTC
Solar-terrestrial indices for 11 August follow.
Solar flux 219 and estimated planetary A-index 12.
The estimated planetary K-index at 1200 UTC on 12 August was 3.
";

    #[test]
    fn reads_indices_and_active_shower() {
        let at = Utc.with_ymd_and_hms(2024, 8, 12, 12, 5, 0).unwrap();
        let bulletin = Bulletin::from_wwv_text(WWV, at);
        assert_eq!(bulletin.status, BulletinStatus::Ready);
        assert_eq!(bulletin.solar_flux, Some(219));
        assert_eq!(bulletin.a_index, Some(12));
        assert_eq!(bulletin.k_index, Some(3));
        assert_eq!(bulletin.summary(), "SFI: 219 | A: 12 | K: 3 | MS: Perseids");
    }

    #[test]
    fn reads_colon_layout_and_tolerates_gaps() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let bulletin = Bulletin::from_wwv_text("Solar Flux : 150\nK-index : 2 at 0900 UT", at);
        assert_eq!(bulletin.solar_flux, Some(150));
        assert_eq!(bulletin.a_index, None);
        assert_eq!(bulletin.k_index, Some(2));
    }

    #[test]
    fn failure_leaves_a_placeholder() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let bulletin = Bulletin::unavailable("timeout", at);
        assert_eq!(
            bulletin.status,
            BulletinStatus::Unavailable("timeout".to_string())
        );
        assert_eq!(bulletin.summary(), "SFI: ? | A: ? | K: ? | MS: None");
    }
}

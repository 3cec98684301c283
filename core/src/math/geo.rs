use crate::prelude::{SpotError, SpotResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const EARTH_RADIUS_KM: f64 = 6371.0;

static LOCATOR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Ra-r]{2}[0-9]{2}(?:[A-Xa-x]{2})?)\b").unwrap());

/// FT8 sign-off that happens to have locator shape.
const LOCATOR_LOOKALIKES: &[&str] = &["RR73"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (phi1, phi2) = (a.lat.to_radians(), b.lat.to_radians());
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Validated 4- or 6-character Maidenhead locator, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLocator(String);

impl GridLocator {
    pub fn parse(text: &str) -> SpotResult<Self> {
        let upper = text.trim().to_ascii_uppercase();
        let bytes = upper.as_bytes();
        let valid = matches!(bytes.len(), 4 | 6)
            && bytes[..2].iter().all(|b| (b'A'..=b'R').contains(b))
            && bytes[2..4].iter().all(u8::is_ascii_digit)
            && bytes[4..].iter().all(|b| (b'A'..=b'X').contains(b));
        if valid {
            Ok(Self(upper))
        } else {
            Err(SpotError::InvalidLocator(text.trim().to_string()))
        }
    }

    /// First locator-shaped word in free text.
    pub fn find_in(text: &str) -> Option<Self> {
        LOCATOR_TOKEN
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|token| {
                !LOCATOR_LOOKALIKES
                    .iter()
                    .any(|fake| token.eq_ignore_ascii_case(fake))
            })
            .find_map(|token| Self::parse(token).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Center of the square, or of the sub-square when one is given.
    pub fn center(&self) -> GeoPoint {
        let b = self.0.as_bytes();
        let mut lon = -180.0 + f64::from(b[0] - b'A') * 20.0 + f64::from(b[2] - b'0') * 2.0;
        let mut lat = -90.0 + f64::from(b[1] - b'A') * 10.0 + f64::from(b[3] - b'0');

        if b.len() == 6 {
            lon += f64::from(b[4] - b'A') * (2.0 / 24.0) + 1.0 / 24.0;
            lat += f64::from(b[5] - b'A') * (1.0 / 24.0) + 1.0 / 48.0;
        } else {
            lon += 1.0;
            lat += 0.5;
        }

        GeoPoint::new(lat, lon)
    }
}

impl fmt::Display for GridLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

use crate::interface::spot::Spot;
use crate::prelude::{Band, FrequencyClass, Mode};
use crate::processing::rules::{self, Keyword};
use std::collections::{HashMap, HashSet};

pub const MAX_SCORE: i32 = 100;
/// Spots at or above this are flagged as wanted.
pub const WANTED_THRESHOLD: u8 = 50;

const BASE_SCORE: i32 = 10;
const RARE_BONUS: i32 = 50;
const CW_BONUS: i32 = 10;
const HF_BAND_BONUS: i32 = 5;
const VHF_BAND_BONUS: i32 = 15;
const SCARCE_HF_BONUS: i32 = 10;
const DISTANCE_THRESHOLD_KM: f64 = 3000.0;
const DISTANCE_FLOOR: f64 = 5.0;
const DISTANCE_SCALE: f64 = 8.0;
const DISTANCE_CAP: f64 = 20.0;
const WATCHLIST_BONUS: i32 = 40;
const SURGE_BONUS: i32 = 20;

/// Curated DXCC entities that are rarely on the air.
const RARE_PREFIXES: &[&str] = &[
    "3Y", "BS7", "CE0X", "CY9", "CY0", "FT5", "FT8", "HK0", "KH1", "KH3", "KH5", "KH7K", "KH9",
    "KP1", "KP5", "P5", "T3", "VP8", "VQ9", "ZK", "ZL9", "ZS8", "BV9", "EZ", "FR/G", "VK0", "TR8",
    "DP0", "TY", "HV", "1A", "4U1UN", "E4", "SV/A",
];

const SCARCE_HF_BANDS: &[Band] = &[Band::M160, Band::M12, Band::M10, Band::M6];

/// A comment containing any of these zeroes the score.
const OVERRIDE_KEYWORDS: &[Keyword] = &[Keyword::Word("PIRATE"), Keyword::Word("ILLEGAL")];

/// Additive comment rules; each row applies at most once.
const KEYWORD_RULES: &[(&[Keyword], i32)] = &[
    (&[Keyword::Stem("UP"), Keyword::Word("SPLIT")], 15),
    (&[Keyword::Word("DX")], 5),
    (&[Keyword::Word("QRZ")], -5),
];

/// Everything the score depends on.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub callsign: &'a str,
    pub band: Band,
    pub mode: Mode,
    pub comment: &'a str,
    pub distance_km: f64,
    pub watched: bool,
    pub surging: &'a HashSet<Band>,
}

pub fn score(input: &ScoreInput<'_>) -> u8 {
    let tokens = rules::tokens(input.comment);
    if rules::contains_any(&tokens, OVERRIDE_KEYWORDS) {
        return 0;
    }

    let mut total = BASE_SCORE;
    if is_rare(input.callsign) {
        total += RARE_BONUS;
    }
    total += KEYWORD_RULES
        .iter()
        .filter(|(keywords, _)| rules::contains_any(&tokens, keywords))
        .map(|(_, delta)| delta)
        .sum::<i32>();
    if input.mode == Mode::Cw {
        total += CW_BONUS;
    }
    total += band_bonus(input.band);
    total += distance_bonus(input.distance_km);
    if input.watched {
        total += WATCHLIST_BONUS;
    }
    if input.surging.contains(&input.band) {
        total += SURGE_BONUS;
    }

    total.clamp(0, MAX_SCORE) as u8
}

pub fn is_wanted(score: u8) -> bool {
    score >= WANTED_THRESHOLD
}

/// Longest rare prefix the call starts with, if any.
pub fn rare_prefix(callsign: &str) -> Option<&'static str> {
    let call = callsign.to_ascii_uppercase();
    RARE_PREFIXES
        .iter()
        .copied()
        .filter(|prefix| call.starts_with(prefix))
        .max_by_key(|prefix| prefix.len())
}

fn is_rare(callsign: &str) -> bool {
    rare_prefix(callsign).is_some()
}

fn band_bonus(band: Band) -> i32 {
    match band.class() {
        FrequencyClass::Vhf => VHF_BAND_BONUS,
        FrequencyClass::Hf if SCARCE_HF_BANDS.contains(&band) => HF_BAND_BONUS + SCARCE_HF_BONUS,
        FrequencyClass::Hf => HF_BAND_BONUS,
    }
}

fn distance_bonus(distance_km: f64) -> i32 {
    if !(distance_km > DISTANCE_THRESHOLD_KM) {
        return 0;
    }
    let bonus = DISTANCE_FLOOR + DISTANCE_SCALE * (distance_km / DISTANCE_THRESHOLD_KM).ln();
    bonus.min(DISTANCE_CAP) as i32
}

/// Leaderboard inclusion rules.
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardFilter {
    pub class: Option<FrequencyClass>,
    /// Spots this close or closer are left out.
    pub min_distance_km: f64,
}

impl Default for LeaderboardFilter {
    fn default() -> Self {
        Self {
            class: None,
            min_distance_km: 100.0,
        }
    }
}

/// Top `limit` spots, one per callsign (its best score), best first;
/// ties go to the most recent spot.
pub fn rank_top(spots: &[Spot], limit: usize, filter: &LeaderboardFilter) -> Vec<Spot> {
    let mut best: HashMap<&str, &Spot> = HashMap::new();
    for spot in spots.iter().filter(|spot| {
        spot.distance_km > filter.min_distance_km
            && filter.class.map_or(true, |class| spot.band.class() == class)
    }) {
        best.entry(spot.callsign.as_str())
            .and_modify(|kept| {
                if (spot.score, spot.received_at) > (kept.score, kept.received_at) {
                    *kept = spot;
                }
            })
            .or_insert(spot);
    }

    let mut ranked: Vec<&Spot> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.received_at.cmp(&a.received_at))
            .then_with(|| a.callsign.cmp(&b.callsign))
    });
    ranked.into_iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::spot::tests::sample_spot;

    fn input<'a>(surging: &'a HashSet<Band>) -> ScoreInput<'a> {
        ScoreInput {
            callsign: "DL1ABC",
            band: Band::M20,
            mode: Mode::Ssb,
            comment: "",
            distance_km: 0.0,
            watched: false,
            surging,
        }
    }

    #[test]
    fn plain_spot_gets_base_and_band_bonus() {
        let none = HashSet::new();
        assert_eq!(score(&input(&none)), (BASE_SCORE + HF_BAND_BONUS) as u8);
    }

    #[test]
    fn rare_bonus_applies_once_and_repeatably() {
        let none = HashSet::new();
        let rare = ScoreInput {
            callsign: "VP8PJ",
            comment: "QRZ?",
            ..input(&none)
        };
        let first = score(&rare);
        assert_eq!(first, score(&rare));
        assert!(i32::from(first) >= BASE_SCORE + RARE_BONUS - 5);
        assert_eq!(rare_prefix("KH7KXX"), Some("KH7K"));
        assert_eq!(rare_prefix("DL1ABC"), None);
    }

    #[test]
    fn keyword_rows_apply_once_each() {
        let none = HashSet::new();
        let plain = score(&input(&none));
        let split = ScoreInput {
            comment: "UP 5 split dx",
            ..input(&none)
        };
        assert_eq!(score(&split), plain + 15 + 5);
    }

    #[test]
    fn pirate_forces_zero() {
        let surging: HashSet<Band> = [Band::M20].into_iter().collect();
        let loaded = ScoreInput {
            callsign: "3Y0J",
            comment: "pirate! UP 2",
            watched: true,
            distance_km: 15_000.0,
            ..input(&surging)
        };
        assert_eq!(score(&loaded), 0);
    }

    #[test]
    fn distance_bonus_is_monotonic_and_capped() {
        let none = HashSet::new();
        let mut previous = 0;
        for km in (3_000..=20_000).step_by(250) {
            let current = score(&ScoreInput {
                distance_km: f64::from(km),
                ..input(&none)
            });
            assert!(current >= previous, "{km}");
            previous = current;
        }
        assert_eq!(distance_bonus(2_999.0), 0);
        assert_eq!(distance_bonus(40_000.0), DISTANCE_CAP as i32);
        assert_eq!(distance_bonus(f64::NAN), 0);
    }

    #[test]
    fn never_exceeds_one_hundred() {
        let surging: HashSet<Band> = [Band::M6].into_iter().collect();
        let everything = ScoreInput {
            callsign: "3Y0J",
            band: Band::M6,
            mode: Mode::Cw,
            comment: "UP DX",
            distance_km: 19_000.0,
            watched: true,
            surging: &surging,
        };
        assert_eq!(score(&everything), 100);
        assert!(is_wanted(score(&everything)));
    }

    #[test]
    fn vhf_bands_outscore_plain_hf() {
        let none = HashSet::new();
        let hf = score(&input(&none));
        let vhf = score(&ScoreInput {
            band: Band::M2,
            ..input(&none)
        });
        let scarce = score(&ScoreInput {
            band: Band::M12,
            ..input(&none)
        });
        assert!(vhf > hf);
        assert!(scarce > hf);
    }

    #[test]
    fn leaderboard_keeps_best_per_call_and_filters() {
        let spots = vec![
            sample_spot("VP8PJ", Band::M20, 60, 9_000.0, 0),
            sample_spot("VP8PJ", Band::M20, 80, 9_000.0, 10),
            sample_spot("DL1ABC", Band::M20, 90, 50.0, 20),
            sample_spot("JA1XYZ", Band::M2, 70, 9_000.0, 30),
            sample_spot("K1ABC", Band::M10, 40, 6_000.0, 40),
        ];

        let top = rank_top(&spots, 10, &LeaderboardFilter::default());
        let calls: Vec<_> = top.iter().map(|s| (s.callsign.as_str(), s.score)).collect();
        assert_eq!(calls, vec![("VP8PJ", 80), ("JA1XYZ", 70), ("K1ABC", 40)]);

        let hf_only = LeaderboardFilter {
            class: Some(FrequencyClass::Hf),
            ..Default::default()
        };
        assert_eq!(rank_top(&spots, 1, &hf_only)[0].callsign, "VP8PJ");
    }
}

use crate::generator::template::cluster_line;
use anyhow::bail;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const SPOTTERS: &[&str] = &["EA5XYZ", "G4ABC", "W3LPL", "JA1RL", "OH2BH", "DL8XX"];

const CALLS: &[&str] = &[
    "DL1ABC", "F5NQL", "K1TTT", "JA1XYZ", "VK2DX", "PY2AA", "ZS6AB", "VP8PJ", "3Y0J", "FT5XO",
    "KH1/KH7Z", "G3SXW/P", "EA8/DL1ABC", "UA9XYZ", "LU1AA",
];

/// Frequency in kHz and the comment a spotter would attach.
const CHANNELS: &[(f64, &str)] = &[
    (1_822.0, "CW"),
    (3_573.0, "FT8"),
    (7_010.0, "CW UP 1"),
    (7_074.0, "FT8"),
    (10_136.0, "FT8 -15dB"),
    (14_025.0, "CW QRZ?"),
    (14_074.0, "FT8 JN23"),
    (14_195.0, "SSB SPLIT"),
    (18_100.0, "FT8"),
    (21_074.0, "FT8"),
    (24_915.0, "FT8 DX"),
    (28_074.0, "FT8"),
    (28_495.0, "SSB"),
    (144_300.0, "SSB JO21"),
    (432_200.0, "SSB"),
];

const BURST_CHANNELS: &[(f64, &str)] = &[
    (50_313.0, "FT8 ES"),
    (50_090.0, "CW ES"),
    (50_150.0, "SSB ES"),
];

const NOISE: &[&str] = &[
    "WWV de W0MU <18Z> :   SFI=150, A=12, K=2, No Storms -> No Storms",
    "To ALL de K1TTT: contest this weekend",
    "login: ",
    "DX de N0CALL: 99999.0 DL1ABC nowhere",
];

/// Configuration for generating synthetic cluster traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub count: usize,
    pub seed: u64,
    /// Mean gap between lines outside the opening.
    pub spacing_secs: i64,
    /// Share of lines that are not spots.
    pub noise: f64,
    /// Squeeze the middle third into a 6m sporadic-E burst.
    pub opening: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: 500,
            seed: 0,
            spacing_secs: 20,
            noise: 0.05,
            opening: true,
        }
    }
}

/// One generated feed line and the gap before it arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticLine {
    pub delay: Duration,
    pub text: String,
}

pub fn build_feed(config: &GeneratorConfig, start: DateTime<Utc>) -> anyhow::Result<Vec<SyntheticLine>> {
    if !(0.0..=1.0).contains(&config.noise) {
        bail!("noise share {} is outside 0..=1", config.noise);
    }
    let spacing = config.spacing_secs.max(1);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut lines = Vec::with_capacity(config.count);
    let mut at = start;
    let burst = (config.count / 3)..(2 * config.count / 3);

    for index in 0..config.count {
        let in_burst = config.opening && burst.contains(&index);
        let gap = if in_burst {
            rng.gen_range(1..=spacing.min(5))
        } else {
            rng.gen_range(1..=2 * spacing)
        };
        let delay = Duration::seconds(gap);
        at += delay;

        let text = if rng.gen_bool(config.noise) {
            NOISE[rng.gen_range(0..NOISE.len())].to_string()
        } else {
            let table = if in_burst { BURST_CHANNELS } else { CHANNELS };
            let (frequency, comment) = table[rng.gen_range(0..table.len())];
            let spotter = SPOTTERS[rng.gen_range(0..SPOTTERS.len())];
            let callsign = CALLS[rng.gen_range(0..CALLS.len())];
            cluster_line(spotter, frequency, callsign, comment, at)
        };
        lines.push(SyntheticLine { delay, text });
    }

    Ok(lines)
}

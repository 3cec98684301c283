use crate::prelude::{Band, Mode, SpotError, SpotResult};
use crate::processing::rules::{self, Keyword};
use serde::Serialize;

/// Raw values below this are MHz.
const MHZ_CEILING: f64 = 1_000.0;
/// Raw values at or above this are Hz.
const HZ_FLOOR: f64 = 1.0e8;
/// Half-width of the window around a digital calling frequency, kHz.
const DIGITAL_TOLERANCE_KHZ: f64 = 1.0;

/// Inclusive-exclusive band edges in kHz, lowest first.
const BAND_TABLE: &[(f64, f64, Band)] = &[
    (1_800.0, 2_000.0, Band::M160),
    (3_500.0, 4_000.0, Band::M80),
    (5_000.0, 5_450.0, Band::M60),
    (7_000.0, 7_300.0, Band::M40),
    (10_100.0, 10_150.0, Band::M30),
    (14_000.0, 14_350.0, Band::M20),
    (18_068.0, 18_168.0, Band::M17),
    (21_000.0, 21_450.0, Band::M15),
    (24_890.0, 24_990.0, Band::M12),
    (28_000.0, 29_700.0, Band::M10),
    (50_000.0, 54_000.0, Band::M6),
    (70_000.0, 70_500.0, Band::M4),
    (144_000.0, 148_000.0, Band::M2),
    (430_000.0, 440_000.0, Band::Cm70),
    (1_240_000.0, 1_300_000.0, Band::Cm23),
    (2_300_000.0, 2_450_000.0, Band::Cm13),
    (10_489_000.0, 10_490_000.0, Band::Qo100),
];

/// Digital calling frequencies, kHz. They sit inside CW and voice
/// segments, so they are checked before anything else.
const DIGITAL_CENTERS: &[(f64, Mode)] = &[
    (1_840.0, Mode::Ft8),
    (3_573.0, Mode::Ft8),
    (3_575.0, Mode::Ft4),
    (5_357.0, Mode::Ft8),
    (7_047.5, Mode::Ft4),
    (7_074.0, Mode::Ft8),
    (10_136.0, Mode::Ft8),
    (10_140.0, Mode::Ft4),
    (14_074.0, Mode::Ft8),
    (14_080.0, Mode::Ft4),
    (18_100.0, Mode::Ft8),
    (18_104.0, Mode::Ft4),
    (21_074.0, Mode::Ft8),
    (21_140.0, Mode::Ft4),
    (24_915.0, Mode::Ft8),
    (24_919.0, Mode::Ft4),
    (28_074.0, Mode::Ft8),
    (28_180.0, Mode::Ft4),
    (50_260.0, Mode::Msk144),
    (50_313.0, Mode::Ft8),
    (50_318.0, Mode::Ft4),
    (70_154.0, Mode::Ft8),
    (144_170.0, Mode::Ft4),
    (144_174.0, Mode::Ft8),
    (144_360.0, Mode::Msk144),
];

/// Comment keywords, first row wins.
const MODE_KEYWORDS: &[(&[Keyword], Mode)] = &[
    (&[Keyword::Word("CW")], Mode::Cw),
    (
        &[Keyword::Word("SSB"), Keyword::Word("USB"), Keyword::Word("LSB")],
        Mode::Ssb,
    ),
    (&[Keyword::Word("RTTY")], Mode::Rtty),
    (&[Keyword::Word("FM")], Mode::Fm),
    (&[Keyword::Stem("PSK"), Keyword::Stem("BPSK")], Mode::Psk),
    (&[Keyword::Word("SSTV")], Mode::Sstv),
    (&[Keyword::Word("FT8")], Mode::Ft8),
    (&[Keyword::Word("FT4")], Mode::Ft4),
    (&[Keyword::Word("MSK144"), Keyword::Word("MSK")], Mode::Msk144),
];

/// Band-plan slices, kHz. Whatever is left over is voice.
const SUB_RANGES: &[(Band, f64, f64, Mode)] = &[
    (Band::M160, 1_800.0, 1_838.0, Mode::Cw),
    (Band::M160, 1_838.0, 1_843.0, Mode::Digital),
    (Band::M80, 3_500.0, 3_570.0, Mode::Cw),
    (Band::M80, 3_570.0, 3_600.0, Mode::Digital),
    (Band::M60, 5_351.5, 5_354.0, Mode::Cw),
    (Band::M40, 7_000.0, 7_040.0, Mode::Cw),
    (Band::M40, 7_040.0, 7_060.0, Mode::Digital),
    (Band::M30, 10_100.0, 10_140.0, Mode::Cw),
    (Band::M30, 10_140.0, 10_150.0, Mode::Digital),
    (Band::M20, 14_000.0, 14_070.0, Mode::Cw),
    (Band::M20, 14_070.0, 14_100.0, Mode::Digital),
    (Band::M17, 18_068.0, 18_095.0, Mode::Cw),
    (Band::M17, 18_095.0, 18_111.0, Mode::Digital),
    (Band::M15, 21_000.0, 21_070.0, Mode::Cw),
    (Band::M15, 21_070.0, 21_150.0, Mode::Digital),
    (Band::M12, 24_890.0, 24_915.0, Mode::Cw),
    (Band::M12, 24_915.0, 24_931.0, Mode::Digital),
    (Band::M10, 28_000.0, 28_070.0, Mode::Cw),
    (Band::M10, 28_070.0, 28_190.0, Mode::Digital),
    (Band::M6, 50_000.0, 50_100.0, Mode::Cw),
    (Band::M6, 50_300.0, 50_400.0, Mode::Digital),
    (Band::M2, 144_000.0, 144_110.0, Mode::Cw),
    (Band::M2, 145_000.0, 146_000.0, Mode::Fm),
    (Band::Cm70, 432_000.0, 432_100.0, Mode::Cw),
    (Band::Cm70, 433_000.0, 434_600.0, Mode::Fm),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub frequency_khz: f64,
    pub band: Band,
    pub mode: Mode,
}

/// Brings a raw feed frequency to kHz.
pub fn normalize_khz(raw: f64) -> f64 {
    if raw < MHZ_CEILING {
        raw * 1_000.0
    } else if raw >= HZ_FLOOR {
        raw / 1_000.0
    } else {
        raw
    }
}

/// Normalizes `raw` once, then resolves band and mode.
pub fn classify(raw: f64, comment: &str) -> SpotResult<Classification> {
    let frequency_khz = normalize_khz(raw);
    let band = band_for(frequency_khz).ok_or(SpotError::UnknownBand(frequency_khz))?;
    let mode = mode_for(band, frequency_khz, comment);
    Ok(Classification {
        frequency_khz,
        band,
        mode,
    })
}

pub fn band_for(khz: f64) -> Option<Band> {
    BAND_TABLE
        .iter()
        .find(|(low, high, _)| (*low..*high).contains(&khz))
        .map(|(_, _, band)| *band)
}

fn mode_for(band: Band, khz: f64, comment: &str) -> Mode {
    if let Some((_, mode)) = DIGITAL_CENTERS
        .iter()
        .find(|(center, _)| (khz - center).abs() <= DIGITAL_TOLERANCE_KHZ)
    {
        return *mode;
    }

    let tokens = rules::tokens(comment);
    if let Some((_, mode)) = MODE_KEYWORDS
        .iter()
        .find(|(keywords, _)| rules::contains_any(&tokens, keywords))
    {
        return *mode;
    }

    SUB_RANGES
        .iter()
        .find(|(row_band, low, high, _)| *row_band == band && (*low..*high).contains(&khz))
        .map(|(_, _, _, mode)| *mode)
        .unwrap_or(Mode::Ssb)
}

use crate::math::stats::StatsHelper;
use crate::prelude::{Band, Mode, SurgeSettings};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Yearly meteor shower calendar as (month, day) pairs. A start later
/// than the end wraps over the new year.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MeteorShower {
    pub name: &'static str,
    pub start: (u32, u32),
    pub end: (u32, u32),
    pub peak: (u32, u32),
}

pub const METEOR_SHOWERS: &[MeteorShower] = &[
    MeteorShower { name: "Quadrantids", start: (12, 28), end: (1, 12), peak: (1, 4) },
    MeteorShower { name: "Lyrids", start: (4, 14), end: (4, 30), peak: (4, 22) },
    MeteorShower { name: "Eta Aquariids", start: (4, 19), end: (5, 28), peak: (5, 6) },
    MeteorShower { name: "Perseids", start: (7, 17), end: (8, 24), peak: (8, 12) },
    MeteorShower { name: "Orionids", start: (10, 2), end: (11, 7), peak: (10, 21) },
    MeteorShower { name: "Leonids", start: (11, 6), end: (11, 30), peak: (11, 17) },
    MeteorShower { name: "Geminids", start: (12, 4), end: (12, 20), peak: (12, 14) },
];

impl MeteorShower {
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        let today = (at.month(), at.day());
        if self.start <= self.end {
            self.start <= today && today <= self.end
        } else {
            today >= self.start || today <= self.end
        }
    }
}

/// First shower in the calendar whose period covers `at`.
pub fn active_shower(at: DateTime<Utc>) -> Option<&'static MeteorShower> {
    METEOR_SHOWERS.iter().find(|shower| shower.is_active(at))
}

/// What a surge latch is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SurgeKey {
    Band(Band),
    Shower(&'static str),
}

impl fmt::Display for SurgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurgeKey::Band(band) => write!(f, "{band}"),
            SurgeKey::Shower(name) => write!(f, "MS {name}"),
        }
    }
}

/// One latch transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurgeEvent {
    pub key: SurgeKey,
    pub surging: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct SurgeWindow {
    stamps: VecDeque<DateTime<Utc>>,
    surging: bool,
}

impl SurgeWindow {
    /// Evicts stale stamps, re-tests the latch and reports a flip.
    fn assess(
        &mut self,
        now: DateTime<Utc>,
        settings: &SurgeSettings,
        floor: usize,
        open: bool,
    ) -> Option<bool> {
        let window = Duration::seconds(settings.window_secs);
        let recent_span = Duration::seconds(settings.recent_secs);
        while self.stamps.front().is_some_and(|stamp| now - *stamp > window) {
            self.stamps.pop_front();
        }

        let recent = self
            .stamps
            .iter()
            .filter(|stamp| now - **stamp <= recent_span)
            .count();
        let average = StatsHelper::rate_per_minute(self.stamps.len(), window);
        let multiplier = if self.surging {
            settings.release_multiplier
        } else {
            settings.enter_multiplier
        };
        let next = open && recent >= floor && recent as f64 > average * multiplier;

        if next == self.surging {
            return None;
        }
        self.surging = next;
        Some(next)
    }
}

/// Per-band and per-shower opening detector with latched state.
#[derive(Debug)]
pub struct SurgeDetector {
    settings: SurgeSettings,
    bands: HashMap<Band, SurgeWindow>,
    showers: HashMap<&'static str, SurgeWindow>,
}

impl SurgeDetector {
    pub fn new(settings: SurgeSettings) -> Self {
        Self {
            settings,
            bands: HashMap::new(),
            showers: HashMap::new(),
        }
    }

    /// Adds a spot to its band window, and to the active shower window when
    /// it is meteor scatter, then re-tests those latches.
    pub fn record(&mut self, band: Band, mode: Mode, at: DateTime<Utc>) -> Vec<SurgeEvent> {
        let mut events = Vec::new();

        let window = self.bands.entry(band).or_default();
        window.stamps.push_back(at);
        if let Some(surging) = window.assess(at, &self.settings, self.settings.min_spots, true) {
            events.push(SurgeEvent {
                key: SurgeKey::Band(band),
                surging,
                at,
            });
        }

        if mode == Mode::Msk144 {
            if let Some(shower) = active_shower(at) {
                let window = self.showers.entry(shower.name).or_default();
                window.stamps.push_back(at);
                let floor = self.settings.meteor_min_spots;
                if let Some(surging) = window.assess(at, &self.settings, floor, true) {
                    events.push(SurgeEvent {
                        key: SurgeKey::Shower(shower.name),
                        surging,
                        at,
                    });
                }
            }
        }

        events
    }

    /// Re-tests every latch at `now`; shower latches close once their
    /// period is over.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<SurgeEvent> {
        let settings = &self.settings;
        let mut events = Vec::new();

        for (band, window) in self.bands.iter_mut() {
            if let Some(surging) = window.assess(now, settings, settings.min_spots, true) {
                events.push(SurgeEvent {
                    key: SurgeKey::Band(*band),
                    surging,
                    at: now,
                });
            }
        }

        let current = active_shower(now).map(|shower| shower.name);
        for (name, window) in self.showers.iter_mut() {
            let open = current == Some(*name);
            if let Some(surging) = window.assess(now, settings, settings.meteor_min_spots, open) {
                events.push(SurgeEvent {
                    key: SurgeKey::Shower(*name),
                    surging,
                    at: now,
                });
            }
        }

        events
    }

    pub fn is_surging(&self, key: SurgeKey) -> bool {
        match key {
            SurgeKey::Band(band) => self.bands.get(&band).is_some_and(|w| w.surging),
            SurgeKey::Shower(name) => self.showers.get(name).is_some_and(|w| w.surging),
        }
    }

    /// Surging bands in band order, then surging showers by name.
    pub fn surging(&self) -> Vec<SurgeKey> {
        let mut bands: Vec<Band> = self.surging_bands().into_iter().collect();
        bands.sort_unstable();
        let mut showers: Vec<&'static str> = self
            .showers
            .iter()
            .filter(|(_, window)| window.surging)
            .map(|(name, _)| *name)
            .collect();
        showers.sort_unstable();

        bands
            .into_iter()
            .map(SurgeKey::Band)
            .chain(showers.into_iter().map(SurgeKey::Shower))
            .collect()
    }

    pub fn surging_bands(&self) -> HashSet<Band> {
        self.bands
            .iter()
            .filter(|(_, window)| window.surging)
            .map(|(band, _)| *band)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn latch_enters_at_crossing_and_holds_through_burst() {
        let mut detector = SurgeDetector::new(SurgeSettings::default());
        let t0 = start();
        let mut events = Vec::new();

        for background in [0, 5] {
            events.extend(detector.record(Band::M10, Mode::Ssb, t0 + Duration::minutes(background)));
        }
        assert!(events.is_empty());

        let burst_start = t0 + Duration::minutes(10);
        for k in 0..=40 {
            let at = burst_start + Duration::seconds(10 * k);
            let flips = detector.record(Band::M10, Mode::Ssb, at);
            if k == 2 {
                assert_eq!(
                    flips,
                    vec![SurgeEvent { key: SurgeKey::Band(Band::M10), surging: true, at }]
                );
            } else {
                assert!(flips.is_empty(), "unexpected flip at burst spot {k}");
            }
            assert_eq!(detector.is_surging(SurgeKey::Band(Band::M10)), k >= 2);
        }

        let burst_end = burst_start + Duration::seconds(400);
        let mut ended = Vec::new();
        for step in 1..=12 {
            ended.extend(detector.evaluate(burst_end + Duration::seconds(10 * step)));
        }
        assert_eq!(ended.len(), 1);
        assert!(!ended[0].surging);
        assert!(!detector.is_surging(SurgeKey::Band(Band::M10)));
        assert!(detector.surging().is_empty());
    }

    #[test]
    fn floor_blocks_surges_from_an_idle_band() {
        let mut detector = SurgeDetector::new(SurgeSettings::default());
        let t0 = start();
        assert!(detector.record(Band::M6, Mode::Cw, t0).is_empty());
        assert!(detector
            .record(Band::M6, Mode::Cw, t0 + Duration::seconds(5))
            .is_empty());
        assert!(detector.surging_bands().is_empty());
    }

    #[test]
    fn stale_entries_are_evicted() {
        let mut detector = SurgeDetector::new(SurgeSettings::default());
        let t0 = start();
        for k in 0..3 {
            detector.record(Band::M6, Mode::Cw, t0 + Duration::seconds(k));
        }
        assert!(detector.is_surging(SurgeKey::Band(Band::M6)));
        let later = detector.evaluate(t0 + Duration::minutes(20));
        assert_eq!(later.len(), 1);
        assert!(detector.bands[&Band::M6].stamps.is_empty());
    }

    #[test]
    fn meteor_scatter_latch_is_keyed_by_shower() {
        let mut detector = SurgeDetector::new(SurgeSettings::default());
        let perseids = Utc.with_ymd_and_hms(2024, 8, 12, 3, 0, 0).unwrap();
        detector.record(Band::M2, Mode::Msk144, perseids);
        let events = detector.record(Band::M2, Mode::Msk144, perseids + Duration::seconds(20));
        assert_eq!(
            events,
            vec![SurgeEvent {
                key: SurgeKey::Shower("Perseids"),
                surging: true,
                at: perseids + Duration::seconds(20),
            }]
        );
        assert!(!detector.is_surging(SurgeKey::Band(Band::M2)));
        assert_eq!(detector.surging(), vec![SurgeKey::Shower("Perseids")]);

        let after = detector.evaluate(Utc.with_ymd_and_hms(2024, 8, 25, 0, 0, 0).unwrap());
        assert_eq!(after.len(), 1);
        assert!(detector.surging().is_empty());
    }

    #[test]
    fn meteor_spots_outside_showers_only_feed_the_band() {
        let mut detector = SurgeDetector::new(SurgeSettings::default());
        let t0 = start();
        detector.record(Band::M2, Mode::Msk144, t0);
        detector.record(Band::M2, Mode::Msk144, t0 + Duration::seconds(1));
        assert!(detector.showers.is_empty());
    }

    #[test]
    fn calendar_wraps_over_new_year() {
        let at = |m, d| Utc.with_ymd_and_hms(2025, m, d, 0, 0, 0).unwrap();
        assert_eq!(active_shower(at(12, 30)).unwrap().name, "Quadrantids");
        assert_eq!(active_shower(at(1, 5)).unwrap().name, "Quadrantids");
        assert_eq!(active_shower(at(12, 14)).unwrap().name, "Geminids");
        assert!(active_shower(at(1, 20)).is_none());
        assert!(active_shower(at(12, 1)).is_none());
    }
}

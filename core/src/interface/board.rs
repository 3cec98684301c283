use crate::interface::alert::{Alert, AlertSlot};
use crate::interface::bulletin::Bulletin;
use crate::interface::spot::Spot;
use crate::math::geo::{GeoPoint, GridLocator};
use crate::prelude::{Band, Clock, FrequencyClass, PipelineConfig, SpotResult};
use crate::processing::histogram::{ActivityHistogram, HourCount};
use crate::processing::scorer::{rank_top, LeaderboardFilter};
use crate::processing::spot_buffer::{SpotBuffer, SpotFilter};
use crate::processing::surge::{SurgeDetector, SurgeEvent, SurgeKey};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The observer's station position used for every distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observer {
    pub locator: GridLocator,
    pub position: GeoPoint,
}

impl Observer {
    pub fn from_grid(grid: &str) -> SpotResult<Self> {
        let locator = GridLocator::parse(grid)?;
        let position = locator.center();
        Ok(Self { locator, position })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandHistory {
    pub band: Band,
    pub hours: Vec<HourCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandActivity {
    pub band: Band,
    pub spots: usize,
}

/// Everything the serving layer shows, captured at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub taken_at: DateTime<Utc>,
    pub spots: Vec<Spot>,
    pub top_hf: Vec<Spot>,
    pub top_vhf: Vec<Spot>,
    pub surging: Vec<SurgeKey>,
    pub history: Vec<BandHistory>,
    pub observer: Option<Observer>,
    pub watchlist: Vec<String>,
    pub bulletin: Bulletin,
}

/// Shared spot state. Each structure has its own lock so readers of one
/// never wait on writers of another.
pub struct SpotBoard {
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
    spots: RwLock<SpotBuffer>,
    surge: Mutex<SurgeDetector>,
    histogram: Mutex<ActivityHistogram>,
    observer: RwLock<Option<Observer>>,
    watchlist: RwLock<HashSet<String>>,
    bulletin: RwLock<Bulletin>,
    alert: Mutex<AlertSlot>,
}

impl SpotBoard {
    pub fn new(config: PipelineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            spots: RwLock::new(SpotBuffer::with_capacity(config.buffer_capacity)),
            surge: Mutex::new(SurgeDetector::new(config.surge.clone())),
            histogram: Mutex::new(ActivityHistogram::new(&config.history_bands)),
            observer: RwLock::new(None),
            watchlist: RwLock::new(HashSet::new()),
            bulletin: RwLock::new(Bulletin::default()),
            alert: Mutex::new(AlertSlot::default()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ---- reads ----

    /// Live spots, newest first. Copies the buffer before filtering.
    pub fn active_spots(&self, filter: &SpotFilter) -> Vec<Spot> {
        let copy = read(&self.spots).clone();
        let mut spots = copy.active(self.now(), self.config.spot_lifetime(), filter);
        spots.reverse();
        spots
    }

    /// Leaderboard of live spots, one entry per callsign.
    pub fn top_spots(&self, limit: usize, class: Option<FrequencyClass>) -> Vec<Spot> {
        let active = self.active_spots(&SpotFilter::default());
        let filter = LeaderboardFilter {
            class,
            ..LeaderboardFilter::default()
        };
        rank_top(&active, limit, &filter)
    }

    /// Live spot counts per band of one class, bands in plan order,
    /// quiet bands left out.
    pub fn band_activity(&self, class: FrequencyClass) -> Vec<BandActivity> {
        let active = self.active_spots(&SpotFilter::default());
        Band::ALL
            .iter()
            .filter(|band| band.class() == class)
            .map(|band| BandActivity {
                band: *band,
                spots: active.iter().filter(|spot| spot.band == *band).count(),
            })
            .filter(|activity| activity.spots > 0)
            .collect()
    }

    pub fn surging(&self) -> Vec<SurgeKey> {
        lock(&self.surge).surging()
    }

    pub fn surging_bands(&self) -> HashSet<Band> {
        lock(&self.surge).surging_bands()
    }

    /// 24-hour activity per tracked band, oldest hour first.
    pub fn history(&self) -> Vec<BandHistory> {
        let now = self.now();
        let histogram = lock(&self.histogram);
        histogram
            .bands()
            .filter_map(|band| {
                histogram
                    .chronological(band, now)
                    .map(|hours| BandHistory { band, hours })
            })
            .collect()
    }

    pub fn observer(&self) -> Option<Observer> {
        read(&self.observer).clone()
    }

    pub fn observer_position(&self) -> Option<GeoPoint> {
        read(&self.observer).as_ref().map(|observer| observer.position)
    }

    pub fn watchlist(&self) -> Vec<String> {
        read(&self.watchlist)
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_watched(&self, callsign: &str) -> bool {
        read(&self.watchlist).contains(&callsign.trim().to_ascii_uppercase())
    }

    pub fn bulletin(&self) -> Bulletin {
        read(&self.bulletin).clone()
    }

    /// The pending alert, handed out once while still fresh.
    pub fn take_alert(&self) -> Option<Alert> {
        let now = self.now();
        lock(&self.alert).take(now)
    }

    pub fn spot_count(&self) -> usize {
        read(&self.spots).len()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            taken_at: self.now(),
            spots: self.active_spots(&SpotFilter::default()),
            top_hf: self.top_spots(10, Some(FrequencyClass::Hf)),
            top_vhf: self.top_spots(10, Some(FrequencyClass::Vhf)),
            surging: self.surging(),
            history: self.history(),
            observer: self.observer(),
            watchlist: self.watchlist(),
            bulletin: self.bulletin(),
        }
    }

    pub fn snapshot_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.snapshot())
    }

    // ---- mutations from the serving layer ----

    /// Returns false when the call is blank.
    pub fn add_watch(&self, callsign: &str) -> bool {
        let call = callsign.trim().to_ascii_uppercase();
        if call.is_empty() {
            return false;
        }
        write(&self.watchlist).insert(call);
        true
    }

    pub fn remove_watch(&self, callsign: &str) -> bool {
        write(&self.watchlist).remove(&callsign.trim().to_ascii_uppercase())
    }

    /// Moves the observer. An invalid locator leaves the old one in place.
    pub fn set_observer_grid(&self, grid: &str) -> SpotResult<Observer> {
        let observer = Observer::from_grid(grid)?;
        *write(&self.observer) = Some(observer.clone());
        Ok(observer)
    }

    // ---- writes from the workers ----

    pub(crate) fn store(&self, spot: Spot) -> (Option<Spot>, Vec<SurgeEvent>) {
        let events = lock(&self.surge).record(spot.band, spot.mode, spot.received_at);
        lock(&self.histogram).record(spot.band, spot.received_at);
        let evicted = write(&self.spots).push(spot);
        (evicted, events)
    }

    pub(crate) fn raise_alert(&self, alert: Alert) {
        lock(&self.alert).raise(alert);
    }

    pub fn evaluate_surges(&self, now: DateTime<Utc>) -> Vec<SurgeEvent> {
        lock(&self.surge).evaluate(now)
    }

    /// Clears the histogram slot of the hour that ended at `boundary`.
    pub fn reset_elapsed_hour(&self, boundary: DateTime<Utc>) -> u32 {
        lock(&self.histogram).reset_elapsed(boundary)
    }

    pub fn set_bulletin(&self, bulletin: Bulletin) {
        *write(&self.bulletin) = bulletin;
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::spot::tests::sample_spot;
    use crate::prelude::ManualClock;
    use chrono::{Duration, TimeZone};

    fn board() -> (SpotBoard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 8, 12, 12, 0, 0).unwrap(),
        ));
        (SpotBoard::new(PipelineConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn invalid_grid_keeps_previous_observer() {
        let (board, _) = board();
        board.set_observer_grid("JN23").unwrap();
        assert!(board.set_observer_grid("XX99").is_err());
        assert_eq!(board.observer().unwrap().locator.as_str(), "JN23");
    }

    #[test]
    fn watchlist_normalizes_calls() {
        let (board, _) = board();
        assert!(board.add_watch(" vp8pj "));
        assert!(!board.add_watch("   "));
        assert!(board.is_watched("VP8PJ"));
        assert_eq!(board.watchlist(), vec!["VP8PJ"]);
        assert!(board.remove_watch("Vp8Pj"));
        assert!(!board.remove_watch("VP8PJ"));
    }

    #[test]
    fn active_spots_are_newest_first_and_expire() {
        let (board, clock) = board();
        board.store(sample_spot("OLD1A", Band::M20, 10, 0.0, 0));
        board.store(sample_spot("NEW1A", Band::M20, 10, 0.0, 60));
        clock.advance(Duration::minutes(2));

        let calls: Vec<_> = board
            .active_spots(&SpotFilter::default())
            .into_iter()
            .map(|spot| spot.callsign)
            .collect();
        assert_eq!(calls, vec!["NEW1A", "OLD1A"]);

        clock.advance(Duration::minutes(29));
        assert_eq!(board.active_spots(&SpotFilter::default()).len(), 0);
        assert_eq!(board.spot_count(), 2);
    }

    #[test]
    fn band_activity_counts_live_spots_per_class() {
        let (board, _) = board();
        board.store(sample_spot("K1AB", Band::M20, 10, 0.0, 0));
        board.store(sample_spot("K2AB", Band::M20, 10, 0.0, 0));
        board.store(sample_spot("K3AB", Band::M2, 10, 0.0, 0));

        assert_eq!(
            board.band_activity(FrequencyClass::Hf),
            vec![BandActivity { band: Band::M20, spots: 2 }]
        );
        assert_eq!(board.band_activity(FrequencyClass::Vhf).len(), 1);
    }

    #[test]
    fn history_covers_tracked_bands_only() {
        let (board, _) = board();
        board.store(sample_spot("K1AB", Band::M10, 10, 0.0, 0));
        board.store(sample_spot("K2AB", Band::M20, 10, 0.0, 0));

        let history = board.history();
        assert_eq!(history.len(), 3);
        let ten = history.iter().find(|h| h.band == Band::M10).unwrap();
        assert_eq!(ten.hours.last().unwrap(), &HourCount { hour: 12, count: 1 });
    }

    #[test]
    fn snapshot_serializes() {
        let (board, _) = board();
        board.store(sample_spot("VP8PJ", Band::M20, 80, 12_000.0, 0));
        let json = board.snapshot_json().unwrap();
        assert_eq!(json["top_hf"][0]["callsign"], "VP8PJ");
        assert_eq!(json["bulletin"]["status"], "Pending");
    }
}

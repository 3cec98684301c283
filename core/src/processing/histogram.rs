use crate::prelude::Band;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: u32,
}

/// 24 counters per tracked band, indexed by UTC hour.
#[derive(Debug, Clone)]
pub struct ActivityHistogram {
    counters: BTreeMap<Band, [u32; HOURS_PER_DAY]>,
}

impl ActivityHistogram {
    pub fn new(bands: &[Band]) -> Self {
        Self {
            counters: bands
                .iter()
                .map(|band| (*band, [0; HOURS_PER_DAY]))
                .collect(),
        }
    }

    /// Counts a spot in the slot of its hour. Untracked bands are ignored.
    pub fn record(&mut self, band: Band, at: DateTime<Utc>) -> bool {
        match self.counters.get_mut(&band) {
            Some(slots) => {
                slots[at.hour() as usize] += 1;
                true
            }
            None => false,
        }
    }

    /// Zeroes the slot of the hour that ended at `boundary`, for every
    /// band, and returns that hour.
    pub fn reset_elapsed(&mut self, boundary: DateTime<Utc>) -> u32 {
        let elapsed = (boundary.hour() + HOURS_PER_DAY as u32 - 1) % HOURS_PER_DAY as u32;
        for slots in self.counters.values_mut() {
            slots[elapsed as usize] = 0;
        }
        elapsed
    }

    pub fn slots(&self, band: Band) -> Option<[u32; HOURS_PER_DAY]> {
        self.counters.get(&band).copied()
    }

    pub fn bands(&self) -> impl Iterator<Item = Band> + '_ {
        self.counters.keys().copied()
    }

    /// Slots rotated so the hour after `now` comes first and the current
    /// hour last.
    pub fn chronological(&self, band: Band, now: DateTime<Utc>) -> Option<Vec<HourCount>> {
        let slots = self.counters.get(&band)?;
        let first = (now.hour() as usize + 1) % HOURS_PER_DAY;
        Some(
            (0..HOURS_PER_DAY)
                .map(|offset| {
                    let hour = (first + offset) % HOURS_PER_DAY;
                    HourCount {
                        hour: hour as u32,
                        count: slots[hour],
                    }
                })
                .collect(),
        )
    }
}

/// The next top of the hour strictly after `now`.
pub fn next_hour_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let into_hour = Duration::seconds(i64::from(now.minute() * 60 + now.second()))
        + Duration::nanoseconds(i64::from(now.nanosecond()));
    now - into_hour + Duration::hours(1)
}

pub fn until_next_hour(now: DateTime<Utc>) -> Duration {
    next_hour_boundary(now) - now
}

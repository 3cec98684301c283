use crate::interface::spot::Spot;
use crate::prelude::{Band, Mode};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Optional band/mode restriction for spot listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpotFilter {
    pub band: Option<Band>,
    pub mode: Option<Mode>,
}

impl SpotFilter {
    pub fn matches(&self, spot: &Spot) -> bool {
        self.band.map_or(true, |band| spot.band == band)
            && self.mode.map_or(true, |mode| spot.mode == mode)
    }
}

/// Bounded ring of spots in arrival order; the oldest falls off when full.
#[derive(Debug, Clone)]
pub struct SpotBuffer {
    spots: VecDeque<Spot>,
    max_capacity: usize,
}

impl SpotBuffer {
    pub fn with_capacity(max_capacity: usize) -> Self {
        let max_capacity = max_capacity.max(1);
        Self {
            spots: VecDeque::with_capacity(max_capacity),
            max_capacity,
        }
    }

    /// Appends a spot and hands back the one it displaced, if any.
    pub fn push(&mut self, spot: Spot) -> Option<Spot> {
        let evicted = if self.spots.len() >= self.max_capacity {
            self.spots.pop_front()
        } else {
            None
        };
        self.spots.push_back(spot);
        evicted
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn snapshot(&self) -> Vec<Spot> {
        self.spots.iter().cloned().collect()
    }

    /// Spots younger than `lifetime` that pass the filter, oldest first.
    pub fn active(&self, now: DateTime<Utc>, lifetime: Duration, filter: &SpotFilter) -> Vec<Spot> {
        self.spots
            .iter()
            .filter(|spot| spot.is_active(now, lifetime) && filter.matches(spot))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::spot::tests::sample_spot;

    #[test]
    fn evicts_exactly_the_oldest_overflow() {
        let mut buffer = SpotBuffer::with_capacity(4);
        let mut evicted = Vec::new();
        for n in 0..7 {
            let call = format!("DL{n}ABC");
            if let Some(old) = buffer.push(sample_spot(&call, Band::M20, 10, 0.0, n)) {
                evicted.push(old.callsign);
            }
            assert!(buffer.len() <= buffer.capacity());
        }
        assert_eq!(evicted, vec!["DL0ABC", "DL1ABC", "DL2ABC"]);
        let kept: Vec<_> = buffer.snapshot().into_iter().map(|s| s.callsign).collect();
        assert_eq!(kept, vec!["DL3ABC", "DL4ABC", "DL5ABC", "DL6ABC"]);
    }

    #[test]
    fn active_filters_by_age_band_and_mode() {
        let mut buffer = SpotBuffer::with_capacity(10);
        let old = sample_spot("OLD1A", Band::M20, 10, 0.0, 0);
        let now = old.received_at + Duration::minutes(40);
        buffer.push(old);
        buffer.push(sample_spot("NEW1A", Band::M20, 10, 0.0, 30 * 60));
        buffer.push(sample_spot("NEW2A", Band::M6, 10, 0.0, 35 * 60));

        let lifetime = Duration::minutes(30);
        assert_eq!(buffer.active(now, lifetime, &SpotFilter::default()).len(), 2);

        let six = SpotFilter {
            band: Some(Band::M6),
            ..Default::default()
        };
        let hits = buffer.active(now, lifetime, &six);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].callsign, "NEW2A");

        let cw = SpotFilter {
            mode: Some(Mode::Cw),
            ..Default::default()
        };
        assert!(buffer.active(now, lifetime, &cw).is_empty());
    }
}

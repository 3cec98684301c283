use chrono::Duration;

pub struct StatsHelper;

impl StatsHelper {
    /// Average events per minute over a window.
    pub fn rate_per_minute(count: usize, window: Duration) -> f64 {
        let minutes = window.num_milliseconds() as f64 / 60_000.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        count as f64 / minutes
    }
}

use crate::workflow::bulletin::fetch_bulletin;
use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Client;
use spotcore::processing::histogram::{next_hour_boundary, until_next_hour};
use spotcore::SpotBoard;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Sleeps to each top of the hour and clears the slot of the hour that
/// just ended.
pub async fn rotate_histogram(board: Arc<SpotBoard>) {
    loop {
        let now = board.now();
        let boundary = next_hour_boundary(now);
        let wait = until_next_hour(now)
            .to_std()
            .unwrap_or(Duration::from_secs(1));
        debug!("histogram rotation in {}s", wait.as_secs());
        sleep(wait).await;
        rotate_once(&board, boundary);
    }
}

fn rotate_once(board: &SpotBoard, boundary: DateTime<Utc>) -> u32 {
    let hour = board.reset_elapsed_hour(boundary);
    info!("histogram: cleared {hour:02}h slot");
    hour
}

/// Refreshes the solar bulletin on a fixed interval, starting immediately.
pub async fn refresh_bulletin(board: Arc<SpotBoard>, client: Client, url: String, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let bulletin = fetch_bulletin(&client, &url, board.now()).await;
        info!("propagation: {}", bulletin.summary());
        board.set_bulletin(bulletin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use spotcore::prelude::{Band, Clock, ManualClock, PipelineConfig};
    use spotcore::SpotPipeline;
    use spotcore::processing::PrefixTable;

    #[test]
    fn rotation_clears_the_elapsed_hour() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 8, 12, 9, 30, 0).unwrap(),
        ));
        let board = Arc::new(SpotBoard::new(PipelineConfig::default(), clock.clone()));
        let pipeline = SpotPipeline::new(Arc::new(PrefixTable::empty()), board.clone());
        pipeline.ingest_line("DX de X: 50313.0 DL1ABC FT8").unwrap();

        let boundary = next_hour_boundary(clock.now());
        clock.set(boundary);
        assert_eq!(rotate_once(&board, boundary), 9);

        let six = board
            .history()
            .into_iter()
            .find(|history| history.band == Band::M6)
            .unwrap();
        assert!(six.hours.iter().all(|slot| slot.count == 0));
    }
}

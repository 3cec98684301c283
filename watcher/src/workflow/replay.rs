use crate::generator::profile::{build_feed, GeneratorConfig};
use crate::workflow::config::WatcherConfig;
use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::{json, Value};
use spotcore::prelude::ManualClock;
use spotcore::processing::PrefixTable;
use spotcore::{SpotBoard, SpotPipeline};
use std::sync::Arc;

/// Feeds synthetic traffic through a full pipeline on a manual clock and
/// returns the final board as JSON. Uses the cached entity database when
/// one exists; never touches the network.
pub fn replay(
    config: &WatcherConfig,
    generator: &GeneratorConfig,
    start: DateTime<Utc>,
) -> anyhow::Result<Value> {
    let clock = Arc::new(ManualClock::new(start));
    let board = Arc::new(SpotBoard::new(config.to_pipeline_config(), clock.clone()));
    board
        .set_observer_grid(&config.grid)
        .with_context(|| format!("observer grid {:?}", config.grid))?;
    for call in &config.watchlist {
        board.add_watch(call);
    }

    let table = PrefixTable::load(&config.entity_db_cache).unwrap_or_else(|error| {
        warn!("offline replay without entity database: {error}");
        PrefixTable::empty()
    });
    let pipeline = SpotPipeline::new(Arc::new(table), board.clone());

    let feed = build_feed(generator, start).context("generating synthetic feed")?;
    let mut openings = 0;
    for line in &feed {
        clock.advance(line.delay);
        let _ = pipeline.ingest_line(&line.text);
        openings += pipeline.tick().iter().filter(|event| event.surging).count();
    }

    let metrics = pipeline.metrics();
    info!(
        "offline replay: {} accepted, {} rejected, {} evicted",
        metrics.accepted, metrics.rejected, metrics.evicted
    );

    Ok(json!({
        "lines": feed.len(),
        "metrics": metrics,
        "openings_on_tick": openings,
        "alert": board.take_alert(),
        "board": board.snapshot_json().context("serializing board")?,
    }))
}

use crate::feed::line::{parse_line, RawSpot};
use crate::interface::alert::alert_for;
use crate::interface::board::SpotBoard;
use crate::interface::spot::Spot;
use crate::prelude::SpotResult;
use crate::processing::classifier::{classify, Classification};
use crate::processing::resolver::{distance_km, PrefixTable};
use crate::processing::scorer::{self, ScoreInput};
use crate::processing::surge::SurgeEvent;
use crate::telemetry::{LogManager, Metrics, MetricsRecorder};
use std::sync::Arc;

/// Parse → classify → resolve → score → store, one feed line at a time.
///
/// Runs on the ingestion worker only. Everything it writes lives on the
/// shared [`SpotBoard`], so the serving side reads from there.
pub struct SpotPipeline {
    table: Arc<PrefixTable>,
    board: Arc<SpotBoard>,
    log: LogManager,
    metrics: MetricsRecorder,
}

impl SpotPipeline {
    pub fn new(table: Arc<PrefixTable>, board: Arc<SpotBoard>) -> Self {
        Self {
            table,
            board,
            log: LogManager::new(),
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn board(&self) -> &Arc<SpotBoard> {
        &self.board
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Turns one line into a stored spot. A rejected line leaves the
    /// board untouched.
    pub fn ingest_line(&self, line: &str) -> SpotResult<Spot> {
        let (raw, class) = match validate(line) {
            Ok(parts) => parts,
            Err(error) => {
                self.metrics.record_rejected();
                self.log.rejected(line, &error);
                return Err(error);
            }
        };

        // Latches of other bands only move on evaluation; bring them up to
        // date before the surge bonus is read.
        self.tick();
        let spot = self.build(raw, class);

        self.log.spot(&spot);
        let (evicted, events) = self.board.store(spot.clone());
        self.metrics.record_accepted();
        if evicted.is_some() {
            self.metrics.record_evicted();
        }
        self.report(&events);

        let own_call = &self.board.config().callsign;
        let watched = self.board.is_watched(&spot.callsign);
        if let Some(alert) = alert_for(&spot, own_call, watched) {
            self.log.alert(&alert);
            self.metrics.record_alert();
            self.board.raise_alert(alert);
        }

        Ok(spot)
    }

    /// Re-tests the surge latches against the clock, so quiet bands close
    /// even when no spots arrive.
    pub fn tick(&self) -> Vec<SurgeEvent> {
        let events = self.board.evaluate_surges(self.board.now());
        self.report(&events);
        events
    }

    fn build(&self, raw: RawSpot, class: Classification) -> Spot {
        let location = self.table.resolve(&raw.callsign, &raw.comment);
        let distance = distance_km(self.board.observer_position(), location.position);
        let watched = self.board.is_watched(&raw.callsign);
        let surging = self.board.surging_bands();

        let score = scorer::score(&ScoreInput {
            callsign: &raw.callsign,
            band: class.band,
            mode: class.mode,
            comment: &raw.comment,
            distance_km: distance,
            watched,
            surging: &surging,
        });

        Spot {
            raw_frequency: raw.frequency,
            frequency_khz: class.frequency_khz,
            band: class.band,
            mode: class.mode,
            callsign: raw.callsign,
            comment: raw.comment,
            country: location.label,
            position: location.position,
            distance_km: distance,
            score,
            wanted: scorer::is_wanted(score),
            received_at: self.board.now(),
            color: class.band.color(),
        }
    }

    fn report(&self, events: &[SurgeEvent]) {
        for event in events {
            self.log.surge(event);
        }
    }
}

fn validate(line: &str) -> SpotResult<(RawSpot, Classification)> {
    let raw = parse_line(line)?;
    let class = classify(raw.frequency, &raw.comment)?;
    Ok((raw, class))
}

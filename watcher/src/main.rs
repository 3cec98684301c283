use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use generator::profile::GeneratorConfig;
use log::{info, warn};
use spotcore::prelude::SystemClock;
use spotcore::{SpotBoard, SpotPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WatcherConfig;
use workflow::entity_db::load_prefix_table;
use workflow::replay::replay;
use workflow::runner::FeedRunner;
use workflow::workers::{refresh_bulletin, rotate_histogram};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "DX cluster spot watcher")]
struct Args {
    /// Load the watcher config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Login callsign, also excluded from alerts
    #[arg(long, default_value = "N0CALL")]
    callsign: String,
    /// Observer Maidenhead locator
    #[arg(long, default_value = "JN23")]
    grid: String,
    /// Cluster node as host:port; repeat for fallbacks
    #[arg(long = "cluster")]
    clusters: Vec<String>,
    /// Replay synthetic spots through the pipeline and print a JSON summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    #[arg(long, default_value_t = 500)]
    count: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = &args.config {
        WatcherConfig::load(path)?
    } else {
        WatcherConfig::from_args(&args.callsign, &args.grid, &args.clusters)?
    };

    if args.offline {
        let generator = GeneratorConfig {
            count: args.count,
            seed: args.seed,
            ..GeneratorConfig::default()
        };
        let summary = replay(&config, &generator, Utc::now())?;
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("formatting replay summary")?
        );
        return Ok(());
    }

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;
    runtime.block_on(watch(config))
}

async fn watch(config: WatcherConfig) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("building HTTP client")?;

    let board = Arc::new(SpotBoard::new(
        config.to_pipeline_config(),
        Arc::new(SystemClock),
    ));
    if let Err(error) = board.set_observer_grid(&config.grid) {
        warn!("distances disabled until a valid locator is set: {error}");
    }
    for call in &config.watchlist {
        board.add_watch(call);
    }

    let table = load_prefix_table(&client, &config).await;
    info!("geolocation ready with {} prefixes", table.len());
    let pipeline = SpotPipeline::new(Arc::new(table), board.clone());
    let runner = FeedRunner::new(config.clone(), pipeline)?;

    let feed = tokio::spawn(runner.run());
    tokio::spawn(rotate_histogram(board.clone()));
    tokio::spawn(refresh_bulletin(
        board.clone(),
        client,
        config.bulletin_url.clone(),
        config.bulletin_interval(),
    ));

    tokio::select! {
        result = signal::ctrl_c() => {
            result.context("awaiting Ctrl+C to exit")?;
            info!("shutting down with {} spots buffered", board.spot_count());
        }
        joined = feed => {
            joined.context("feed worker panicked")??;
        }
    }
    Ok(())
}

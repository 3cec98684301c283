use crate::workflow::config::WatcherConfig;
use anyhow::Context;
use log::{info, warn};
use reqwest::Client;
use spotcore::processing::PrefixTable;
use std::path::Path;

/// Loads the prefix table from the local cache, downloading it first when
/// the cache is missing. Never fails: without a database every spot
/// resolves to "Unknown".
pub async fn load_prefix_table(client: &Client, config: &WatcherConfig) -> PrefixTable {
    let cache = config.entity_db_cache.as_path();
    if !cache.exists() {
        if let Err(error) = download(client, &config.entity_db_url, cache).await {
            warn!("entity database download failed: {error:#}");
        }
    }

    match PrefixTable::load(cache) {
        Ok(table) => table,
        Err(error) => {
            warn!("geolocation degraded to Unknown: {error}");
            PrefixTable::empty()
        }
    }
}

async fn download(client: &Client, url: &str, cache: &Path) -> anyhow::Result<()> {
    info!("fetching entity database from {url}");
    let bytes = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .context("entity database server refused")?
        .bytes()
        .await
        .context("reading entity database body")?;
    tokio::fs::write(cache, &bytes)
        .await
        .with_context(|| format!("writing cache {}", cache.display()))?;
    info!("cached {} bytes at {}", bytes.len(), cache.display());
    Ok(())
}

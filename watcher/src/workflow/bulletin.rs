use anyhow::Context;
use chrono::{DateTime, Utc};
use log::warn;
use reqwest::Client;
use spotcore::interface::Bulletin;

/// Fetches the solar text bulletin. Any failure yields a placeholder that
/// stays until the next refresh.
pub async fn fetch_bulletin(client: &Client, url: &str, at: DateTime<Utc>) -> Bulletin {
    match fetch_text(client, url).await {
        Ok(text) => Bulletin::from_wwv_text(&text, at),
        Err(error) => {
            warn!("solar bulletin unavailable: {error:#}");
            Bulletin::unavailable(error.to_string(), at)
        }
    }
}

async fn fetch_text(client: &Client, url: &str) -> anyhow::Result<String> {
    client
        .get(url)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .context("bulletin server refused")?
        .text()
        .await
        .context("reading bulletin body")
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotcore::interface::BulletinStatus;

    #[tokio::test]
    async fn unreachable_source_leaves_placeholder() {
        let at = Utc::now();
        let bulletin = fetch_bulletin(&Client::new(), "http://127.0.0.1:9/wwv.txt", at).await;
        assert!(matches!(bulletin.status, BulletinStatus::Unavailable(_)));
        assert_eq!(bulletin.updated_at, Some(at));
        assert!(bulletin.solar_flux.is_none());
    }
}

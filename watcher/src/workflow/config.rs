use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use spotcore::prelude::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One upstream DX cluster node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSource {
    pub host: String,
    pub port: u16,
}

impl ClusterSource {
    /// Parses `host:port`.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let (host, port) = text
            .trim()
            .rsplit_once(':')
            .with_context(|| format!("cluster {text:?} is not host:port"))?;
        if host.is_empty() {
            bail!("cluster {text:?} has no host");
        }
        let port = port
            .parse()
            .with_context(|| format!("cluster {text:?} has a bad port"))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub callsign: String,
    pub grid: String,
    pub clusters: Vec<ClusterSource>,
    /// Sent once after the login line.
    pub commands: Vec<String>,
    pub keep_alive_secs: u64,
    pub read_timeout_ms: u64,
    pub connect_timeout_secs: u64,
    pub backoff_secs: u64,
    pub entity_db_url: String,
    pub entity_db_cache: PathBuf,
    pub bulletin_url: String,
    pub bulletin_interval_secs: u64,
    pub watchlist: Vec<String>,
    pub pipeline: PipelineConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            callsign: "N0CALL".to_string(),
            grid: "JN23".to_string(),
            clusters: vec![
                ClusterSource {
                    host: "dxfun.com".to_string(),
                    port: 8000,
                },
                ClusterSource {
                    host: "cluster.dx.de".to_string(),
                    port: 7300,
                },
            ],
            commands: vec!["set/dx/filter".to_string(), "show/dx 50".to_string()],
            keep_alive_secs: 60,
            read_timeout_ms: 2_000,
            connect_timeout_secs: 10,
            backoff_secs: 15,
            entity_db_url: "https://www.country-files.com/cty/cty.dat".to_string(),
            entity_db_cache: PathBuf::from("cty.dat"),
            bulletin_url: "https://services.swpc.noaa.gov/text/wwv.txt".to_string(),
            bulletin_interval_secs: 900,
            watchlist: Vec::new(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl WatcherConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading watcher config {}", path_ref.display()))?;
        let config: WatcherConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing watcher config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_args(callsign: &str, grid: &str, clusters: &[String]) -> anyhow::Result<Self> {
        let mut config = Self {
            callsign: callsign.trim().to_ascii_uppercase(),
            grid: grid.trim().to_string(),
            ..Self::default()
        };
        if !clusters.is_empty() {
            config.clusters = clusters
                .iter()
                .map(|text| ClusterSource::parse(text))
                .collect::<anyhow::Result<_>>()?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.clusters.is_empty() {
            bail!("at least one cluster source is required");
        }
        if self.callsign.trim().is_empty() {
            bail!("a login callsign is required");
        }
        Ok(())
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            callsign: self.callsign.trim().to_ascii_uppercase(),
            ..self.pipeline.clone()
        }
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn bulletin_interval(&self) -> Duration {
        Duration::from_secs(self.bulletin_interval_secs.max(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotcore::prelude::Band;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_produces_pipeline_config() {
        let cfg = WatcherConfig::from_args(" f1abc ", "JN23", &["node.example.org:7373".to_string()])
            .unwrap();
        assert_eq!(cfg.to_pipeline_config().callsign, "F1ABC");
        assert_eq!(cfg.clusters[0].address(), "node.example.org:7373");
        assert!(WatcherConfig::from_args("F1ABC", "JN23", &["nohost".to_string()]).is_err());
    }

    #[test]
    fn config_load_reads_yaml_with_defaults() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"callsign: F1ABC\nclusters:\n  - host: localhost\n    port: 7300\n\
pipeline:\n  buffer_capacity: 200\n  history_bands: [\"6m\", \"2m\"]\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WatcherConfig::load(&path).unwrap();

        assert_eq!(cfg.clusters.len(), 1);
        assert_eq!(cfg.keep_alive_secs, 60);
        assert_eq!(cfg.commands, vec!["set/dx/filter", "show/dx 50"]);
        let pipeline = cfg.to_pipeline_config();
        assert_eq!(pipeline.buffer_capacity, 200);
        assert_eq!(pipeline.history_bands, vec![Band::M6, Band::M2]);
        assert_eq!(pipeline.spot_lifetime_secs, 1800);
    }

    #[test]
    fn config_without_clusters_is_rejected() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"clusters: []\n").unwrap();
        let path = temp.into_temp_path();
        assert!(WatcherConfig::load(&path).is_err());
    }
}

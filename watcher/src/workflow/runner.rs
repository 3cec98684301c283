use crate::workflow::config::{ClusterSource, WatcherConfig};
use anyhow::{bail, Context};
use log::{info, warn};
use spotcore::feed::{decode_latin1, ConnectionEvent, ConnectionMachine, ConnectionState};
use spotcore::SpotPipeline;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

/// Longest line accepted from a node before the link is dropped.
const MAX_LINE_BYTES: usize = 4096;

/// Owns the upstream connection and feeds every received line through the
/// pipeline. Reconnects forever, rotating through the configured nodes.
pub struct FeedRunner {
    config: WatcherConfig,
    pipeline: SpotPipeline,
    machine: ConnectionMachine,
}

impl FeedRunner {
    pub fn new(config: WatcherConfig, pipeline: SpotPipeline) -> anyhow::Result<Self> {
        let machine =
            ConnectionMachine::new(config.clusters.len()).context("building connection machine")?;
        Ok(Self {
            config,
            pipeline,
            machine,
        })
    }

    /// Only returns on an illegal state transition.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            self.cycle().await?;
        }
    }

    /// Dial, stream until the link drops, then back off and move on to the
    /// next node.
    async fn cycle(&mut self) -> anyhow::Result<ConnectionState> {
        let source = self.config.clusters[self.machine.state().source()].clone();
        self.machine.apply(ConnectionEvent::Dial)?;
        info!(
            "connecting to {} ({}/{})",
            source.address(),
            self.machine.state().source() + 1,
            self.config.clusters.len()
        );

        let ended = match self.connect(&source).await {
            Ok(stream) => {
                self.machine.apply(ConnectionEvent::Established)?;
                info!("streaming spots from {}", source.address());
                match self.stream(stream).await {
                    Ok(received) => {
                        warn!("{} closed the connection after {received} spots", source.address());
                        ConnectionEvent::Closed
                    }
                    Err(error) => {
                        warn!("connection to {} failed: {error:#}", source.address());
                        ConnectionEvent::Failed
                    }
                }
            }
            Err(error) => {
                warn!("cannot reach {}: {error:#}", source.address());
                ConnectionEvent::Failed
            }
        };
        self.machine.apply(ended)?;

        sleep(self.config.backoff()).await;
        Ok(self.machine.apply(ConnectionEvent::BackoffElapsed)?)
    }

    async fn connect(&self, source: &ClusterSource) -> anyhow::Result<TcpStream> {
        timeout(
            self.config.connect_timeout(),
            TcpStream::connect(source.address()),
        )
        .await
        .context("connect timed out")?
        .context("opening TCP connection")
    }

    /// Streams until EOF and returns the number of accepted spots.
    async fn stream(&self, stream: TcpStream) -> anyhow::Result<usize> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        self.login(&mut writer).await?;

        let tick_every = self.tick_interval();
        let mut received = 0;
        let mut last_ping = Instant::now();
        let mut last_tick = Instant::now();
        let mut buf = Vec::new();
        loop {
            let room = MAX_LINE_BYTES.saturating_sub(buf.len());
            if room == 0 {
                bail!("line longer than {MAX_LINE_BYTES} bytes");
            }
            let mut limited = (&mut reader).take(room as u64);

            // A timed-out read keeps its partial bytes in `buf`.
            match timeout(self.config.read_timeout(), limited.read_until(b'\n', &mut buf)).await {
                Ok(Ok(0)) => return Ok(received),
                Ok(Ok(_)) if buf.ends_with(b"\n") => {
                    let line = decode_latin1(&buf);
                    buf.clear();
                    if self.pipeline.ingest_line(line.trim_end()).is_ok() {
                        received += 1;
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(error)) => return Err(error).context("reading from cluster"),
                Err(_) => {
                    self.pipeline.tick();
                    last_tick = Instant::now();
                }
            }

            if last_tick.elapsed() >= tick_every {
                self.pipeline.tick();
                last_tick = Instant::now();
            }

            if last_ping.elapsed() >= self.config.keep_alive() {
                writer
                    .write_all(b"\r\n")
                    .await
                    .context("sending keep-alive")?;
                last_ping = Instant::now();
            }
        }
    }

    /// Latches are re-tested at least once per "recent" span, even on a
    /// feed too busy to ever time out.
    fn tick_interval(&self) -> Duration {
        let recent = self.config.pipeline.surge.recent_secs.max(1);
        Duration::from_secs(recent.unsigned_abs())
    }

    async fn login<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> anyhow::Result<()> {
        let mut script = format!("{}\r\n", self.config.callsign.trim().to_ascii_uppercase());
        for command in &self.config.commands {
            script.push_str(command);
            script.push_str("\r\n");
        }
        writer
            .write_all(script.as_bytes())
            .await
            .context("sending login")?;
        writer.flush().await.context("sending login")
    }
}

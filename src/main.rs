// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use streamgraph::config::LineColor;
use streamgraph::drivers::{
    format_stream_table, Discovery, LocalRegistry, Session, Snapshot, SnapshotConsumer,
    StreamError,
};
use streamgraph::GraphConfig;

#[derive(Parser)]
#[command(name = "streamgraph")]
#[command(about = "Follow a live multi-channel stream through a rolling window")]
#[command(version)]
struct Cli {
    /// Stream to follow. Lists visible streams when omitted.
    stream_name: Option<String>,

    /// Rolling window length in samples
    buffer_size: Option<usize>,

    /// JSON config file; command line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated channel names (must match the channel count)
    #[arg(long, value_delimiter = ',')]
    names: Option<Vec<String>>,

    /// Line colour: b, r, g, c, m, y, k or w
    #[arg(long)]
    color: Option<LineColor>,

    /// Light background, dark foreground
    #[arg(long)]
    invert: bool,

    /// Treat the first two channels as X/Y coordinates
    #[arg(long)]
    xy: bool,

    /// Log a window summary every N ticks
    #[arg(long, default_value_t = 60)]
    report_every: u64,
}

// Headless stand-in for a plot: logs what a renderer would draw
struct LogConsumer {
    labels: Vec<String>,
    xy: bool,
    report_every: u64,
    ticks: u64,
}

impl LogConsumer {
    fn new(xy: bool, report_every: u64) -> Self {
        Self {
            labels: Vec::new(),
            xy,
            report_every: report_every.max(1),
            ticks: 0,
        }
    }

    // XY needs two channels; narrower streams fall back to per-channel summaries
    fn set_labels(&mut self, labels: Vec<String>) {
        if self.xy && labels.len() < 2 {
            warn!(
                "--xy needs at least 2 channels, stream has {}; logging channel summaries instead",
                labels.len()
            );
            self.xy = false;
        }
        self.labels = labels;
    }
}

impl SnapshotConsumer for LogConsumer {
    fn on_update(&mut self, snapshot: &Arc<Snapshot>) {
        self.ticks += 1;
        if self.ticks % self.report_every != 0 || !snapshot.has_signal() {
            return;
        }
        if self.xy {
            if let Some([x, y]) = snapshot.xy_points().last() {
                info!("xy ({x:.3}, {y:.3})");
            }
            return;
        }
        let span = match (snapshot.timestamps().first(), snapshot.timestamps().last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        for (k, label) in self.labels.iter().enumerate() {
            let Some(channel) = snapshot.channel(k) else { continue };
            let min = channel.iter().copied().fold(f64::INFINITY, f64::min);
            let max = channel.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let last = channel.iter().next_back().copied().unwrap_or_default();
            info!("{label:>6} [{min:8.3}, {max:8.3}] last {last:8.3} over {span:.2}s");
        }
    }

    fn on_closed(&mut self, reason: &StreamError) {
        info!("stream closed: {reason}");
    }
}

fn list_streams(discovery: &dyn Discovery) -> Result<()> {
    let streams = discovery.list().context("listing streams")?;
    println!("Available streams:");
    println!("==================");
    print!("{}", format_stream_table(&streams));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GraphConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GraphConfig::default(),
    };
    if cli.stream_name.is_some() {
        config.stream_name = cli.stream_name.clone();
    }
    if let Some(len) = cli.buffer_size {
        config.buffer_len = len;
    }
    if cli.names.is_some() {
        config.channel_names = cli.names.clone();
    }
    if let Some(color) = cli.color {
        config.theme.color = color;
    }
    config.theme.invert |= cli.invert;
    config.validate().context("invalid configuration")?;

    let registry = LocalRegistry::with_demo_streams();
    if config.stream_name.is_none() {
        return list_streams(&registry);
    }

    let consumer = LogConsumer::new(cli.xy, cli.report_every);
    let mut session = match Session::connect(&registry, &config, consumer) {
        Ok(session) => session,
        Err(StreamError::StreamNotFound { name }) => {
            println!("No stream by name {name} found...");
            return list_streams(&registry);
        }
        Err(err) => return Err(err).context("connecting"),
    };
    let labels = session.channel_names().to_vec();
    session.consumer_mut().set_labels(labels);

    let stop = session.stop_signal();
    ctrlc::set_handler(move || stop.stop()).context("installing Ctrl-C handler")?;

    info!(
        "{} | {} channels | window {} samples | colour {} | inverted {}",
        session.info().title(),
        session.info().channel_count,
        config.buffer_len,
        config.theme.color,
        config.theme.invert
    );
    session.run().context("streaming")?;
    Ok(())
}

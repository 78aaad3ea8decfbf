use anyhow::Context;
use clap::Parser;
use netgrab::probe::{BannerProbe, Probe};
use netgrab::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};

/// Bulk application-layer scanner: expands targets from the input stream,
/// probes each over a bounded worker pool and emits one JSON record per
/// connection-run.
#[derive(Parser, Debug)]
#[command(name = "netgrab", version)]
struct Cli {
    /// Destination port for all connections
    #[arg(short, long, required_unless_present = "config")]
    port: Option<u16>,

    /// File with one target per line (domain, address or CIDR block);
    /// defaults to stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file for newline-delimited JSON records; defaults to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Concurrent scan workers
    #[arg(short, long, default_value_t = num_cpus::get())]
    workers: usize,

    /// Queue capacity multiplier (capacity = workers * multiplier)
    #[arg(long, default_value_t = 4)]
    queue_multiplier: usize,

    /// Idle timeout in seconds for dial/read/write; 0 disables deadlines
    #[arg(short = 't', long, default_value_t = 10)]
    timeout: u64,

    /// Independent connection-runs per target
    #[arg(long, default_value_t = 1)]
    connections_per_host: u32,

    /// Keep running later probes after one returns an error
    #[arg(long)]
    continue_on_error: bool,

    /// Load pipeline settings from a TOML file instead of the flags above
    #[arg(long)]
    config: Option<PathBuf>,

    /// Payload the banner probe writes before reading; \r and \n escapes
    /// are honored
    #[arg(long)]
    probe_payload: Option<String>,

    /// Maximum banner bytes to read per connection
    #[arg(long, default_value_t = 1024)]
    max_banner_len: usize,
}

impl Cli {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        if let Some(path) = &self.config {
            return PipelineConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()));
        }

        let port = self
            .port
            .ok_or_else(|| anyhow::anyhow!("--port is required without --config"))?;
        let config = PipelineConfig::new(port)
            .with_workers(self.workers)
            .with_queue_multiplier(self.queue_multiplier)
            .with_idle_timeout_secs(self.timeout)
            .with_connections_per_host(self.connections_per_host)
            .with_continue_on_error(self.continue_on_error);
        config.validate()?;
        Ok(config)
    }

    fn probes(&self) -> Vec<Arc<dyn Probe>> {
        let mut banner = BannerProbe::new().with_max_len(self.max_banner_len);
        if let Some(payload) = &self.probe_payload {
            let payload = payload.replace("\\r", "\r").replace("\\n", "\n");
            banner = banner.with_payload(payload.into_bytes());
        }
        vec![Arc::new(banner)]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = cli.pipeline_config()?;
    let pipeline = Pipeline::new(cli.probes(), config)?;

    let input: Box<dyn AsyncBufRead + Unpin> = match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("opening input file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let output: Box<dyn AsyncWrite + Unpin + Send> = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("creating output file {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(tokio::io::stdout()),
    };

    let summary = pipeline.run(input, output).await?;
    log::info!(
        "scan finished: {} targets, {} records written, {} lines skipped",
        summary.targets,
        summary.records,
        summary.skipped_lines
    );
    for (probe, stats) in pipeline.monitor().summary() {
        log::info!(
            "probe {}: {} succeeded, {} failed",
            probe,
            stats.successes,
            stats.failures
        );
    }

    Ok(())
}

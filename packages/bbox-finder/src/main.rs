//! Finds a small list of feed bounding boxes that together surface every
//! listing in a set of target neighborhoods.
//!
//! ```text
//! bbox-finder "32.02,34.74,32.12,34.84" 1461,1520,205
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fmt::Write as _;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geo_coverage::{find_cover, parse_box_list, CoverReport, FeedProbe, SignalSet};

mod config;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "bbox-finder")]
#[command(about = "Search the listing feed for boxes covering target neighborhoods")]
#[command(version)]
struct Cli {
    /// Seed box "latMin,lonMin,latMax,lonMax"; several may be joined with ';'
    bbox: String,

    /// Comma-separated neighborhood ids to cover
    #[arg(value_parser = parse_targets)]
    targets: SignalSet,

    /// Smallest latitude span worth probing (env: MIN_LAT_SPAN)
    #[arg(long)]
    min_lat_span: Option<f64>,

    /// Smallest longitude span worth probing (env: MIN_LON_SPAN)
    #[arg(long)]
    min_lon_span: Option<f64>,

    /// Pause between probes in milliseconds (env: PROBE_DELAY_MS)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Stop after this many probes (env: MAX_PROBES)
    #[arg(long)]
    max_probes: Option<usize>,

    /// Also subdivide boxes whose probe saw nothing
    #[arg(long)]
    exhaustive: bool,

    /// Feed map endpoint (env: FEED_URL)
    #[arg(long)]
    feed_url: Option<String>,

    /// Minimum listing price filter (env: MIN_PRICE)
    #[arg(long)]
    min_price: Option<u32>,

    /// Maximum listing price filter (env: MAX_PRICE)
    #[arg(long)]
    max_price: Option<u32>,

    /// Send no price filter at all
    #[arg(long, conflicts_with_all = ["min_price", "max_price"])]
    no_price_filter: bool,

    /// Per-request timeout in seconds (env: PROBE_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Cli {
    /// Flags given on the command line win over the environment.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(v) = self.min_lat_span {
            config.min_lat_span = v;
        }
        if let Some(v) = self.min_lon_span {
            config.min_lon_span = v;
        }
        if let Some(v) = self.delay_ms {
            config.probe_delay_ms = v;
        }
        if let Some(v) = self.max_probes {
            config.max_probes = Some(v);
        }
        if let Some(v) = &self.feed_url {
            config.feed_url = v.clone();
        }
        if let Some(v) = self.min_price {
            config.min_price = Some(v);
        }
        if let Some(v) = self.max_price {
            config.max_price = Some(v);
        }
        if self.no_price_filter {
            config.min_price = None;
            config.max_price = None;
        }
        if let Some(v) = self.timeout_secs {
            config.timeout_secs = v;
        }
        config
    }
}

fn parse_targets(input: &str) -> Result<SignalSet, String> {
    let targets = input
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse()
                .map_err(|_| format!("invalid neighborhood id: {id:?}"))
        })
        .collect::<Result<SignalSet, String>>()?;

    if targets.is_empty() {
        return Err("at least one neighborhood id is required".to_string());
    }
    Ok(targets)
}

fn join_ids(ids: &SignalSet) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text printed to stdout once the search finishes.
fn render_report(report: &CoverReport) -> String {
    let outcome = &report.outcome;
    let cover = &report.cover;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Explored {} boxes with {} probes ({} failed)",
        outcome.stats.explored, outcome.stats.probes, outcome.stats.failed_probes
    );
    if outcome.budget_exhausted {
        let _ = writeln!(out, "Probe budget exhausted; results are from coarse levels only");
    }
    let _ = writeln!(
        out,
        "Found {} candidate boxes covering: {}",
        outcome.candidates.len(),
        join_ids(&outcome.achieved)
    );
    let _ = writeln!(out, "Removed {} redundant boxes", cover.removed);

    if cover.is_empty() {
        let _ = writeln!(
            out,
            "No bounding boxes found that contain the target neighborhoods after filtering."
        );
        if !outcome.candidates.is_empty() {
            let unfiltered = outcome
                .candidates
                .keys()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";");
            let _ = writeln!(
                out,
                "Unfiltered candidates ({}):\n{}",
                outcome.candidates.len(),
                unfiltered
            );
        }
        return out;
    }

    let _ = writeln!(out, "Final boxes cover: {}", join_ids(&cover.covered));
    let _ = writeln!(out, "BBOX_LIST ({} boxes):", cover.len());
    let _ = writeln!(out, "{}", cover.box_list());
    out
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.apply(Config::from_env().context("Failed to load configuration")?);
    tracing::debug!(?config, "Configuration loaded");

    let seeds = parse_box_list(&cli.bbox);
    if seeds.is_empty() {
        bail!("no valid bounding box in {:?}", cli.bbox);
    }

    let probe = FeedProbe::new(config.feed_config()).context("Failed to build feed client")?;

    tracing::info!(
        seeds = seeds.len(),
        targets = ?cli.targets,
        "Starting bounding box search"
    );

    let report = find_cover(
        &probe,
        seeds,
        cli.targets.clone(),
        config.search_config(cli.exhaustive),
    )
    .await
    .context("Invalid search configuration")?;

    print!("{}", render_report(&report));

    if let Some(partial) = report.partial_coverage() {
        eprintln!("Warning: {partial}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,geo_coverage=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

mod app;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use topology_lens::config::{DEFAULT_POLL_SECS, load_layout_params, poll_interval};
use topology_lens::projection::ViewMode;
use topology_lens::source::SnapshotSource;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Topology snapshot JSON. The built-in demo cluster is shown when omitted.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// `EntityRisk` array overriding the risks embedded in the snapshot.
    #[arg(long, requires = "snapshot")]
    risk: Option<PathBuf>,
    /// Poll interval in seconds, clamped to 10..=30.
    #[arg(long, default_value_t = DEFAULT_POLL_SECS)]
    poll_secs: u64,
    #[arg(long, default_value_t = ViewMode::Service)]
    view: ViewMode,
    /// Namespace shown in the full view. Repeatable; none means all.
    #[arg(long = "namespace")]
    namespaces: Vec<String>,
    /// JSON file with layout tuning overrides.
    #[arg(long)]
    layout_config: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    demo_seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("topology_lens=info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let params = load_layout_params(args.layout_config.as_deref())?;
    let source = match args.snapshot {
        Some(graph) => SnapshotSource::File {
            graph,
            risk: args.risk,
        },
        None => SnapshotSource::Demo {
            seed: args.demo_seed,
        },
    };
    let settings = app::AppSettings {
        source,
        interval: poll_interval(args.poll_secs),
        params,
        mode: args.view,
        filter: args.namespaces.into_iter().collect(),
    };
    info!(
        source = %settings.source.describe(),
        interval_secs = settings.interval.as_secs(),
        view = %settings.mode,
        "starting topology viewer"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "topology-lens",
        options,
        Box::new(move |cc| Ok(Box::new(app::TopologyApp::new(cc, settings)))),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}

//! surface-placement: runs the built-in placement scenario against a
//! simulated headset and detector.

use std::time::Duration;

use surface_placement::backend::{self, SimulationConfig};
use surface_placement::spatial::{PlacementConfig, SurfaceClass};

use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "surface-placement", about = "AR surface placement core")]
struct Cli {
    /// Backend to use: headless or replay
    #[arg(long, default_value = "headless")]
    backend: String,

    /// Surface class that can receive the object
    #[arg(long, default_value = "table")]
    target_class: String,

    /// Merge detections closer than this on the ground plane (meters)
    #[arg(long, default_value = "0.3")]
    merge_threshold: f32,

    /// Keep every detection as its own candidate
    #[arg(long)]
    no_merge: bool,

    /// Minimum gaze alignment (cosine) to select a surface
    #[arg(long, default_value = "0.95")]
    gaze_threshold: f32,

    /// Gaze poll interval in milliseconds
    #[arg(long, default_value = "33", value_parser = clap::value_parser!(u64).range(1..))]
    gaze_interval_ms: u64,

    /// Keep candidates visible when they are not under gaze
    #[arg(long)]
    show_unfocused: bool,

    /// Exit after N seconds (headless mode testing)
    #[arg(long)]
    exit_after: Option<u64>,

    /// Pretend the device cannot detect planes
    #[arg(long)]
    simulate_unsupported: bool,

    /// Pretend the user denied world sensing
    #[arg(long)]
    simulate_denied: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surface_placement=info".into()),
        )
        .init();

    info!("surface-placement v{} starting", env!("CARGO_PKG_VERSION"));
    info!("backend: {}", cli.backend);

    let Some(backend_type) = backend::BackendType::from_str(&cli.backend) else {
        eprintln!("Unknown backend: {}. Use: headless or replay", cli.backend);
        std::process::exit(1);
    };

    let target_class = SurfaceClass::from_str(&cli.target_class).unwrap_or_else(|| {
        eprintln!("Invalid target class '{}', using table", cli.target_class);
        SurfaceClass::Table
    });

    let config = PlacementConfig {
        target_class,
        merge_threshold: cli.merge_threshold,
        merge_on_detect: !cli.no_merge,
        gaze_threshold: cli.gaze_threshold,
        gaze_interval: Duration::from_millis(cli.gaze_interval_ms),
        hide_unfocused: !cli.show_unfocused,
        ..PlacementConfig::default()
    };

    let simulation = SimulationConfig {
        unsupported: cli.simulate_unsupported,
        denied: cli.simulate_denied,
    };

    backend::run(backend_type, config, cli.exit_after, simulation)
}

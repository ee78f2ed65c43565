mod app;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use haptic_spike_audio::HapticConfig;

#[derive(Parser, Debug)]
#[command(name = "haptic-spike-audio", about = "Touch a surface, hear its texture")]
struct Args {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let config = match &args.config {
        Some(path) => HapticConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => HapticConfig::default(),
    };
    info!(tick_ms = config.tick_ms, sample_rate = config.sample_rate, "starting");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([820.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Haptic Spike Audio",
        options,
        Box::new(|cc| match app::HapticApp::new(cc, config) {
            Ok(app) => Ok(Box::new(app) as Box<dyn eframe::App>),
            Err(err) => Err(Box::new(err) as Box<dyn std::error::Error + Send + Sync>),
        }),
    )
    .map_err(|err| anyhow::anyhow!("viewer failed: {err}"))
}

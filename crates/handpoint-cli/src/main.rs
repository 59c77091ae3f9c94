//! handpoint CLI entry point.

mod args;
mod tracker;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use handpoint_core::config::TrackerConfig;
use handpoint_core::landmark::Landmark;
use handpoint_core::mapping::{map_landmark, Sensitivity, Viewport};
use handpoint_core::scene::{Scene, SceneLayout};
use tracing::{error, info, warn};

use crate::args::{Cli, Commands, ConfigArgs, MapArgs, ReplayArgs};
use crate::tracker::paths;
use crate::tracker::replay::{self, ReplayEvent, ReplayOptions};

fn main() {
    // Logs go to stderr; stdout carries JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Replay(args) => run_replay(args),
        Commands::Map(args) => run_map(&args),
        Commands::Config(args) => {
            let config = effective_config(&args)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Examples => {
            println!("{}", crate::args::EXAMPLES_TEXT);
            Ok(())
        }
    }
}

/// Load the config file, apply command-line overrides and validate.
fn effective_config(args: &ConfigArgs) -> Result<TrackerConfig> {
    let (mut config, source) =
        paths::load_config(args.config.as_deref()).context("Failed to load config")?;
    if let Some(source) = source {
        info!(path = ?source, "Using config file");
    }
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn run_map(args: &MapArgs) -> Result<()> {
    // Reuse config validation for the sensitivity values.
    TrackerConfig {
        sensitivity_x: args.sensitivity_x,
        sensitivity_y: args.sensitivity_y,
        ..TrackerConfig::default()
    }
    .validate()?;

    let point = map_landmark(
        Landmark::new(args.x, args.y, 0.0),
        Sensitivity {
            x: args.sensitivity_x,
            y: args.sensitivity_y,
        },
        Viewport::new(args.width, args.height),
    );
    println!("{}", serde_json::to_string(&point)?);
    Ok(())
}

fn print_event(event: &ReplayEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize replay event: {}", e),
    }
}

/// Drive a tracking session from a recording with graceful signal handling.
fn run_replay(args: ReplayArgs) -> Result<()> {
    let config = effective_config(&args.config)?;

    let layout_text = std::fs::read_to_string(&args.scene)
        .with_context(|| format!("Failed to read scene {:?}", args.scene))?;
    let layout: SceneLayout = serde_json::from_str(&layout_text)
        .with_context(|| format!("Invalid scene layout in {:?}", args.scene))?;
    let mut scene = Scene::from_layout(&layout);
    scene.on_activation(|record| print_event(&ReplayEvent::activation(record)));

    let frames = replay::load_frames(&args.frames)?;
    let options = ReplayOptions {
        frame_rate: args.fps,
        linger: Duration::from_millis(args.linger),
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(async {
        tokio::select! {
            result = replay::run_replay(scene, config, frames, options) => {
                print_event(&ReplayEvent::Summary(result?));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, stopping replay");
            }
            _ = sigterm() => {
                info!("Received SIGTERM, stopping replay");
            }
        }
        // A cancelled replay drops its session, which aborts the run task.
        Ok(())
    })
}

/// Wait for SIGTERM signal (Unix only).
///
/// If signal registration fails, logs a warning and waits indefinitely.
#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(
                "Failed to register SIGTERM handler: {}, replay will only respond to SIGINT",
                e
            );
            std::future::pending::<()>().await;
        }
    }
}

/// SIGTERM is not available on non-Unix platforms; use a never-completing future.
#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}

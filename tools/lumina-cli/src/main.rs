//! Lumina CLI: drive the viewer core without a browser.
//!
//! Usage:
//!   lumina fit <SCENE>         Simulate camera auto-fit over a scene file
//!   lumina toasts <SCRIPT>     Replay a toast script against the queue
//!   lumina config              Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lumina_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "lumina",
    about = "Viewer-core tools for the Lumina study platform",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/lumina/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate camera auto-fit frame by frame over a scene description
    Fit {
        /// Path to a scene description (JSON)
        scene: PathBuf,

        /// Number of frames to simulate
        #[arg(long, default_value = "120")]
        frames: u64,

        /// Simulated frame rate
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Vertical field of view in degrees
        #[arg(long, default_value = "50")]
        fov: f64,

        /// Saved camera state; when present, auto-fit is skipped
        #[arg(long)]
        saved_camera: Option<PathBuf>,

        /// Write the final camera state here
        #[arg(long)]
        save_camera: Option<PathBuf>,
    },

    /// Replay a toast script and print every snapshot
    Toasts {
        /// Path to a toast script (JSON)
        script: PathBuf,

        /// Use real timers instead of virtual time
        #[arg(long)]
        realtime: bool,

        /// Print snapshots as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the standard location
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => AppConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    lumina_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Fit {
            scene,
            frames,
            fps,
            fov,
            saved_camera,
            save_camera,
        } => commands::fit::run(
            &config,
            scene,
            frames,
            fps,
            fov,
            saved_camera,
            save_camera,
        ),
        Commands::Toasts {
            script,
            realtime,
            json,
        } => commands::toasts::run(&config, script, realtime, json).await,
        Commands::Config { write } => commands::config::run(&config, write),
    }
}

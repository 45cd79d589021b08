// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use preview_bridge::{CameraFacing, FrameSize};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "preview-bridge")]
#[command(about = "Camera to GPU pipeline preview bridge")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a preview session with the virtual camera
    Run {
        /// Configuration file (default: ~/.config/preview-bridge/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Camera facing, overrides the configuration
        #[arg(short, long)]
        facing: Option<CameraFacing>,

        /// Convert on the CPU instead of the GPU
        #[arg(long)]
        cpu: bool,

        /// Simulate the user refusing camera permission
        #[arg(long)]
        deny_permission: bool,

        /// Stop after this many frames reached the pipeline
        #[arg(long, default_value = "90")]
        frames: u64,

        /// Send the session to the background and back halfway through
        #[arg(long)]
        pause_cycle: bool,

        /// Display surface size
        #[arg(short, long, default_value = "1280x720")]
        surface: FrameSize,
    },

    /// Print the resolved configuration as JSON
    Info {
        /// Configuration file (default: ~/.config/preview-bridge/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=preview_bridge=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            facing,
            cpu,
            deny_permission,
            frames,
            pause_cycle,
            surface,
        } => cli::run_session(cli::SessionOptions {
            config,
            facing,
            cpu,
            deny_permission,
            frames,
            pause_cycle,
            surface,
        }),
        Commands::Info { config } => cli::print_info(config),
    }
}

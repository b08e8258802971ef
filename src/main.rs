// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use snapshoot_camera::PhotoQuality;
use snapshoot_camera::backends::camera::Facing;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "snapshoot-camera")]
#[command(about = "Camera session manager for Snapshoot")]
#[command(version = snapshoot_camera::constants::app_info::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a photo
    Photo {
        /// Camera to use (front or rear)
        #[arg(short, long)]
        facing: Option<Facing>,

        /// Stream this image instead of the generated test pattern
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// JPEG quality preset
        #[arg(short, long, value_parser = parse_quality)]
        quality: Option<PhotoQuality>,

        /// Output file path (default: ~/Pictures/Snapshoot/IMG_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a clip
    Video {
        /// Camera to use (front or rear)
        #[arg(short, long)]
        facing: Option<Facing>,

        /// Stop after this many seconds (capped by the configured maximum)
        #[arg(short, long)]
        duration: Option<u32>,

        /// Request a microphone along with the camera
        #[arg(short, long)]
        audio: bool,

        /// Output file path (default: ~/Videos/Snapshoot/VID_TIMESTAMP.mjpeg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sign in and remember the user
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Use the built-in stand-in instead of the configured server
        #[arg(long)]
        offline: bool,
    },

    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Use the built-in stand-in instead of the configured server
        #[arg(long)]
        offline: bool,
    },

    /// Forget the signed-in user
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Print the effective configuration
    Config {
        /// Write the defaults to the config file first
        #[arg(long)]
        reset: bool,
    },
}

fn parse_quality(value: &str) -> Result<PhotoQuality, String> {
    PhotoQuality::ALL
        .into_iter()
        .find(|q| q.display_name().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("Unknown quality '{}' (low, medium, high)", value))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=snapshoot_camera=debug, RUST_LOG=info
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
        Commands::Photo {
            facing,
            image,
            quality,
            output,
        } => cli::take_photo(facing, image, quality, output),
        Commands::Video {
            facing,
            duration,
            audio,
            output,
        } => cli::record_video(facing, duration, audio, output),
        Commands::Login {
            email,
            password,
            offline,
        } => cli::login(&email, &password, offline),
        Commands::Register {
            username,
            email,
            password,
            offline,
        } => cli::register(&username, &email, &password, offline),
        Commands::Logout => cli::logout(),
        Commands::Whoami => cli::whoami(),
        Commands::Config { reset } => cli::show_config(reset),
    }
}

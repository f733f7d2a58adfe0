//! FrameCast CLI: command-line interface for camera frame streaming.
//!
//! Usage:
//!   framecast stream [OPTIONS]   Stream camera frames to an endpoint
//!   framecast receive [OPTIONS]  Receive frames and write them to disk
//!   framecast check              Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "framecast",
    about = "Periodic camera frame streaming over WebSocket",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream camera frames to a WebSocket endpoint
    Stream {
        /// WebSocket endpoint to push frames to
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Milliseconds between captures
        #[arg(short, long)]
        interval: Option<u64>,

        /// Camera device path
        #[arg(short, long)]
        device: Option<String>,

        /// Capture width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Capture height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// JPEG quality, 1 to 100
        #[arg(short, long)]
        quality: Option<u8>,

        /// Stream a synthetic test pattern instead of a camera
        #[arg(long)]
        test_pattern: bool,
    },

    /// Receive frames and write them to disk as JPEG files
    Receive {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8000")]
        listen: String,

        /// Directory frames are written to
        #[arg(short, long, default_value = "received_frames")]
        output: PathBuf,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = framecast_common::config::AppConfig::load();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    framecast_common::logging::init_logging(&framecast_common::config::LoggingConfig {
        level: log_level,
        json: config.logging.json,
    });

    match cli.command {
        Commands::Stream {
            endpoint,
            interval,
            device,
            width,
            height,
            quality,
            test_pattern,
        } => {
            commands::stream::run(
                config,
                endpoint,
                interval,
                device,
                width,
                height,
                quality,
                test_pattern,
            )
            .await
        }
        Commands::Receive { listen, output } => commands::receive::run(listen, output).await,
        Commands::Check => commands::check::run(config),
    }
}

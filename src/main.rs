use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{error, info};

use kinect_relay::config::{RelayConfig, DEFAULT_LOOPBACK_DEVICE};
use kinect_relay::output::sink::PixelFormat;
use kinect_relay::relay::supervisor::Supervisor;
use kinect_relay::sensor::types::StreamMode;

#[derive(Parser, Debug)]
#[command(name = "kinect-relay")]
#[command(about = "Relays Kinect video and depth streams to a v4l2loopback virtual camera")]
#[command(version)]
struct Cli {
    /// Enable infrared (IR) streaming (8-bit grayscale).
    #[arg(long)]
    ir: bool,

    /// Enable RGB video streaming. Cannot be combined with --ir.
    #[arg(long, conflicts_with = "ir")]
    rgb: bool,

    /// Enable depth streaming (forwarded as 8-bit grayscale).
    #[arg(long)]
    depth: bool,

    /// v4l2loopback device to write frames to.
    #[arg(long, value_name = "DEV", default_value = DEFAULT_LOOPBACK_DEVICE)]
    loopback: String,
}

fn main() -> ExitCode {
    // No arguments prints usage and exits successfully, like --help.
    if std::env::args().len() <= 1 {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                // Argument errors are fatal before any device is touched.
                _ => ExitCode::FAILURE,
            };
        }
    };

    let mode = match StreamMode::from_flags(cli.ir, cli.rgb, cli.depth) {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Set RUST_LOG to control log level, e.g. RUST_LOG=debug.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::new(mode, cli.loopback);
    info!(
        "starting {} relay to {} ({})",
        config.mode, config.loopback_path, config.geometry
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(err) = ctrlc::set_handler(move || {
            running.store(false, Ordering::Relaxed);
        }) {
            error!("failed to install Ctrl-C handler: {err}");
        }
    }

    // The destination is opened once and reused across sensor reconnects.
    // Failures here are best-effort: the relay keeps running and individual
    // writes fail until the device becomes usable after a restart.
    let mut sink = kinect_relay::open_sink(&config.loopback_path);
    if let Err(err) = sink.configure(config.geometry, PixelFormat::for_mode(config.mode)) {
        error!("destination device configuration failed: {err}; continuing without output");
    }

    let driver = kinect_relay::create_sensor_driver();
    let mut supervisor = Supervisor::new(driver);
    let exit = supervisor.run(&config, sink.as_mut(), &running);
    info!("relay stopped: {exit:?}");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ir_and_rgb_conflict_is_a_parse_error() {
        let err = Cli::try_parse_from(["kinect-relay", "--ir", "--rgb"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn unknown_flag_is_a_parse_error() {
        let err = Cli::try_parse_from(["kinect-relay", "--wat"]).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn missing_loopback_value_is_a_parse_error() {
        assert!(Cli::try_parse_from(["kinect-relay", "--ir", "--loopback"]).is_err());
    }

    #[test]
    fn loopback_defaults_to_dev_video2() {
        let cli = Cli::try_parse_from(["kinect-relay", "--depth"]).unwrap();
        assert_eq!(cli.loopback, "/dev/video2");
        assert!(cli.depth);
        assert!(!cli.ir);
        assert!(!cli.rgb);
    }

    #[test]
    fn loopback_accepts_a_custom_device() {
        let cli =
            Cli::try_parse_from(["kinect-relay", "--rgb", "--loopback", "/dev/video7"]).unwrap();
        assert_eq!(cli.loopback, "/dev/video7");
    }

    #[test]
    fn help_is_not_a_failure() {
        let err = Cli::try_parse_from(["kinect-relay", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn flags_map_to_stream_modes_before_any_device_io() {
        let cli = Cli::try_parse_from(["kinect-relay", "--ir", "--depth"]).unwrap();
        let mode = StreamMode::from_flags(cli.ir, cli.rgb, cli.depth).unwrap();
        assert_eq!(mode, StreamMode::InfraredDepth);
    }
}

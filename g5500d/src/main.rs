//! # G-5500 Rotator Daemon
//!
//! Headless daemon driving a Yaesu G-5500 azimuth/elevation rotator from a
//! Raspberry Pi: four relay lines out, an ADS1015 in, rotator-control
//! commands over two TCP ports.
//!
//! # Usage
//!
//! ```bash
//! # Real hardware, stock ports
//! g5500d
//!
//! # Full simulation, verbose logging
//! g5500d --simulator 3 -v
//!
//! # Config file with CLI override
//! g5500d --config /etc/g5500d.toml --rotctld-port 4534
//! ```

mod config;
mod server;

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use g5500_common::cal::CalStore;
use g5500_common::error::RotError;
use g5500_common::state::SimMode;
use g5500_control::{Controller, SharedState, Surface};
use g5500_hal::{PiHal, RotatorHal, SimHal};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;

/// Yaesu G-5500 rotator daemon for Raspberry Pi
#[derive(Parser, Debug)]
#[command(name = "g5500d")]
#[command(version)]
#[command(about = "Headless Yaesu G-5500 az/el rotator daemon")]
struct Args {
    /// Path to the configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulator mode 0..=3 (0 = real hardware; overrides the config file)
    #[arg(short, long)]
    simulator: Option<u8>,

    /// Listen port for the rotctld-compatible dialect
    #[arg(long)]
    rotctld_port: Option<u16>,

    /// Listen port for the permissive direct dialect
    #[arg(long)]
    direct_port: Option<u16>,

    /// Calibration file override
    #[arg(long)]
    cal_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("g5500d startup failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    info!("g5500d v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = DaemonConfig::load(args.config.as_deref())?;
    if let Some(simulator) = args.simulator {
        config.simulator = simulator;
    }
    if let Some(port) = args.rotctld_port {
        config.rotctld_port = port;
    }
    if let Some(port) = args.direct_port {
        config.direct_port = port;
    }
    if let Some(path) = args.cal_file {
        config.cal_file = Some(path);
    }
    let sim_mode = SimMode::from_u8(config.simulator)
        .ok_or_else(|| format!("simulator must be 0..=3, got {}", config.simulator))?;

    let store = config
        .cal_file
        .clone()
        .map_or_else(CalStore::default_path, CalStore::new);
    info!(cal_file = %store.path().display(), "calibration store");

    let shared = Arc::new(SharedState::new());
    let surface = Arc::new(Surface::new(Arc::clone(&shared), store.clone()));

    let mut hal: Box<dyn RotatorHal> = match sim_mode {
        SimMode::Off => Box::new(PiHal::new()),
        _ => Box::new(SimHal::new(sim_mode)),
    };
    hal.init()
        .map_err(|e| format!("{} ({e})", RotError::GpioFail))?;

    if sim_mode != SimMode::Off {
        surface.set_sim_mode(config.simulator)?;
    }

    let controller = Controller::new(hal, Arc::clone(&shared), store);
    controller.spawn()?;

    let rotctld = TcpListener::bind(("0.0.0.0", config.rotctld_port))?;
    let direct = TcpListener::bind(("0.0.0.0", config.direct_port))?;
    info!(
        rotctld_port = config.rotctld_port,
        direct_port = config.direct_port,
        "listening"
    );
    {
        let surface = Arc::clone(&surface);
        thread::Builder::new()
            .name("rotctld-listener".into())
            .spawn(move || server::serve_rotctld(rotctld, surface))?;
    }
    {
        let surface = Arc::clone(&surface);
        thread::Builder::new()
            .name("direct-listener".into())
            .spawn(move || server::serve_direct(direct, surface))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let surface = Arc::clone(&surface);
        ctrlc::set_handler(move || {
            info!("shutdown signal received");
            surface.stop();
            running.store(false, Ordering::SeqCst);
        })?;
    }

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    // Give the controller one chance to observe the stop and open the relays.
    thread::sleep(Duration::from_millis(100));
    info!("g5500d shutdown complete");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

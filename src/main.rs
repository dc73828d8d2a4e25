#![warn(clippy::all, clippy::pedantic, clippy::cargo, clippy::nursery)]
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use kartsim::driver::{Driver, FixedDriver, ScriptedDriver};
use kartsim::{Controls, Session, SimConfig};

const DEFAULT_SCRIPT: &str = "scripts/autopilot.lua";

/// Headless kart run: drive one kart around the ring and export telemetry.
#[derive(Parser)]
#[command(name = "kartsim")]
#[command(version)]
struct Args {
    /// JSON config file; defaults are used when omitted
    config: Option<PathBuf>,

    /// Lua driver script defining `drive(kart, time)`
    #[arg(long, default_value = DEFAULT_SCRIPT)]
    script: PathBuf,

    /// Number of ticks to simulate
    #[arg(long)]
    ticks: Option<u32>,

    /// Ticks per second
    #[arg(long)]
    tick_rate: Option<u32>,

    /// Directory the telemetry file is written to
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .wrap_err_with(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(ticks) = args.ticks {
        config.ticks = ticks;
    }
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate = tick_rate;
    }
    config.validate().wrap_err("invalid settings")?;

    let mut driver: Box<dyn Driver> = if args.script.exists() {
        Box::new(
            ScriptedDriver::from_file(&args.script)
                .wrap_err_with(|| format!("loading driver script {}", args.script.display()))?,
        )
    } else {
        warn!(script = %args.script.display(), "driver script not found, holding accelerate");
        Box::new(FixedDriver(Controls::accelerate()))
    };

    let dt = config.tick_dt();
    let ticks = config.ticks;
    let mut session = Session::new(config);

    for _ in 0..ticks {
        let controls = match driver.controls(session.kart(), session.time()) {
            Ok(controls) => controls,
            Err(e) => {
                warn!(error = %e, "driver failed, coasting this tick");
                Controls::NONE
            }
        };
        session.tick(dt, controls);
        for (obstacle, duration, speed) in session.take_shakes() {
            debug!(?obstacle, duration, speed, "shake");
        }
    }

    let telemetry = session.telemetry();
    println!("{}", serde_json::to_string(&telemetry.summary)?);

    let path = telemetry
        .export(&args.log_dir)
        .wrap_err("exporting telemetry")?;
    info!(path = %path.display(), "run finished");

    Ok(())
}

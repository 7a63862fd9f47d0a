//! GrowBox controller: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  GpioActuators      Almanac            FileActivityLog       │
//! │  (ActuatorPort)     (SunTime+Geocoder) (EventSink)           │
//! │  NoProbes           SystemClock        StdDelay              │
//! │  (SensorPort)       (Clock)            (DelayNs)             │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │            Controller (pure logic)                 │      │
//! │  │  LightCycle · PumpCycle · startup reconcile        │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  Scheduler (tag-addressable, runner-driven)                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exit status: 0 after the stop button, 1 after a fatal fault, 2 when
//! the controller could not be started at all.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{error, info, warn};

use growbox::adapters::almanac::{Almanac, SolarCalculator};
use growbox::adapters::hardware::{GpioActuators, NoProbes};
use growbox::adapters::log_sink::FileActivityLog;
use growbox::adapters::time::{StdDelay, SystemClock};
use growbox::app::ports::ActuatorPort;
use growbox::app::service::{Controller, Rig, StopReason};
use growbox::config::ControllerConfig;
use growbox::drivers::sim_pin::SimPin;
use growbox::drivers::sysfs_pin::{PinMode, SYSFS_GPIO_ROOT, SysfsPin};

#[cfg(feature = "geocode")]
type Geocoder = growbox::adapters::almanac::NominatimGeocoder;
#[cfg(not(feature = "geocode"))]
type Geocoder = growbox::adapters::almanac::NoGeocoder;

const CONFIG_ENV: &str = "GROWBOX_CONFIG";
const DEFAULT_CONFIG: &str = "./growbox.json";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("GrowBox v{}", env!("CARGO_PKG_VERSION"));

    match launch() {
        Ok(StopReason::StopButton) => ExitCode::SUCCESS,
        Ok(StopReason::Fault(e)) => {
            error!("Stopped on fault: {}", e);
            ExitCode::from(1)
        }
        Err(e) => {
            error!("Startup failed: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// First CLI argument, then `$GROWBOX_CONFIG`, then `./growbox.json`.
fn config_path() -> PathBuf {
    env::args_os()
        .nth(1)
        .or_else(|| env::var_os(CONFIG_ENV))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

fn geocoder() -> Result<Geocoder> {
    #[cfg(feature = "geocode")]
    {
        Geocoder::new().context("creating geocoder")
    }
    #[cfg(not(feature = "geocode"))]
    {
        Ok(Geocoder::default())
    }
}

// ── Wiring ────────────────────────────────────────────────────

fn launch() -> Result<StopReason> {
    let path = config_path();
    let config = ControllerConfig::load(&path)
        .with_context(|| format!("loading config {}", path.display()))?;
    let sink = FileActivityLog::open(&config.log_path)
        .with_context(|| format!("opening activity log {}", config.log_path.display()))?;
    let sky = Almanac::new(SolarCalculator::local(), geocoder()?);

    if Path::new(SYSFS_GPIO_ROOT).is_dir() {
        let pins = config.pins;
        let light = SysfsPin::open(pins.light, PinMode::Output).context("light pin")?;
        let pump = SysfsPin::open(pins.pump, PinMode::Output).context("pump pin")?;
        let stop = SysfsPin::open(pins.stop_button, PinMode::Input).context("stop button pin")?;
        info!(
            "GPIO: light={} pump={} stop={} (sysfs)",
            pins.light, pins.pump, pins.stop_button
        );
        Ok(run(config, GpioActuators::new(light, pump, stop), sky, sink))
    } else {
        warn!("GPIO: {} not found, running on simulated pins", SYSFS_GPIO_ROOT);
        let hw = GpioActuators::new(SimPin::new("light"), SimPin::new("pump"), SimPin::new("stop"));
        Ok(run(config, hw, sky, sink))
    }
}

fn run<H: ActuatorPort>(
    config: ControllerConfig,
    hw: H,
    sky: Almanac<Geocoder>,
    sink: FileActivityLog,
) -> StopReason {
    let mut rig = Rig {
        hw,
        sky,
        sensors: NoProbes,
        sink,
    };
    let mut controller = Controller::new(config);
    let reason = controller.run(&mut rig, &SystemClock, &mut StdDelay);
    info!("Stopped after {} ticks: {}", controller.tick_count(), reason);
    reason
}

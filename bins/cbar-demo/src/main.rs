use std::sync::Arc;
use std::time::Duration;

use cbar_config::DemoConfig;
use cbar_core::{Crossbar, LineConfig, LineId, LineKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Line indices for the sample table built in [`build_table`]. Declared as
/// constants rather than magic numbers so `main`'s feed loop reads the same
/// as the table it is driving.
mod lines {
    use cbar_core::LineId;

    pub const VOLTAGE: LineId = LineId(0);
    pub const VOLTAGE_OK: LineId = LineId(1);
    pub const IGNITION: LineId = LineId(2);
    pub const GPS_FIX: LineId = LineId(3);
    pub const GPS_LOST: LineId = LineId(4);
    pub const THERMAL_RAW: LineId = LineId(5);
    pub const THERMAL_TRIP: LineId = LineId(6);
    pub const THERMAL_ALARM: LineId = LineId(7);
    pub const IDLING: LineId = LineId(8);
    pub const SHUTDOWN_REQUEST: LineId = LineId(9);
    pub const HEARTBEAT: LineId = LineId(10);
}

fn build_table(config: &DemoConfig) -> Vec<LineConfig> {
    vec![
        LineConfig::new("voltage", LineKind::Input),
        LineConfig::new(
            "voltage_ok",
            LineKind::Threshold {
                input: lines::VOLTAGE,
                threshold_up: config.voltage_threshold_up,
                threshold_down: config.voltage_threshold_down,
            },
        ),
        LineConfig::new(
            "ignition",
            LineKind::Debounce {
                input: lines::VOLTAGE_OK,
                timeout_up_ms: config.ignition_timeout_up_ms,
                timeout_down_ms: config.ignition_timeout_down_ms,
            },
        ),
        LineConfig::new(
            "gps_fix",
            LineKind::External {
                read: Box::new(|| 1),
                invert: false,
            },
        ),
        LineConfig::new("gps_lost", LineKind::Monitor { input: lines::GPS_FIX }),
        LineConfig::new("thermal_raw", LineKind::Input),
        LineConfig::new(
            "thermal_trip",
            LineKind::Threshold {
                input: lines::THERMAL_RAW,
                threshold_up: 900,
                threshold_down: 800,
            },
        ),
        LineConfig::new(
            "thermal_alarm",
            LineKind::Monitor { input: lines::THERMAL_TRIP },
        ),
        LineConfig::new(
            "idling",
            LineKind::Calculated {
                compute: Box::new(|view| {
                    let ignition = view.value(lines::IGNITION);
                    let voltage_ok = view.value(lines::VOLTAGE_OK);
                    if ignition != 0 && voltage_ok != 0 {
                        1
                    } else {
                        0
                    }
                }),
            },
        ),
        LineConfig::new("shutdown_request", LineKind::Request),
        LineConfig::new(
            "heartbeat",
            LineKind::Periodic { period_ms: config.heartbeat_period_ms },
        ),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = "cbar-demo.toml";
    let config = DemoConfig::load(config_path).unwrap_or_else(|err| {
        eprintln!("cbar-demo: {err}, falling back to defaults");
        DemoConfig::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let table = build_table(&config);
    let cbar = Arc::new(Crossbar::init(table).expect("sample line table has valid topology"));

    info!(
        tick_interval_ms = config.tick_interval_ms,
        "cbar-demo: crossbar primed, starting tick loop"
    );

    // A small battery-voltage waveform that dips below the threshold once,
    // long enough to watch the debounce on `ignition` ride through it.
    let voltage_waveform: [i64; 12] = [1100, 1100, 1100, 900, 900, 900, 900, 1100, 1100, 1100, 1100, 1100];
    let thermal_waveform: [i64; 12] = [500, 500, 500, 500, 500, 950, 950, 950, 500, 500, 500, 500];

    for (i, (&voltage, &thermal)) in voltage_waveform.iter().zip(thermal_waveform.iter()).enumerate() {
        cbar.feed_input(lines::VOLTAGE, voltage);
        cbar.feed_input(lines::THERMAL_RAW, thermal);
        if i == 5 {
            cbar.post_request(lines::SHUTDOWN_REQUEST);
        }

        cbar.recalculate(config.tick_interval_ms as i64);

        if cbar.pending(lines::GPS_LOST) {
            info!("cbar-demo: GPS fix lost");
        }
        if cbar.pending(lines::THERMAL_ALARM) {
            info!("cbar-demo: thermal alarm edge");
        }
        if cbar.pending(lines::SHUTDOWN_REQUEST) {
            info!("cbar-demo: shutdown requested");
        }

        info!(
            tick = i,
            voltage_ok = cbar.value(lines::VOLTAGE_OK),
            ignition = cbar.value(lines::IGNITION),
            idling = cbar.value(lines::IDLING),
            "cbar-demo: tick"
        );

        std::thread::sleep(Duration::from_millis(config.tick_interval_ms));
    }

    let _ = cbar.pending(lines::HEARTBEAT);

    let mut out = std::io::stdout();
    cbar.dump(&mut out)?;

    Ok(())
}

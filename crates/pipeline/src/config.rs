//! Alert policy configuration.

use chrono::Duration;
use pumpwatch_core::error::CoreError;
use pumpwatch_core::voltage::{VoltageBand, VoltagePolicy, DEFAULT_TOLERANCE_PERCENT, NOMINAL_400V};

/// Default de-duplication window per (device, alert type).
pub const DEFAULT_ALERT_COOLDOWN_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// At most one accepted alert per (device, type) within this window.
    pub alert_cooldown: Duration,
    pub voltage: VoltagePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            alert_cooldown: Duration::seconds(DEFAULT_ALERT_COOLDOWN_SECS),
            voltage: VoltagePolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                    | Default | Notes                         |
    /// |-----------------------------|---------|-------------------------------|
    /// | `ALERT_COOLDOWN_SECS`       | `300`   |                               |
    /// | `VOLTAGE_DEFAULT_NOMINAL`   | `400`   | `230` or `400` class          |
    /// | `VOLTAGE_TOLERANCE_PERCENT` | `10`    |                               |
    /// | `DEVICE_VOLTAGE_CLASSES`    | -       | per-device, `D1=230,D2=400`   |
    pub fn from_env() -> Result<Self, CoreError> {
        let cooldown_secs = env_parse("ALERT_COOLDOWN_SECS", DEFAULT_ALERT_COOLDOWN_SECS)?;
        if cooldown_secs < 0 {
            return Err(CoreError::Validation(
                "ALERT_COOLDOWN_SECS must not be negative".into(),
            ));
        }
        let nominal = env_parse("VOLTAGE_DEFAULT_NOMINAL", NOMINAL_400V)?;
        let tolerance = env_parse("VOLTAGE_TOLERANCE_PERCENT", DEFAULT_TOLERANCE_PERCENT)?;

        let mut voltage = VoltagePolicy::new(VoltageBand::new(nominal, tolerance)?);
        if let Ok(classes) = std::env::var("DEVICE_VOLTAGE_CLASSES") {
            voltage = voltage.with_overrides(&classes, tolerance)?;
        }

        Ok(Self {
            alert_cooldown: Duration::seconds(cooldown_secs),
            voltage,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} has an invalid value: '{raw}'"))),
        Err(_) => Ok(default),
    }
}

//! Accepted voltage bands per device class.
//!
//! Stations are wired either as 230V-class (phase-to-neutral) or 400V-class
//! (phase-to-phase) deployments. Which one applies is configuration, never
//! inferred from the payload shape.

use std::collections::HashMap;

use crate::error::CoreError;

/// Nominal voltage of a 230V-class deployment.
pub const NOMINAL_230V: f64 = 230.0;

/// Nominal voltage of a 400V-class deployment.
pub const NOMINAL_400V: f64 = 400.0;

/// Default tolerance around nominal, in percent.
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 10.0;

/// Accepted band `nominal ± tolerance%`, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageBand {
    pub nominal: f64,
    pub tolerance_percent: f64,
}

impl VoltageBand {
    pub fn new(nominal: f64, tolerance_percent: f64) -> Result<Self, CoreError> {
        if !(nominal.is_finite() && nominal > 0.0) {
            return Err(CoreError::Validation(format!(
                "nominal voltage must be positive, got {nominal}"
            )));
        }
        if !(0.0..100.0).contains(&tolerance_percent) {
            return Err(CoreError::Validation(format!(
                "voltage tolerance must be within [0, 100), got {tolerance_percent}"
            )));
        }
        Ok(Self {
            nominal,
            tolerance_percent,
        })
    }

    pub fn class_230() -> Self {
        Self {
            nominal: NOMINAL_230V,
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
        }
    }

    pub fn class_400() -> Self {
        Self {
            nominal: NOMINAL_400V,
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
        }
    }

    pub fn lower(&self) -> f64 {
        self.nominal * (1.0 - self.tolerance_percent / 100.0)
    }

    pub fn upper(&self) -> f64 {
        self.nominal * (1.0 + self.tolerance_percent / 100.0)
    }

    pub fn contains(&self, volts: f64) -> bool {
        volts >= self.lower() && volts <= self.upper()
    }
}

impl Default for VoltageBand {
    fn default() -> Self {
        Self::class_400()
    }
}

/// Default band plus per-device overrides.
#[derive(Debug, Clone, Default)]
pub struct VoltagePolicy {
    default_band: VoltageBand,
    per_device: HashMap<String, VoltageBand>,
}

impl VoltagePolicy {
    pub fn new(default_band: VoltageBand) -> Self {
        Self {
            default_band,
            per_device: HashMap::new(),
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>, band: VoltageBand) -> Self {
        self.per_device.insert(device_id.into(), band);
        self
    }

    pub fn band_for(&self, device_id: &str) -> VoltageBand {
        self.per_device
            .get(device_id)
            .copied()
            .unwrap_or(self.default_band)
    }

    /// Parse a `device=nominal` list, e.g. `"D1=230, D2=400"`.
    ///
    /// Every entry shares `tolerance_percent`. Blank entries are ignored.
    pub fn with_overrides(mut self, overrides: &str, tolerance_percent: f64) -> Result<Self, CoreError> {
        for entry in overrides.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (device, nominal) = entry.split_once('=').ok_or_else(|| {
                CoreError::Validation(format!("expected device=nominal, got '{entry}'"))
            })?;
            let device = device.trim();
            if device.is_empty() {
                return Err(CoreError::Validation(format!(
                    "missing device id in '{entry}'"
                )));
            }
            let nominal: f64 = nominal.trim().parse().map_err(|_| {
                CoreError::Validation(format!("invalid nominal voltage in '{entry}'"))
            })?;
            self.per_device.insert(
                device.to_string(),
                VoltageBand::new(nominal, tolerance_percent)?,
            );
        }
        Ok(self)
    }
}

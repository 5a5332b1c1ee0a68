//! Canonical telemetry reading produced by the ingestion normalizer.
//!
//! A [`Reading`] is immutable once built. Both payload shapes observed in
//! the field collapse into this one record (see [`crate::normalize`]).

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Number of pumps wired to a single station controller.
pub const PUMP_COUNT: usize = 2;

/// One of the three supply phases, labelled the way the panels label them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    R,
    Y,
    B,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::R, Phase::Y, Phase::B];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::R => "R",
            Phase::Y => "Y",
            Phase::B => "B",
        }
    }
}

/// A scalar per supply phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseValues {
    pub r: f64,
    pub y: f64,
    pub b: f64,
}

impl PhaseValues {
    pub fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::R => self.r,
            Phase::Y => self.y,
            Phase::B => self.b,
        }
    }

    pub fn set(&mut self, phase: Phase, value: f64) {
        match phase {
            Phase::R => self.r = value,
            Phase::Y => self.y = value,
            Phase::B => self.b = value,
        }
    }
}

/// Electrical and control-state telemetry for one pump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PumpTelemetry {
    /// RMS voltage per phase (V).
    pub voltage: PhaseValues,
    /// RMS current per phase (A).
    pub current: PhaseValues,
    /// Active power per phase (W).
    pub power: PhaseValues,
    /// Supply frequency per phase (Hz).
    pub frequency: PhaseValues,
    /// Accumulated energy counter per phase (VAh).
    pub energy: PhaseValues,
    pub manual_mode: bool,
    pub auto_mode: bool,
    pub contactor_feedback: bool,
    /// Run-hours counter reported by the controller.
    pub run_hours: f64,
}

/// The four alert / protection inputs wired into the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionFlags {
    pub dry_run: bool,
    pub high_level_float: bool,
    pub pump_1_protection: bool,
    pub pump_2_protection: bool,
}

/// One normalized telemetry sample from a device at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    /// Device-supplied event time, or ingestion time when absent/unparseable.
    pub timestamp: Timestamp,
    /// Display name reported by the device, if any.
    pub device_name: Option<String>,
    /// Free-text location reported by the device, if any.
    pub location: Option<String>,
    /// Hydrostatic water level.
    pub water_level: f64,
    /// Panel temperature (°C).
    pub temperature: f64,
    pub pumps: [PumpTelemetry; PUMP_COUNT],
    pub flags: ProtectionFlags,
    /// Original payload, retained verbatim for audit.
    pub raw: serde_json::Value,
}

impl Reading {
    /// Telemetry for pump `1` or `2`.
    pub fn pump(&self, pump: u8) -> Option<&PumpTelemetry> {
        usize::from(pump)
            .checked_sub(1)
            .and_then(|idx| self.pumps.get(idx))
    }
}

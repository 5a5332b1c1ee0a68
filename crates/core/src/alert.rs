//! Alert types produced by the evaluator and persisted after de-duplication.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Severity level of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Alert type. Each variant is its own de-duplication key per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    DryRun,
    HighWaterLevel,
    #[serde(rename = "pump_1_protection")]
    Pump1Protection,
    #[serde(rename = "pump_2_protection")]
    Pump2Protection,
    VoltageOutOfRange,
}

impl AlertKind {
    /// Stable storage / wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::DryRun => "dry_run",
            AlertKind::HighWaterLevel => "high_water_level",
            AlertKind::Pump1Protection => "pump_1_protection",
            AlertKind::Pump2Protection => "pump_2_protection",
            AlertKind::VoltageOutOfRange => "voltage_out_of_range",
        }
    }

    /// Protection alert kind for pump `1` or `2`.
    pub fn pump_protection(pump: u8) -> Option<Self> {
        match pump {
            1 => Some(AlertKind::Pump1Protection),
            2 => Some(AlertKind::Pump2Protection),
            _ => None,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry_run" => Ok(AlertKind::DryRun),
            "high_water_level" => Ok(AlertKind::HighWaterLevel),
            "pump_1_protection" => Ok(AlertKind::Pump1Protection),
            "pump_2_protection" => Ok(AlertKind::Pump2Protection),
            "voltage_out_of_range" => Ok(AlertKind::VoltageOutOfRange),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A stored string did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

/// A candidate alert produced by the evaluator, before de-duplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDraft {
    pub device_id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    /// Band limit that was crossed (voltage alerts only).
    pub threshold_value: Option<f64>,
    /// Observed value that crossed it (voltage alerts only).
    pub actual_value: Option<f64>,
    /// Timestamp of the reading that produced this draft.
    pub observed_at: Timestamp,
}

/// An accepted, persisted alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: DbId,
    pub device_id: String,
    #[serde(rename = "alert_type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub threshold_value: Option<f64>,
    pub actual_value: Option<f64>,
    /// Wall-clock acceptance time; cooldown windows are measured from here.
    pub timestamp: Timestamp,
    pub observed_at: Timestamp,
    pub acknowledged: bool,
    pub acknowledged_by: Option<DbId>,
    pub acknowledged_at: Option<Timestamp>,
}

impl Alert {
    /// Build the accepted alert for `draft`, stamped at `accepted_at`.
    pub fn from_draft(id: DbId, draft: &AlertDraft, accepted_at: Timestamp) -> Self {
        Self {
            id,
            device_id: draft.device_id.clone(),
            kind: draft.kind,
            severity: draft.severity,
            message: draft.message.clone(),
            threshold_value: draft.threshold_value,
            actual_value: draft.actual_value,
            timestamp: accepted_at,
            observed_at: draft.observed_at,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }
}

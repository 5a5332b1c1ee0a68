//! Alert rule evaluation.
//!
//! [`AlertEvaluator::evaluate`] inspects a single [`Reading`] and returns
//! every rule that fires. It holds no history; suppression of repeats is
//! the de-duplicator's job.

use crate::alert::{AlertDraft, AlertKind, Severity};
use crate::reading::{Phase, Reading, PUMP_COUNT};
use crate::voltage::{VoltageBand, VoltagePolicy};

/// Stateless rule engine. Owns the severity and voltage-band policy.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    voltage: VoltagePolicy,
}

impl AlertEvaluator {
    pub fn new(voltage: VoltagePolicy) -> Self {
        Self { voltage }
    }

    /// Every alert draft the reading triggers, in rule order.
    pub fn evaluate(&self, reading: &Reading) -> Vec<AlertDraft> {
        let mut drafts = Vec::new();
        let draft = |kind, severity, message: String| AlertDraft {
            device_id: reading.device_id.clone(),
            kind,
            severity,
            message,
            threshold_value: None,
            actual_value: None,
            observed_at: reading.timestamp,
        };

        if reading.flags.dry_run {
            drafts.push(draft(
                AlertKind::DryRun,
                Severity::Critical,
                "Dry run condition detected".to_string(),
            ));
        }

        if reading.flags.high_level_float {
            drafts.push(draft(
                AlertKind::HighWaterLevel,
                Severity::Warning,
                "High water level float triggered".to_string(),
            ));
        }

        for (pump, tripped) in [
            (1u8, reading.flags.pump_1_protection),
            (2u8, reading.flags.pump_2_protection),
        ] {
            if let (true, Some(kind)) = (tripped, AlertKind::pump_protection(pump)) {
                drafts.push(draft(
                    kind,
                    Severity::Critical,
                    format!("Pump {pump} protection tripped"),
                ));
            }
        }

        let band = self.voltage.band_for(&reading.device_id);
        for pump in 1..=PUMP_COUNT as u8 {
            let Some(telemetry) = reading.pump(pump) else {
                continue;
            };
            for phase in Phase::ALL {
                let volts = telemetry.voltage.get(phase);
                // Zero means the phase was not reported.
                if volts == 0.0 || band.contains(volts) {
                    continue;
                }
                drafts.push(AlertDraft {
                    threshold_value: Some(crossed_bound(&band, volts)),
                    actual_value: Some(volts),
                    ..draft(
                        AlertKind::VoltageOutOfRange,
                        Severity::Warning,
                        format!(
                            "Pump {pump} Phase {}: Voltage out of range ({volts}V, accepted {:.0}-{:.0}V)",
                            phase.as_str(),
                            band.lower(),
                            band.upper(),
                        ),
                    )
                });
            }
        }

        drafts
    }
}

/// The band limit a value fell outside of.
fn crossed_bound(band: &VoltageBand, volts: f64) -> f64 {
    if volts < band.lower() {
        band.lower()
    } else {
        band.upper()
    }
}

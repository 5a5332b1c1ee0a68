//! Ingestion normalizer: raw device payload -> canonical [`Reading`].
//!
//! Two payload shapes are in the field:
//!
//! - **flat**: one object with lower-snake-case fields
//!   (`{"device_id": "D1", "vrms_1_r": 231.0, "dry_run_alert": 1, ...}`)
//! - **nested**: envelope with `deviceId` / `timestamp` / `location` and an
//!   upper-case field dictionary under `data`
//!   (`{"deviceId": "D1", "data": {"VRMS_1_R": 231.0, "DryRunAlert": 1}}`)
//!
//! The shape is detected once, by presence of the `data` object, and then
//! mapped through that shape's [`FieldMap`]. Missing numbers become `0.0`,
//! missing flags become `false`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::reading::{Phase, PhaseValues, ProtectionFlags, PumpTelemetry, Reading, PUMP_COUNT};
use crate::types::Timestamp;

/// Why a payload could not be normalized.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("'data' section is present but is not an object")]
    InvalidDataSection,

    #[error("payload has no device identifier")]
    MissingDeviceId,
}

/// Detected payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Flat,
    Nested,
}

// ---------------------------------------------------------------------------
// Mapping tables
// ---------------------------------------------------------------------------

/// Source keys for one pump, phases ordered R, Y, B.
struct PumpFields {
    voltage: [&'static str; 3],
    current: [&'static str; 3],
    power: [&'static str; 3],
    frequency: [&'static str; 3],
    energy: [&'static str; 3],
    manual: &'static str,
    auto: &'static str,
    contactor: &'static str,
    /// `"ON"`/`"OFF"` run status read when `contactor` is absent.
    status: Option<&'static str>,
    run_hours: &'static str,
    protection: &'static str,
}

/// Source keys for one payload shape.
///
/// Envelope keys are read from the top-level object; metric keys are read
/// from the metrics object (top level for flat, `data` for nested).
struct FieldMap {
    device_id: &'static str,
    device_name: &'static str,
    location: &'static str,
    timestamp: &'static str,
    water_level: &'static str,
    temperature: &'static str,
    /// Single frequency applied to phases that report none of their own.
    shared_frequency: Option<&'static str>,
    dry_run: &'static str,
    high_level_float: &'static str,
    pumps: [PumpFields; PUMP_COUNT],
}

const FLAT_FIELDS: FieldMap = FieldMap {
    device_id: "device_id",
    device_name: "device_name",
    location: "location",
    timestamp: "timestamp",
    water_level: "hydrostatic_value",
    temperature: "temperature",
    shared_frequency: Some("frequency"),
    dry_run: "dry_run_alert",
    high_level_float: "high_level_float_alert",
    pumps: [
        PumpFields {
            voltage: ["vrms_1_r", "vrms_1_y", "vrms_1_b"],
            current: ["irms_1_r", "irms_1_y", "irms_1_b"],
            power: ["power_1_r", "power_1_y", "power_1_b"],
            frequency: ["freq_1_r", "freq_1_y", "freq_1_b"],
            energy: ["vahr_1_r", "vahr_1_y", "vahr_1_b"],
            manual: "pump_1_manual",
            auto: "pump_1_auto",
            contactor: "pump_1_contactor_feedback",
            status: Some("pump_1_status"),
            run_hours: "rhs_1",
            protection: "pump_1_protection",
        },
        PumpFields {
            voltage: ["vrms_2_r", "vrms_2_y", "vrms_2_b"],
            current: ["irms_2_r", "irms_2_y", "irms_2_b"],
            power: ["power_2_r", "power_2_y", "power_2_b"],
            frequency: ["freq_2_r", "freq_2_y", "freq_2_b"],
            energy: ["vahr_2_r", "vahr_2_y", "vahr_2_b"],
            manual: "pump_2_manual",
            auto: "pump_2_auto",
            contactor: "pump_2_contactor_feedback",
            status: Some("pump_2_status"),
            run_hours: "rhs_2",
            protection: "pump_2_protection",
        },
    ],
};

const NESTED_FIELDS: FieldMap = FieldMap {
    device_id: "deviceId",
    device_name: "deviceName",
    location: "location",
    timestamp: "timestamp",
    water_level: "Hydrostatic_Value",
    temperature: "Temperature",
    shared_frequency: None,
    dry_run: "DryRunAlert",
    high_level_float: "HighLevelFloatAlert",
    pumps: [
        PumpFields {
            voltage: ["VRMS_1_R", "VRMS_1_Y", "VRMS_1_B"],
            current: ["IRMS_1_R", "IRMS_1_Y", "IRMS_1_B"],
            power: ["POWER_1_R", "POWER_1_Y", "POWER_1_B"],
            frequency: ["FREQ_1_R", "FREQ_1_Y", "FREQ_1_B"],
            energy: ["VAHR_1_R", "VAHR_1_Y", "VAHR_1_B"],
            manual: "Pump_1_Manual",
            auto: "Pump_1_Auto",
            contactor: "Pump_1_Contactor_Feedback",
            status: None,
            run_hours: "RHS_1",
            protection: "Pump_1_Protection",
        },
        PumpFields {
            voltage: ["VRMS_2_R", "VRMS_2_Y", "VRMS_2_B"],
            current: ["IRMS_2_R", "IRMS_2_Y", "IRMS_2_B"],
            power: ["POWER_2_R", "POWER_2_Y", "POWER_2_B"],
            frequency: ["FREQ_2_R", "FREQ_2_Y", "FREQ_2_B"],
            energy: ["VAHR_2_R", "VAHR_2_Y", "VAHR_2_B"],
            manual: "Pump_2_Manual",
            auto: "Pump_2_Auto",
            contactor: "Pump_2_Contactor_Feedback",
            status: None,
            run_hours: "RHS_2",
            protection: "Pump_2_Protection",
        },
    ],
};

impl PayloadShape {
    fn fields(self) -> &'static FieldMap {
        match self {
            PayloadShape::Flat => &FLAT_FIELDS,
            PayloadShape::Nested => &NESTED_FIELDS,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Normalize a raw payload, falling back to the current time when the
/// payload carries no usable timestamp.
pub fn normalize(raw: &[u8]) -> Result<Reading, ParseError> {
    normalize_at(raw, Utc::now())
}

/// Normalize a raw payload received at `received_at`.
pub fn normalize_at(raw: &[u8], received_at: Timestamp) -> Result<Reading, ParseError> {
    let value: Value = serde_json::from_slice(raw)?;
    let root = value.as_object().ok_or(ParseError::NotAnObject)?;

    let (shape, metrics) = detect_shape(root)?;
    let fields = shape.fields();

    let device_id = device_id(root.get(fields.device_id)).ok_or(ParseError::MissingDeviceId)?;
    let timestamp = root
        .get(fields.timestamp)
        .and_then(parse_timestamp)
        .unwrap_or(received_at);

    let shared_frequency = fields
        .shared_frequency
        .and_then(|key| number(metrics, key));

    let mut pumps: [PumpTelemetry; PUMP_COUNT] = Default::default();
    for (pump, keys) in pumps.iter_mut().zip(&fields.pumps) {
        *pump = map_pump(metrics, keys, shared_frequency);
    }

    let flags = ProtectionFlags {
        dry_run: flag(metrics, fields.dry_run),
        high_level_float: flag(metrics, fields.high_level_float),
        pump_1_protection: flag(metrics, fields.pumps[0].protection),
        pump_2_protection: flag(metrics, fields.pumps[1].protection),
    };

    Ok(Reading {
        device_id,
        timestamp,
        device_name: text(root.get(fields.device_name)),
        location: text(root.get(fields.location)),
        water_level: number(metrics, fields.water_level).unwrap_or(0.0),
        temperature: number(metrics, fields.temperature).unwrap_or(0.0),
        pumps,
        flags,
        raw: value.clone(),
    })
}

/// Decide the payload shape and return the object that holds its metrics.
fn detect_shape(root: &Map<String, Value>) -> Result<(PayloadShape, &Map<String, Value>), ParseError> {
    match root.get("data") {
        Some(Value::Object(data)) => Ok((PayloadShape::Nested, data)),
        Some(Value::Null) | None => Ok((PayloadShape::Flat, root)),
        Some(_) => Err(ParseError::InvalidDataSection),
    }
}

fn map_pump(
    metrics: &Map<String, Value>,
    keys: &PumpFields,
    shared_frequency: Option<f64>,
) -> PumpTelemetry {
    let phases = |names: &[&'static str; 3], fallback: Option<f64>| {
        let mut values = PhaseValues::default();
        for (phase, key) in Phase::ALL.iter().zip(names) {
            let v = number(metrics, key).or(fallback).unwrap_or(0.0);
            values.set(*phase, v);
        }
        values
    };

    PumpTelemetry {
        voltage: phases(&keys.voltage, None),
        current: phases(&keys.current, None),
        power: phases(&keys.power, None),
        frequency: phases(&keys.frequency, shared_frequency),
        energy: phases(&keys.energy, None),
        manual_mode: flag(metrics, keys.manual),
        auto_mode: flag(metrics, keys.auto),
        contactor_feedback: contactor(metrics, keys),
        run_hours: number(metrics, keys.run_hours).unwrap_or(0.0),
    }
}

// ---------------------------------------------------------------------------
// Field decoders
// ---------------------------------------------------------------------------

fn device_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// A JSON number or numeric string. Anything else counts as missing.
fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    let v = match map.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// `1`/`0`, `true`/`false`, or their string forms.
fn flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on"
        ),
        _ => false,
    }
}

/// Contactor feedback, or the pump's run status when the feedback key is
/// not reported.
fn contactor(metrics: &Map<String, Value>, keys: &PumpFields) -> bool {
    match keys.status {
        Some(status) if !metrics.contains_key(keys.contactor) => flag(metrics, status),
        _ => flag(metrics, keys.contactor),
    }
}

/// Naive formats interpreted as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Epoch values at or above this are milliseconds (year ~5138 in seconds).
const EPOCH_MILLIS_THRESHOLD: u64 = 100_000_000_000;

fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NAIVE_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => {
            let epoch = n.as_i64()?;
            if epoch.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD {
                DateTime::from_timestamp_millis(epoch)
            } else {
                DateTime::from_timestamp(epoch, 0)
            }
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Domain logic for the pump-station telemetry pipeline.
//!
//! Everything in this crate is pure: payload normalization, alert rule
//! evaluation, voltage bands and topic parsing. I/O lives in the `db`,
//! `mqtt`, `events` and `api` crates.

pub mod alert;
pub mod error;
pub mod evaluator;
pub mod normalize;
pub mod reading;
pub mod topic;
pub mod types;
pub mod voltage;

pub use alert::{Alert, AlertDraft, AlertKind, Severity};
pub use evaluator::AlertEvaluator;
pub use normalize::{normalize, normalize_at, ParseError};
pub use reading::{Phase, PhaseValues, ProtectionFlags, PumpTelemetry, Reading};
pub use voltage::{VoltageBand, VoltagePolicy};

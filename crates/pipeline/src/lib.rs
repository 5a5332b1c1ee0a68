//! Ingestion orchestration.
//!
//! [`Pipeline`] is the transport's message handler. For each payload it
//! normalizes, persists, pushes the reading live, evaluates alert rules and
//! runs every draft through the [`AlertDeduplicator`]. Work for one device
//! is serialized by [`DeviceLocks`]; different devices proceed in parallel.

pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fanout;
pub mod ingest;
pub mod locks;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PipelineConfig;
pub use dedup::AlertDeduplicator;
pub use error::PipelineError;
pub use fanout::LiveFanOut;
pub use ingest::{IngestOutcome, Pipeline};
pub use locks::DeviceLocks;

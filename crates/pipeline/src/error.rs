use pumpwatch_core::ParseError;
use pumpwatch_db::PersistenceError;

/// Why a message or a single alert draft was dropped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Malformed payload: {0}")]
    Parse(#[from] ParseError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

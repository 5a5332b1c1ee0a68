//! Concrete notification transports.

pub mod email;
pub mod webhook;

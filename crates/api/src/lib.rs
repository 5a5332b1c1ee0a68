//! Pumpwatch server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! live WebSocket hub) so the binary and the integration tests assemble the
//! same application.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

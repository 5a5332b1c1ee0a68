//! Authentication primitives for live sessions.
//!
//! - [`jwt`] -- HS256 access-token generation and validation.
//! - [`users`] -- the user store consulted once per live connection.

pub mod jwt;
pub mod users;

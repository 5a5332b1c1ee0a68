//! Row structs for each table.
//!
//! Rows stay close to the schema; conversions into the domain types in
//! `pumpwatch-core` live next to them.

pub mod alert;
pub mod device;
pub mod reading;
pub mod user;

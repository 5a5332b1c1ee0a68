//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a `&mut PgConnection` inside a transaction) as the
//! first argument.

pub mod alert_repo;
pub mod device_repo;
pub mod reading_repo;
pub mod user_repo;

pub use alert_repo::AlertRepo;
pub use device_repo::DeviceRepo;
pub use reading_repo::ReadingRepo;
pub use user_repo::UserRepo;

mod handler;
mod keepalive;
pub mod hub;
pub mod protocol;

pub use handler::ws_handler;
pub use hub::{LiveHub, PingSweep};
pub use keepalive::{spawn_keepalive, KEEPALIVE_INTERVAL};

pub mod config;
pub mod controller;

pub use config::Tally;
pub use controller::{Mode, SHUTDOWN_BROADCAST};

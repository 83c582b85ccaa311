//! System-level modules
//!
//! - Logging initialization
//! - Connection / download counters and the periodic health logger
//! - TLS certificate loading (feature `tls`)

pub mod counters;
pub mod health;
pub mod logging;
#[cfg(feature = "tls")]
pub mod tls;

pub use counters::{ServerStats, StatsSnapshot};

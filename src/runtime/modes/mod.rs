//! Execution modes
//!
//! Only the HTTP server mode exists; it serves plain HTTP and, in production
//! with certificates configured, HTTPS.

pub mod server;

pub use server::run_server;

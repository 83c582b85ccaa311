//! Sumatra website - static site server for the Sumatra PDF reader homepage
//!
//! Serves the site from a content root with legacy redirects, routes
//! downloads to local files or remote storage, tracks tool-link clicks and
//! ships structured logs to a bulk ingestion endpoint.
//!
//! # Features
//! - **tls**: HTTPS listener in production mode (default)
//! - **mem-stats**: process memory in the periodic health log (default)
//!
//! # Architecture
//! - `site`: path resolution, redirect table, download routing, tool links
//! - `analytics`: click log and aggregate counts
//! - `telemetry`: batching remote log client
//! - `api`: HTTP handlers and middleware
//! - `config`: configuration loading and CLI flags
//! - `runtime`: application lifecycle and server mode
//! - `services`: outbound notifications
//! - `system`: logging, counters, health logger, TLS

pub mod analytics;
pub mod api;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod site;
pub mod system;
pub mod telemetry;
pub mod utils;

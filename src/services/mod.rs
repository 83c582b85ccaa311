//! Outbound services used by the server runtime

pub mod notify;

pub use notify::{Notification, Notifier, SparkPostNotifier, startup_notification};

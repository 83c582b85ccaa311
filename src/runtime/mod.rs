//! Application lifecycle and the server entry point

pub mod lifetime;
pub mod modes;

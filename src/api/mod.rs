//! API Module
//!
//! Stable command surface consumed by the UI host.
//! - `commands.rs`: current implementation

pub mod commands;

pub use commands::*;

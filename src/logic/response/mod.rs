//! Response Module
//!
//! Hành động can thiệp lên live OS state. Hiện tại: tiered termination.
//! Respawn prevention sống ở `logic::suppression`.

pub mod terminate;

pub use terminate::{terminate_tree, PidOutcome, TerminationReport, TerminationResult};

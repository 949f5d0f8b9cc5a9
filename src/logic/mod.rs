//! Logic Module - Engines
//!
//! Chứa các engines xử lý: Collector (scan cycle), Process Intel (facts +
//! description), Safety (tier classification), Response (termination),
//! Suppression (respawn prevention).
//!
//! Data flow: process_intel -> safety -> { response, suppression }.
//! Tier của safety classifier gate cả hai nhánh downstream.

pub mod collector;
pub mod config;
pub mod oscmd;
pub mod process_intel;
pub mod response;
pub mod safety;
pub mod suppression;

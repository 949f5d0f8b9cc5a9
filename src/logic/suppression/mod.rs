//! Suppression Module - Reversible respawn prevention
//!
//! Chặn một process tự khởi động lại qua bốn cơ chế: service start mode,
//! registry run key, scheduled task, IFEO debugger block. Mọi mutation đều
//! reversible từ captured snapshot và được ghi vào durable log.
//!
//! ## Structure
//! - `types`: target / captured-state / entry / error types
//! - `backend`: the one polymorphic snapshot-apply-restore seam (4 variants)
//! - `store`: durable JSON store (survives host restarts)
//! - `audit`: append-only JSONL trail, written before every attempt
//! - `manager`: invariants (idempotence, at-most-one-Active, tier policy)

pub mod audit;
pub mod backend;
pub mod manager;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use manager::SuppressionManager;
pub use types::{
    CapturedState, Mechanism, RegistryHive, ServiceStartMode, SuppressTarget, SuppressionEntry,
    SuppressionError, SuppressionStatus,
};

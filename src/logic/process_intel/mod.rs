//! Process Intelligence Module
//!
//! Fact base + description resolution + snapshot arena cho mỗi scan cycle.
//!
//! ## Structure
//! - `types`: ProcessRecord, SignatureStatus, Description, ClassifiedSnapshot
//! - `facts`: static knowledge of known executables (pure data)
//! - `describe`: the description resolver (pure function)
//! - `snapshot`: immutable per-cycle arena with bounded tree walks
//! - `providers`: external signature / metadata collaborators

pub mod describe;
pub mod facts;
pub mod providers;
pub mod snapshot;
pub mod types;

pub use snapshot::ProcessSnapshot;
pub use types::{
    ClassifiedProcess, ClassifiedSnapshot, Confidence, Description, ProcessRecord, SignatureStatus,
};

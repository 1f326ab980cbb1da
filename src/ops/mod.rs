//! High-level operations.
//!
//! The coordinator and the pieces it drives at bootstrap time.

pub mod coordinator;
pub mod hooks;
pub mod inclusion;

pub use coordinator::{Coordinator, CoordinatorStats};
pub use hooks::HostEvent;
pub use inclusion::{
    group_init_files, FnExecutor, InclusionGate, InclusionLedger, InclusionReport,
    InclusionSentinel, InitCandidate, InitExecutor, InitGroup, RecordingExecutor, SharedSentinel,
};

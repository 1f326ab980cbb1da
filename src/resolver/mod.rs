//! Conflict resolution.
//!
//! Decides which directory serves each shared-namespace prefix when several
//! modules bundle the same package. The resolver is pure and deterministic -
//! all I/O (manifests, package index) happens before resolution.

pub mod resolve;
pub mod version;

pub use resolve::{resolve, select_path, Reason, Resolution, ResolvedMapping};
pub use version::Version;

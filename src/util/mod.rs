//! Shared utilities

pub mod config;
pub mod fs;
pub mod hash;

pub use config::{CoordinatorConfig, HostConfig};
pub use fs::ArtifactError;

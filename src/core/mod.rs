//! Core data structures for the coordinator.
//!
//! This module contains the foundational types used throughout the crate:
//! - Module registrations and the registry that orders them
//! - Per-module autoload manifests and their memoizing reader

pub mod manifest;
pub mod module;
pub mod registry;

pub use manifest::{ClassMap, InitFiles, Manifest, ManifestReader, NamespaceMap};
pub use module::{Module, ModuleConfig};
pub use registry::Registry;

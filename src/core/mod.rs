//! Core data structures for bosun.
//!
//! - Project context (root directory, path resolution)
//! - Project descriptor (package.json with vendor fields)

pub mod context;
pub mod pkg;

pub use context::ProjectContext;
pub use pkg::{check_engine, resolve_descriptor, BosunPlugins, Engines, ProjectDescriptor};

//! Bosun - a plugin-based build orchestrator for web projects
//!
//! This crate provides the core library functionality for bosun: layered
//! configuration resolution, ordered plugin composition, command dispatch,
//! and final bundler-configuration materialization.

pub mod config;
pub mod core;
pub mod env;
pub mod options;
pub mod plugin;
pub mod service;
pub mod util;

pub use crate::config::{ChainedConfig, RawConfig};
pub use crate::core::{ProjectContext, ProjectDescriptor};
pub use crate::env::EnvStore;
pub use crate::options::ProjectOptions;
pub use crate::plugin::{PluginLoader, ServicePlugin};
pub use crate::service::{
    Command, CommandArgs, PluginApi, ResolvedConfig, Service, ServiceError, ServiceOptions,
};
pub use crate::util::Shell;

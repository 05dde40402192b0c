//! Shared utilities

pub mod shell;

pub use shell::Shell;

//! CLI definitions using clap.
//!
//! Commands are registered dynamically by plugins, so the outer parser
//! only collects the trailing argument list; dispatch and per-command
//! flag handling happen inside the service.

use clap::Parser;

/// Bosun - a plugin-based build orchestrator for web projects
#[derive(Parser)]
#[command(name = "bosun")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true, disable_help_subcommand = true)]
pub struct Cli {
    /// Command name followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

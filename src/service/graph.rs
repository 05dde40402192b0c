//! Build-graph accumulator.
//!
//! Collects every plugin contribution during initialization: chainable
//! config mutators, raw config mutators, dev-server config mutators, and
//! command registrations. Append-only during `init`, read-only afterwards.

use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;

use crate::config::{ChainFn, DevServerFn, RawConfig};
use crate::service::{CommandArgs, Service};

/// A command function: receives the initialized service, parsed args, and
/// the raw argument list.
pub type CommandFn = Arc<dyn Fn(&Service, &CommandArgs, &[String]) -> Result<()> + Send + Sync>;

/// A registered command.
#[derive(Clone)]
pub struct Command {
    pub run: CommandFn,
    pub description: String,
    pub usage: Option<String>,
    /// Flag name and description pairs, in registration order.
    pub options: Vec<(String, String)>,
}

impl Command {
    pub fn new(
        description: impl Into<String>,
        run: impl Fn(&Service, &CommandArgs, &[String]) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Command {
            run: Arc::new(run),
            description: description.into(),
            usage: None,
            options: Vec::new(),
        }
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_option(mut self, flag: impl Into<String>, description: impl Into<String>) -> Self {
        self.options.push((flag.into(), description.into()));
        self
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("description", &self.description)
            .field("usage", &self.usage)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// The accumulated build graph.
#[derive(Default)]
pub struct BuildGraph {
    pub chain_fns: Vec<ChainFn>,
    pub raw_fns: Vec<RawConfig>,
    pub dev_server_fns: Vec<DevServerFn>,
    pub commands: IndexMap<String, Command>,
}

// Closures are not Debug; summarize counts instead.
impl std::fmt::Debug for BuildGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildGraph")
            .field("chain_fns", &self.chain_fns.len())
            .field("raw_fns", &self.raw_fns.len())
            .field("dev_server_fns", &self.dev_server_fns.len())
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

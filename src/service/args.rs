//! Command-line argument parsing for dispatched commands.
//!
//! The outer binary hands the full trailing argument list through
//! unparsed; each command interprets it minimist-style. A small set of
//! flags is declared boolean so that `--watch build.txt` keeps
//! `build.txt` as a positional instead of a flag value.

use std::collections::BTreeMap;

use serde_json::Value;

/// Flags parsed as booleans regardless of what follows them.
const BOOLEAN_FLAGS: &[&str] = &[
    "modern",
    "report",
    "report-json",
    "inline-runtime",
    "watch",
    "open",
    "copy",
    "https",
    "verbose",
    "help",
    "h",
];

/// Parsed command arguments.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    /// Non-flag arguments, in order. The command name itself is stripped
    /// before dispatch.
    pub positionals: Vec<String>,
    pub flags: BTreeMap<String, Value>,
}

impl CommandArgs {
    /// Parse a raw argument list.
    ///
    /// `--flag value` assigns, `--flag=value` assigns, `--flag` followed by
    /// another flag (or declared boolean) is `true`, `--no-flag` is `false`,
    /// `-abc` sets `a`, `b`, and `c`.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CommandArgs::default();
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            if let Some(name) = arg.strip_prefix("--") {
                if let Some((name, value)) = name.split_once('=') {
                    parsed.flags.insert(name.to_string(), coerce(value));
                } else if let Some(name) = name.strip_prefix("no-") {
                    parsed.flags.insert(name.to_string(), Value::Bool(false));
                } else if BOOLEAN_FLAGS.contains(&name) {
                    parsed.flags.insert(name.to_string(), Value::Bool(true));
                } else if let Some(next) = args.get(i + 1).filter(|n| !n.starts_with('-')) {
                    parsed.flags.insert(name.to_string(), coerce(next));
                    i += 1;
                } else {
                    parsed.flags.insert(name.to_string(), Value::Bool(true));
                }
            } else if let Some(cluster) = arg.strip_prefix('-') {
                if !cluster.is_empty() {
                    for short in cluster.chars() {
                        parsed
                            .flags
                            .insert(short.to_string(), Value::Bool(true));
                    }
                }
            } else {
                parsed.positionals.push(arg.clone());
            }
            i += 1;
        }
        parsed
    }

    /// Flag value as a boolean, treating any non-false presence as set.
    pub fn bool(&self, name: &str) -> bool {
        match self.flags.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    /// Flag value as a string, if present and string-valued.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(Value::as_str)
    }

    /// The command name: the first positional, if any.
    pub fn command(&self) -> Option<&str> {
        self.positionals.first().map(String::as_str)
    }

    /// Drop the leading command-name positional before handing args to a
    /// command implementation.
    pub fn without_command(mut self) -> Self {
        if !self.positionals.is_empty() {
            self.positionals.remove(0);
        }
        self
    }
}

fn coerce(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = value.parse::<i64>() {
                Value::Number(n.into())
            } else {
                Value::String(value.to_string())
            }
        }
    }
}

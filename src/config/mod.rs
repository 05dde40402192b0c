//! Bundler configuration representations.
//!
//! The chainable form is mutated by plugins during initialization; the raw
//! form is a plain JSON document produced by `to_config()` and folded with
//! raw mutators via deep merge.

pub mod chain;
pub mod merge;

use serde_json::Value;

pub use chain::{ChainedConfig, ChainedRule};
pub use merge::{merge, merge_into};

/// A chainable-config mutator function.
pub type ChainFn = Box<dyn Fn(&mut ChainedConfig) + Send + Sync>;

/// A dev-server-config mutator function.
pub type DevServerFn = Box<dyn Fn(&mut Value) + Send + Sync>;

/// A raw-config mutator: either a function that mutates the config in place
/// (optionally returning a partial object to merge), or a literal partial
/// object to merge.
pub enum RawConfig {
    Func(Box<dyn Fn(&mut Value) -> Option<Value> + Send + Sync>),
    Literal(Value),
}

impl std::fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawConfig::Func(_) => f.write_str("RawConfig::Func"),
            RawConfig::Literal(v) => f.debug_tuple("RawConfig::Literal").field(v).finish(),
        }
    }
}

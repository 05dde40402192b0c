//! Built-in plugins.
//!
//! Command registrars come first so config contributors can assume the
//! command set is known, then the config contributors in dependency order.

pub mod app;
pub mod base;
pub mod build;
pub mod css;
pub mod help;
pub mod inspect;
pub mod prod;
pub mod serve;

use crate::plugin::ServicePlugin;

/// Every built-in plugin, in application order.
pub fn all() -> Vec<ServicePlugin> {
    vec![
        serve::plugin(),
        build::plugin(),
        inspect::plugin(),
        help::plugin(),
        base::plugin(),
        css::plugin(),
        prod::plugin(),
        app::plugin(),
    ]
}

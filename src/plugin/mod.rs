//! Plugin registry and discovery.
//!
//! A plugin is a loadable unit contributing commands and/or configuration
//! mutators. The ordered plugin list is built once at service construction:
//! built-ins first (command registrars before config contributors), then
//! project-declared plugins from the descriptor's dependency maps, then
//! local file plugins from `bosunPlugins.service`.

pub mod builtin;
pub mod loader;
pub mod resolution;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::core::ProjectDescriptor;
use crate::options::ProjectOptions;
use crate::service::PluginApi;
use crate::util::Shell;

pub use loader::{FsPluginLoader, PluginLoader, PluginManifest, PLUGIN_MANIFEST};
pub use resolution::{is_plugin, matches_plugin_id, resolve_plugin_id, to_short_plugin_id};

/// The apply function every plugin implements.
pub type ApplyFn =
    Arc<dyn Fn(&mut PluginApi<'_>, &ProjectOptions) -> Result<()> + Send + Sync>;

/// A resolved plugin: an origin-namespaced id plus its apply function and
/// the default modes it declares for the commands it registers.
#[derive(Clone)]
pub struct ServicePlugin {
    pub id: String,
    pub apply: ApplyFn,
    pub default_modes: HashMap<String, String>,
}

impl ServicePlugin {
    pub fn new(
        id: impl Into<String>,
        apply: impl Fn(&mut PluginApi<'_>, &ProjectOptions) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        ServicePlugin {
            id: id.into(),
            apply: Arc::new(apply),
            default_modes: HashMap::new(),
        }
    }

    /// Plugin that contributes nothing. Stands in for unavailable optional
    /// dependencies.
    pub fn noop(id: impl Into<String>) -> Self {
        ServicePlugin::new(id, |_api, _options| Ok(()))
    }

    /// Declare the default mode for a command this plugin registers.
    pub fn with_default_mode(
        mut self,
        command: impl Into<String>,
        mode: impl Into<String>,
    ) -> Self {
        self.default_modes.insert(command.into(), mode.into());
        self
    }
}

impl std::fmt::Debug for ServicePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePlugin")
            .field("id", &self.id)
            .field("default_modes", &self.default_modes)
            .finish_non_exhaustive()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolve the ordered plugin list.
///
/// Inline plugins replace descriptor discovery entirely; with
/// `use_built_in == false` they also replace the built-ins (mostly for
/// tests). Local plugins from `bosunPlugins.service` are always appended
/// last.
pub fn resolve_plugins(
    pkg: &ProjectDescriptor,
    loader: &dyn PluginLoader,
    inline: Option<Vec<ServicePlugin>>,
    use_built_in: bool,
    shell: &Shell,
) -> Result<Vec<ServicePlugin>> {
    let mut plugins = if let Some(inline) = inline {
        if use_built_in {
            let mut plugins = builtin::all();
            plugins.extend(inline);
            plugins
        } else {
            inline
        }
    } else {
        let mut plugins = builtin::all();
        // Dev entries first, then regular; duplicates are intentionally kept
        // so later resolution order matches declaration order.
        let project_ids = pkg
            .dev_dependencies
            .keys()
            .chain(pkg.dependencies.keys())
            .filter(|id| is_plugin(id));
        for id in project_ids {
            if pkg.optional_dependencies.contains_key(id) {
                match loader.load(id) {
                    Ok(plugin) => plugins.push(plugin),
                    Err(_) => {
                        shell.warn(format!("Optional dependency {} is not installed.", id));
                        plugins.push(ServicePlugin::noop(id.clone()));
                    }
                }
            } else {
                let plugin = loader
                    .load(id)
                    .with_context(|| format!("failed to load plugin {}", id))?;
                plugins.push(plugin);
            }
        }
        plugins
    };

    if let Some(files) = pkg
        .bosun_plugins
        .as_ref()
        .and_then(|bp| bp.service.as_ref())
    {
        let Some(files) = files.as_array() else {
            return Err(crate::service::ServiceError::InvalidLocalPluginList(
                json_type_name(files).to_string(),
            )
            .into());
        };
        for file in files {
            let Some(path) = file.as_str() else {
                return Err(crate::service::ServiceError::InvalidLocalPluginList(
                    json_type_name(file).to_string(),
                )
                .into());
            };
            let plugin = loader
                .load_local(path)
                .with_context(|| format!("failed to load local plugin {}", path))?;
            plugins.push(plugin);
        }
    }

    Ok(plugins)
}

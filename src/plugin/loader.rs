//! Plugin loading.
//!
//! Built-in plugins come from a compile-time table; everything else is
//! loaded at runtime through the `PluginLoader` trait. The filesystem
//! loader reads a declarative `bosun-plugin.toml` manifest from the plugin
//! package (or from a local plugin file), declaring default modes and
//! configuration fragments to contribute.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::config::merge_into;
use crate::plugin::ServicePlugin;

/// Manifest file name inside a plugin package.
pub const PLUGIN_MANIFEST: &str = "bosun-plugin.toml";

/// Declarative plugin manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginManifest {
    /// Default mode per registered command name.
    pub default_modes: IndexMap<String, String>,

    /// Raw-config fragment to deep-merge into the final configuration.
    pub configure_webpack: Option<toml::Value>,

    /// Dev-server-config fragment to deep-merge.
    pub configure_dev_server: Option<toml::Value>,
}

impl PluginManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plugin manifest {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse plugin manifest {}", path.display()))
    }

    /// Build a service plugin applying this manifest's contributions.
    pub fn into_plugin(self, id: impl Into<String>) -> Result<ServicePlugin> {
        let id = id.into();
        let configure_webpack: Option<Value> = self
            .configure_webpack
            .map(serde_json::to_value)
            .transpose()
            .with_context(|| format!("invalid configureWebpack fragment in plugin {}", id))?;
        let configure_dev_server: Option<Value> = self
            .configure_dev_server
            .map(serde_json::to_value)
            .transpose()
            .with_context(|| format!("invalid configureDevServer fragment in plugin {}", id))?;

        let mut plugin = ServicePlugin::new(id, move |api, _options| {
            if let Some(fragment) = &configure_webpack {
                api.configure_webpack(fragment.clone());
            }
            if let Some(fragment) = &configure_dev_server {
                let fragment = fragment.clone();
                api.configure_dev_server(move |config| {
                    merge_into(config, fragment.clone());
                });
            }
            Ok(())
        });
        for (command, mode) in self.default_modes {
            plugin = plugin.with_default_mode(command, mode);
        }
        Ok(plugin)
    }
}

/// Runtime plugin loading behind one interface, so discovery does not care
/// whether an id maps to a package directory or a local file.
pub trait PluginLoader: Send + Sync {
    /// Load a plugin package by canonical id.
    fn load(&self, id: &str) -> Result<ServicePlugin>;

    /// Load a local plugin file declared in the descriptor, relative to the
    /// (possibly redirected) descriptor root.
    fn load_local(&self, path: &str) -> Result<ServicePlugin>;
}

/// Loads plugin manifests from `node_modules` and local files.
#[derive(Debug, Clone)]
pub struct FsPluginLoader {
    root: PathBuf,
}

impl FsPluginLoader {
    /// Create a loader rooted at the descriptor directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsPluginLoader { root: root.into() }
    }
}

impl PluginLoader for FsPluginLoader {
    fn load(&self, id: &str) -> Result<ServicePlugin> {
        let manifest_path = self.root.join("node_modules").join(id).join(PLUGIN_MANIFEST);
        if !manifest_path.exists() {
            anyhow::bail!("plugin {} is not installed (no {})", id, manifest_path.display());
        }
        PluginManifest::load(&manifest_path)?.into_plugin(id)
    }

    fn load_local(&self, path: &str) -> Result<ServicePlugin> {
        let file = self.root.join(path);
        let manifest = PluginManifest::load(&file)?;
        manifest.into_plugin(format!("local:{}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_parses_fragments() {
        let manifest: PluginManifest = toml::from_str(
            r#"
[defaultModes]
lint = "development"

[configureWebpack.output]
publicPath = "/lint/"
"#,
        )
        .unwrap();

        assert_eq!(manifest.default_modes.get("lint").unwrap(), "development");
        let plugin = manifest.into_plugin("bosun-plugin-lint").unwrap();
        assert_eq!(plugin.id, "bosun-plugin-lint");
        assert_eq!(
            plugin.default_modes.get("lint").map(String::as_str),
            Some("development")
        );
    }

    #[test]
    fn test_fs_loader_missing_package() {
        let tmp = TempDir::new().unwrap();
        let loader = FsPluginLoader::new(tmp.path());
        assert!(loader.load("bosun-plugin-missing").is_err());
    }

    #[test]
    fn test_fs_loader_reads_manifest() {
        let tmp = TempDir::new().unwrap();
        let pkg_dir = tmp.path().join("node_modules/bosun-plugin-demo");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(
            pkg_dir.join(PLUGIN_MANIFEST),
            "[configureWebpack]\ndevtool = \"eval\"\n",
        )
        .unwrap();

        let loader = FsPluginLoader::new(tmp.path());
        let plugin = loader.load("bosun-plugin-demo").unwrap();
        assert_eq!(plugin.id, "bosun-plugin-demo");
    }

    #[test]
    fn test_local_plugin_id_prefix() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("my-plugin.toml"), "[defaultModes]\n").unwrap();

        let loader = FsPluginLoader::new(tmp.path());
        let plugin = loader.load_local("my-plugin.toml").unwrap();
        assert_eq!(plugin.id, "local:my-plugin.toml");
    }
}

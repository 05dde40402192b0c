//! The API handed to each plugin's apply function.
//!
//! Scoped to one plugin id, writing into the service's build graph.

use std::path::PathBuf;

use semver::{Version, VersionReq};
use serde_json::Value;

use crate::config::{ChainedConfig, RawConfig};
use crate::plugin::matches_plugin_id;
use crate::service::{Command, Service};

pub struct PluginApi<'a> {
    id: String,
    service: &'a mut Service,
}

impl<'a> PluginApi<'a> {
    pub(crate) fn new(id: impl Into<String>, service: &'a mut Service) -> Self {
        PluginApi {
            id: id.into(),
            service,
        }
    }

    /// The id of the plugin this API instance is scoped to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The project root directory.
    pub fn context_root(&self) -> &std::path::Path {
        self.service.context().root()
    }

    /// Resolve a path relative to the project root.
    pub fn resolve(&self, path: impl AsRef<std::path::Path>) -> PathBuf {
        self.service.context().resolve(path)
    }

    /// The mode the service was initialized with.
    pub fn mode(&self) -> Option<&str> {
        self.service.mode()
    }

    /// Register a named command. Later registrations under the same name
    /// replace earlier ones.
    pub fn register_command(&mut self, name: impl Into<String>, command: Command) {
        self.service.graph.commands.insert(name.into(), command);
    }

    /// Register a chainable-config mutator.
    pub fn chain_webpack(
        &mut self,
        f: impl Fn(&mut ChainedConfig) + Send + Sync + 'static,
    ) {
        self.service.graph.chain_fns.push(Box::new(f));
    }

    /// Register a raw-config fragment to deep-merge into the final
    /// configuration after all chain mutators have run.
    pub fn configure_webpack(&mut self, fragment: Value) {
        self.service.graph.raw_fns.push(RawConfig::Literal(fragment));
    }

    /// Register a raw-config mutator closure. Returning a fragment merges
    /// it on top of the (possibly mutated) config.
    pub fn configure_webpack_fn(
        &mut self,
        f: impl Fn(&mut Value) -> Option<Value> + Send + Sync + 'static,
    ) {
        self.service.graph.raw_fns.push(RawConfig::Func(Box::new(f)));
    }

    /// Register a dev-server-config mutator.
    pub fn configure_dev_server(
        &mut self,
        f: impl Fn(&mut Value) + Send + Sync + 'static,
    ) {
        self.service.graph.dev_server_fns.push(Box::new(f));
    }

    /// Whether the project uses a plugin, by full or short id.
    pub fn has_plugin(&self, id: &str) -> bool {
        self.service
            .plugins()
            .iter()
            .any(|p| matches_plugin_id(id, &p.id))
    }

    /// The version of a dependency as declared in the project descriptor,
    /// with any range prefix (`^`, `~`, `>=`) stripped.
    pub fn used_version(&self, name: &str) -> Option<String> {
        let declared = self.service.pkg().declared_version(name)?;
        Some(
            declared
                .trim_start_matches(['^', '~', '>', '=', '<'])
                .to_string(),
        )
    }

    /// Whether a declared dependency version satisfies a semver range.
    pub fn version_satisfies(&self, name: &str, range: &str) -> bool {
        let Some(version) = self.used_version(name) else {
            return false;
        };
        match (Version::parse(&version), VersionReq::parse(range)) {
            (Ok(version), Ok(req)) => req.matches(&version),
            _ => false,
        }
    }

    /// The directory holding the resolved project descriptor. Differs from
    /// the context root when the descriptor redirects via `resolveFrom`.
    pub fn pkg_root(&self) -> &std::path::Path {
        self.service.pkg_root()
    }

    /// The resolved project descriptor.
    pub fn pkg(&self) -> &crate::core::ProjectDescriptor {
        self.service.pkg()
    }

    /// The environment store for this invocation.
    pub fn env(&self) -> &crate::env::EnvStore {
        self.service.env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceOptions;

    fn service_with_pkg(json: &str) -> Service {
        let pkg = serde_json::from_str(json).unwrap();
        Service::new(
            std::env::temp_dir(),
            ServiceOptions::default().with_pkg(pkg),
        )
        .unwrap()
    }

    #[test]
    fn test_used_version_strips_range_prefix() {
        let mut service = service_with_pkg(
            r#"{ "dependencies": { "left-pad": "^1.3.0" } }"#,
        );
        let api = PluginApi::new("test", &mut service);
        assert_eq!(api.used_version("left-pad").as_deref(), Some("1.3.0"));
        assert_eq!(api.used_version("missing"), None);
    }

    #[test]
    fn test_version_satisfies() {
        let mut service = service_with_pkg(
            r#"{ "devDependencies": { "typescript": "~5.2.1" } }"#,
        );
        let api = PluginApi::new("test", &mut service);
        assert!(api.version_satisfies("typescript", ">=5"));
        assert!(!api.version_satisfies("typescript", "<5"));
        assert!(!api.version_satisfies("missing", "*"));
    }
}

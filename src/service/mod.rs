//! The build-orchestration service.
//!
//! A `Service` is constructed once per invocation, initialized for a mode,
//! and then dispatches a named command. Initialization loads environment
//! files, resolves project options, and applies every plugin in order; the
//! resulting build graph stays read-only for the rest of the run.

mod api;
mod args;
mod graph;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;
use thiserror::Error;

use crate::config::{merge_into, ChainedConfig, RawConfig};
use crate::core::{ProjectContext, ProjectDescriptor};
use crate::env::{self, EnvStore};
use crate::options::{self, ProjectOptions};
use crate::plugin::{self, resolve_plugin_id, FsPluginLoader, PluginLoader, ServicePlugin};
use crate::util::Shell;

pub use api::PluginApi;
pub use args::CommandArgs;
pub use graph::{BuildGraph, Command, CommandFn};

/// Expected failures with a stable message, surfaced to the user as-is.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("command \"{0}\" does not exist.")]
    CommandNotFound(String),

    #[error("the service must be initialized before resolving configuration")]
    NotInitialized,

    #[error(
        "invalid type for option \"bosunPlugins.service\": expected an array of strings, got {0}"
    )]
    InvalidLocalPluginList(String),

    #[error(
        "do not modify output.publicPath directly, use the \"publicPath\" project option instead"
    )]
    PublicPathMutated,

    #[error(
        "found bosun.config.js, which is not supported; convert it to bosun.config.toml or bosun.config.json"
    )]
    LegacyJsConfig,

    #[error(
        "this bosun version ({current}) does not satisfy the engines.bosun range \"{required}\" declared in package.json"
    )]
    EngineMismatch { current: String, required: String },
}

/// The fully materialized configuration for one invocation.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Value,
    /// Every entry file, resolved to an absolute path, in declaration order.
    pub entry_files: Vec<PathBuf>,
    pub mode: Option<String>,
}

/// Construction-time knobs for a `Service`. Mostly used by tests and
/// embedders; the binary constructs with defaults.
pub struct ServiceOptions {
    pub plugins: Option<Vec<ServicePlugin>>,
    pub pkg: Option<ProjectDescriptor>,
    pub inline_options: Option<Value>,
    pub use_built_in: bool,
    pub loader: Option<Box<dyn PluginLoader>>,
    pub env: Option<EnvStore>,
    pub shell: Option<Shell>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        ServiceOptions {
            plugins: None,
            pkg: None,
            inline_options: None,
            use_built_in: true,
            loader: None,
            env: None,
            shell: None,
        }
    }
}

impl ServiceOptions {
    pub fn with_plugins(mut self, plugins: Vec<ServicePlugin>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn with_pkg(mut self, pkg: ProjectDescriptor) -> Self {
        self.pkg = Some(pkg);
        self
    }

    pub fn with_inline_options(mut self, options: Value) -> Self {
        self.inline_options = Some(options);
        self
    }

    pub fn without_built_ins(mut self) -> Self {
        self.use_built_in = false;
        self
    }

    pub fn with_loader(mut self, loader: impl PluginLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn with_env(mut self, env: EnvStore) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_shell(mut self, shell: Shell) -> Self {
        self.shell = Some(shell);
        self
    }
}

pub struct Service {
    context: ProjectContext,
    pkg: ProjectDescriptor,
    pkg_root: PathBuf,
    plugins: Vec<ServicePlugin>,
    plugins_to_skip: BTreeSet<String>,
    /// Default mode per command name, collected from plugin declarations.
    default_modes: HashMap<String, String>,
    pub(crate) graph: BuildGraph,
    env: EnvStore,
    shell: Shell,
    initialized: bool,
    mode: Option<String>,
    options: ProjectOptions,
    inline_options: Option<Value>,
}

impl Service {
    /// Construct a service for a project root. Resolves the descriptor and
    /// the full plugin list; does not load environment or options yet.
    pub fn new(context_root: impl Into<PathBuf>, opts: ServiceOptions) -> Result<Self> {
        let context = ProjectContext::new(context_root);
        let shell = opts.shell.unwrap_or_default();

        let (pkg, pkg_root) = match opts.pkg {
            Some(pkg) => (pkg, context.root().to_path_buf()),
            None => crate::core::resolve_descriptor(context.root())?,
        };

        let loader: Box<dyn PluginLoader> = match opts.loader {
            Some(loader) => loader,
            None => Box::new(FsPluginLoader::new(&pkg_root)),
        };
        let plugins = plugin::resolve_plugins(
            &pkg,
            loader.as_ref(),
            opts.plugins,
            opts.use_built_in,
            &shell,
        )?;

        let mut default_modes = HashMap::new();
        for plugin in &plugins {
            for (command, mode) in &plugin.default_modes {
                default_modes.insert(command.clone(), mode.clone());
            }
        }

        Ok(Service {
            context,
            pkg,
            pkg_root,
            plugins,
            plugins_to_skip: BTreeSet::new(),
            default_modes,
            graph: BuildGraph::default(),
            env: opts.env.unwrap_or_else(EnvStore::from_process),
            shell,
            initialized: false,
            mode: None,
            options: ProjectOptions::default(),
            inline_options: opts.inline_options,
        })
    }

    /// Initialize for a mode: load environment files, resolve project
    /// options, and apply every plugin. Idempotent; the first call wins.
    pub fn init(&mut self, mode: Option<&str>) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.mode = mode.map(str::to_string);
        tracing::debug!(?mode, root = %self.context.root().display(), "initializing service");

        let shell = self.shell.clone();
        let root = self.context.root().to_path_buf();
        if mode.is_some() {
            env::load(&mut self.env, &shell, &root, mode);
        }
        env::load(&mut self.env, &shell, &root, None);

        let (user, source) = options::load_user_options(
            &self.context,
            &self.pkg,
            self.inline_options.as_ref(),
            &self.env,
            &self.shell,
        )?;
        let mut merged = options::apply_defaults(user, options::defaults());
        options::migrate_deprecated(&mut merged, &source, &self.shell);
        options::normalize(&mut merged);
        for violation in options::validate(&merged) {
            self.shell
                .error(format!("Invalid options in {}: {}", source, violation));
        }
        self.options = ProjectOptions::from_value(merged, &self.shell);

        let plugins = self.plugins.clone();
        let options = self.options.clone();
        for plugin in &plugins {
            if self.plugins_to_skip.contains(&plugin.id) {
                tracing::debug!(id = %plugin.id, "skipping plugin");
                continue;
            }
            let mut plugin_api = PluginApi::new(&plugin.id, self);
            (plugin.apply)(&mut plugin_api, &options)?;
        }

        // Project-level raw fragment goes last so it wins over plugins.
        if let Some(fragment) = self.options.configure_webpack.clone() {
            self.graph.raw_fns.push(RawConfig::Literal(fragment));
        }
        Ok(())
    }

    /// Record plugins to skip during init, from a comma-separated list of
    /// full or short ids.
    pub fn set_plugins_to_skip(&mut self, list: &str) {
        for id in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            self.plugins_to_skip.insert(resolve_plugin_id(id));
        }
    }

    /// Initialize and dispatch a named command.
    ///
    /// Mode priority: explicit `--mode`, then `development` for a watched
    /// build, then the command's declared default. A missing command name or
    /// a help flag routes to the help command; an unknown name is an error.
    pub fn run(&mut self, name: Option<&str>, args: CommandArgs, raw_args: &[String]) -> Result<()> {
        let mode = args.string("mode").map(str::to_string).or_else(|| {
            if name == Some("build") && args.bool("watch") {
                Some("development".to_string())
            } else {
                name.and_then(|n| self.default_modes.get(n).cloned())
            }
        });

        if let Some(list) = args.string("skip-plugins") {
            let list = list.to_string();
            self.set_plugins_to_skip(&list);
        }

        self.init(mode.as_deref())?;
        self.env.publish_to_process();

        let mut args = args;
        let mut raw: Vec<String> = raw_args.to_vec();
        let named = match name {
            Some(name) => Some(
                self.graph
                    .commands
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ServiceError::CommandNotFound(name.to_string()))?,
            ),
            None => None,
        };
        let command = match named {
            Some(command) if !args.bool("help") && !args.bool("h") => {
                args = args.without_command();
                if raw.first().map(String::as_str) == name {
                    raw.remove(0);
                }
                command
            }
            _ => self
                .graph
                .commands
                .get("help")
                .cloned()
                .ok_or_else(|| ServiceError::CommandNotFound("help".to_string()))?,
        };
        (command.run)(self, &args, &raw)
    }

    /// Run every chainable-config mutator over a fresh chained config.
    pub fn resolve_chainable_config(&self) -> Result<ChainedConfig> {
        if !self.initialized {
            return Err(ServiceError::NotInitialized.into());
        }
        let mut chained = ChainedConfig::new();
        for f in &self.graph.chain_fns {
            f(&mut chained);
        }
        Ok(chained)
    }

    /// The dev-server configuration: project `devServer` options plus every
    /// registered dev-server mutator.
    pub fn dev_server_config(&self) -> Result<Value> {
        if !self.initialized {
            return Err(ServiceError::NotInitialized.into());
        }
        let mut config = self.options.dev_server.clone();
        for f in &self.graph.dev_server_fns {
            f(&mut config);
        }
        Ok(config)
    }

    /// Materialize the final configuration: chained form converted to a
    /// plain object, then every raw mutator folded over it in order.
    pub fn resolve_webpack_config(
        &self,
        chained: Option<ChainedConfig>,
    ) -> Result<ResolvedConfig> {
        if !self.initialized {
            return Err(ServiceError::NotInitialized.into());
        }
        let chained = match chained {
            Some(chained) => chained,
            None => self.resolve_chainable_config()?,
        };
        let mut config = chained.to_config();

        for raw in &self.graph.raw_fns {
            match raw {
                RawConfig::Func(f) => {
                    if let Some(partial) = f(&mut config) {
                        merge_into(&mut config, partial);
                    }
                }
                RawConfig::Literal(fragment) => {
                    merge_into(&mut config, fragment.clone());
                }
            }
        }

        // Mutators must not rewrite the public path behind the project
        // option for non-app build targets; the harness flag bypasses this.
        if !self.env.contains("BOSUN_TEST") {
            let target = self.env.get("BOSUN_BUILD_TARGET");
            if target.is_some_and(|t| t != "app")
                && config["output"]["publicPath"].as_str()
                    != Some(self.options.public_path.as_str())
            {
                return Err(ServiceError::PublicPathMutated.into());
            }
        }

        let entry_files = if self.env.contains("BOSUN_ENTRY_FILES") {
            Vec::new()
        } else {
            self.collect_entry_files(&config)
        };

        Ok(ResolvedConfig {
            config,
            entry_files,
            mode: self.mode.clone(),
        })
    }

    fn collect_entry_files(&self, config: &Value) -> Vec<PathBuf> {
        let mut files: Vec<String> = Vec::new();
        let mut push = |value: &Value, files: &mut Vec<String>| match value {
            Value::String(s) => files.push(s.clone()),
            Value::Array(entries) => {
                files.extend(entries.iter().filter_map(Value::as_str).map(str::to_string));
            }
            _ => {}
        };
        match config.get("entry") {
            Some(Value::Object(entries)) => {
                for value in entries.values() {
                    push(value, &mut files);
                }
            }
            Some(value) => push(value, &mut files),
            None => {}
        }
        files
            .into_iter()
            .map(|file| self.context.resolve(file))
            .collect()
    }

    /// Publish the resolved entry files and mode to the process environment
    /// for downstream tooling, if this service forwards environment state.
    pub fn publish(&self, resolved: &ResolvedConfig) {
        if !self.env.forwards_to_process() {
            return;
        }
        let mut env = self.env.clone();
        let files: Vec<String> = resolved
            .entry_files
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        if let Ok(encoded) = serde_json::to_string(&files) {
            env.set("BOSUN_ENTRY_FILES", encoded);
        }
        if let Some(mode) = &resolved.mode {
            env.set("BOSUN_MODE", mode.clone());
        }
        env.publish_to_process();
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    pub fn pkg(&self) -> &ProjectDescriptor {
        &self.pkg
    }

    pub fn pkg_root(&self) -> &Path {
        &self.pkg_root
    }

    pub fn plugins(&self) -> &[ServicePlugin] {
        &self.plugins
    }

    pub fn options(&self) -> &ProjectOptions {
        &self.options
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn env(&self) -> &EnvStore {
        &self.env
    }

    pub fn commands(&self) -> &indexmap::IndexMap<String, Command> {
        &self.graph.commands
    }

    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_service(root: &Path, plugins: Vec<ServicePlugin>) -> Service {
        Service::new(
            root,
            ServiceOptions::default()
                .with_pkg(ProjectDescriptor::default())
                .with_plugins(plugins)
                .without_built_ins()
                .with_env(EnvStore::empty())
                .with_shell(Shell::capturing()),
        )
        .unwrap()
    }

    #[test]
    fn test_init_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let applied = Arc::new(AtomicUsize::new(0));
        let counter = applied.clone();
        let plugin = ServicePlugin::new("bosun-plugin-counter", move |_api, _options| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut service = test_service(tmp.path(), vec![plugin]);
        service.init(Some("development")).unwrap();
        service.init(Some("production")).unwrap();

        assert_eq!(applied.load(Ordering::SeqCst), 1);
        assert_eq!(service.mode(), Some("development"));
    }

    #[test]
    fn test_raw_mutators_win_over_chain() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-paths", |api, _options| {
            api.chain_webpack(|config| {
                config.output_public_path("/x/");
            });
            api.configure_webpack(json!({ "output": { "publicPath": "/y/" } }));
            Ok(())
        });

        let mut service = test_service(tmp.path(), vec![plugin]);
        service.init(None).unwrap();
        let resolved = service.resolve_webpack_config(None).unwrap();

        assert_eq!(resolved.config["output"]["publicPath"], "/y/");
    }

    #[test]
    fn test_resolve_before_init_fails() {
        let tmp = TempDir::new().unwrap();
        let service = test_service(tmp.path(), vec![]);
        assert!(service.resolve_webpack_config(None).is_err());
        assert!(service.dev_server_config().is_err());
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut service = test_service(tmp.path(), vec![]);
        let err = service
            .run(Some("bogus"), CommandArgs::parse(["bogus"]), &[])
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_missing_command_routes_to_help() {
        let tmp = TempDir::new().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let plugin = ServicePlugin::new("bosun-plugin-help-stub", move |api, _options| {
            let counter = counter.clone();
            api.register_command(
                "help",
                Command::new("help stub", move |_service, _args, _raw| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
            Ok(())
        });

        let mut service = test_service(tmp.path(), vec![plugin]);
        service.run(None, CommandArgs::default(), &[]).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_help_flag_routes_to_help_without_stripping() {
        let tmp = TempDir::new().unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let plugin = ServicePlugin::new("bosun-plugin-two-commands", move |api, _options| {
            api.register_command("serve", Command::new("serve", |_s, _a, _r| Ok(())));
            let sink = sink.clone();
            api.register_command(
                "help",
                Command::new("help", move |_service, args, _raw| {
                    if let Ok(mut seen) = sink.lock() {
                        seen.extend(args.positionals.clone());
                    }
                    Ok(())
                }),
            );
            Ok(())
        });

        let mut service = test_service(tmp.path(), vec![plugin]);
        let args = CommandArgs::parse(["serve", "--help"]);
        service
            .run(Some("serve"), args, &["serve".to_string(), "--help".to_string()])
            .unwrap();

        // Help still sees the command name it should describe.
        assert_eq!(*seen.lock().unwrap(), vec!["serve".to_string()]);
    }

    #[test]
    fn test_skip_plugins() {
        let tmp = TempDir::new().unwrap();
        let applied = Arc::new(AtomicUsize::new(0));
        let counter = applied.clone();
        let plugin = ServicePlugin::new("bosun-plugin-counter", move |_api, _options| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut service = test_service(tmp.path(), vec![plugin]);
        service.set_plugins_to_skip("counter");
        service.init(None).unwrap();

        assert_eq!(applied.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_command_default_mode() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-modal", |api, _options| {
            api.register_command("lint", Command::new("lint", |_s, _a, _r| Ok(())));
            Ok(())
        })
        .with_default_mode("lint", "production");
        let help = ServicePlugin::new("bosun-plugin-help-stub", |api, _options| {
            api.register_command("help", Command::new("help", |_s, _a, _r| Ok(())));
            Ok(())
        });

        let mut service = test_service(tmp.path(), vec![plugin, help]);
        service
            .run(Some("lint"), CommandArgs::parse(["lint"]), &["lint".to_string()])
            .unwrap();
        assert_eq!(service.mode(), Some("production"));
    }

    #[test]
    fn test_watched_build_defaults_to_development() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-build-stub", |api, _options| {
            api.register_command("build", Command::new("build", |_s, _a, _r| Ok(())));
            Ok(())
        })
        .with_default_mode("build", "production");

        let mut service = test_service(tmp.path(), vec![plugin]);
        let args = CommandArgs::parse(["build", "--watch"]);
        service
            .run(Some("build"), args, &["build".to_string(), "--watch".to_string()])
            .unwrap();
        assert_eq!(service.mode(), Some("development"));
    }

    #[test]
    fn test_entry_files_normalization() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-entries", |api, _options| {
            api.chain_webpack(|config| {
                config.entry("app").push("./src/main.js".to_string());
                config.entry("admin").push("./src/admin.js".to_string());
            });
            Ok(())
        });

        let mut service = test_service(tmp.path(), vec![plugin]);
        service.init(None).unwrap();
        let resolved = service.resolve_webpack_config(None).unwrap();

        assert_eq!(
            resolved.entry_files,
            vec![
                tmp.path().join("./src/main.js"),
                tmp.path().join("./src/admin.js"),
            ]
        );
    }

    #[test]
    fn test_public_path_guard() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-rogue", |api, _options| {
            api.chain_webpack(|config| {
                config.output_public_path("/app/");
            });
            api.configure_webpack(json!({ "output": { "publicPath": "/rogue/" } }));
            Ok(())
        });

        let mut service = Service::new(
            tmp.path(),
            ServiceOptions::default()
                .with_pkg(ProjectDescriptor::default())
                .with_plugins(vec![plugin])
                .without_built_ins()
                .with_env(EnvStore::empty().with_var("BOSUN_BUILD_TARGET", "lib"))
                .with_shell(Shell::capturing()),
        )
        .unwrap();
        service.init(None).unwrap();

        let err = service.resolve_webpack_config(None).unwrap_err();
        assert!(err.to_string().contains("publicPath"));
    }

    #[test]
    fn test_public_path_guard_catches_chain_mutation() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-cdn", |api, _options| {
            api.chain_webpack(|config| {
                config.output_public_path("/cdn/");
            });
            Ok(())
        });

        let mut service = Service::new(
            tmp.path(),
            ServiceOptions::default()
                .with_pkg(ProjectDescriptor::default())
                .with_plugins(vec![plugin])
                .without_built_ins()
                .with_env(EnvStore::empty().with_var("BOSUN_BUILD_TARGET", "lib"))
                .with_shell(Shell::capturing()),
        )
        .unwrap();
        service.init(None).unwrap();

        // Option default is "/", the chain rewrote it to "/cdn/".
        let err = service.resolve_webpack_config(None).unwrap_err();
        assert!(err.to_string().contains("publicPath"));
    }

    #[test]
    fn test_public_path_guard_accepts_matching_option() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-base-path", |api, options| {
            let public_path = options.public_path.clone();
            api.chain_webpack(move |config| {
                config.output_public_path(public_path.clone());
            });
            Ok(())
        });

        let mut service = Service::new(
            tmp.path(),
            ServiceOptions::default()
                .with_pkg(ProjectDescriptor::default())
                .with_plugins(vec![plugin])
                .without_built_ins()
                .with_env(EnvStore::empty().with_var("BOSUN_BUILD_TARGET", "lib"))
                .with_shell(Shell::capturing()),
        )
        .unwrap();
        service.init(None).unwrap();

        let resolved = service.resolve_webpack_config(None).unwrap();
        assert_eq!(resolved.config["output"]["publicPath"], "/");
    }

    #[test]
    fn test_raw_function_mutators() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-raw-fns", |api, _options| {
            // In-place mutation, nothing returned.
            api.configure_webpack_fn(|config| {
                config["devtool"] = json!("eval");
                None
            });
            // Returned partial is merged on top.
            api.configure_webpack_fn(|_config| {
                Some(json!({ "output": { "filename": "bundle.js" } }))
            });
            Ok(())
        });

        let mut service = test_service(tmp.path(), vec![plugin]);
        service.init(None).unwrap();
        let resolved = service.resolve_webpack_config(None).unwrap();

        assert_eq!(resolved.config["devtool"], "eval");
        assert_eq!(resolved.config["output"]["filename"], "bundle.js");
    }

    #[test]
    fn test_project_config_wins_over_plugins() {
        let tmp = TempDir::new().unwrap();
        let plugin = ServicePlugin::new("bosun-plugin-devtool", |api, _options| {
            api.configure_webpack(json!({ "devtool": "eval" }));
            Ok(())
        });

        let mut service = Service::new(
            tmp.path(),
            ServiceOptions::default()
                .with_pkg(ProjectDescriptor::default())
                .with_plugins(vec![plugin])
                .without_built_ins()
                .with_inline_options(json!({
                    "configureWebpack": { "devtool": "source-map" }
                }))
                .with_env(EnvStore::empty())
                .with_shell(Shell::capturing()),
        )
        .unwrap();
        service.init(None).unwrap();
        let resolved = service.resolve_webpack_config(None).unwrap();

        assert_eq!(resolved.config["devtool"], "source-map");
    }
}

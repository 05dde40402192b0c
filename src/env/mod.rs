//! Environment loading for bosun.
//!
//! Variables live in an explicit `EnvStore` rather than being written into
//! the process environment as a side effect. Dotenv files are read through
//! dotenvy's iterator API so their values land in the store; one `publish`
//! adapter applies newly introduced variables to the real process
//! environment at the boundary, for downstream tooling that reads them.
//!
//! Load order per mode: `.env.<mode>.local`, then `.env.<mode>` (base files
//! without a mode). A variable already present in the store wins over any
//! file value, and earlier-loaded files win over later ones.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::util::Shell;

static EXPANSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Explicit environment-variable store.
#[derive(Debug, Clone)]
pub struct EnvStore {
    vars: BTreeMap<String, String>,
    added: Vec<String>,
    forward: bool,
}

impl EnvStore {
    /// Snapshot the process environment. Stores created this way forward
    /// newly added variables back to the process on `publish_to_process`.
    pub fn from_process() -> Self {
        EnvStore {
            vars: std::env::vars().collect(),
            added: Vec::new(),
            forward: true,
        }
    }

    /// An empty store that never touches the process environment. Used by
    /// tests and embedders that manage publication themselves.
    pub fn empty() -> Self {
        EnvStore {
            vars: BTreeMap::new(),
            added: Vec::new(),
            forward: false,
        }
    }

    /// Seed a variable, builder-style.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Set a variable, remembering it for later publication.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.added.contains(&key) {
            self.added.push(key.clone());
        }
        self.vars.insert(key, value.into());
    }

    /// Whether this store forwards published variables to the process.
    pub fn forwards_to_process(&self) -> bool {
        self.forward
    }

    /// Apply variables introduced since the snapshot to the process
    /// environment. This is the only place bosun mutates process-global
    /// environment state.
    pub fn publish_to_process(&self) {
        if !self.forward {
            return;
        }
        for key in &self.added {
            if let Some(value) = self.vars.get(key) {
                std::env::set_var(key, value);
            }
        }
    }
}

fn expand(value: &str, store: &EnvStore) -> String {
    EXPANSION_RE
        .replace_all(value, |caps: &regex::Captures<'_>| {
            store.get(&caps[1]).unwrap_or("").to_string()
        })
        .into_owned()
}

fn load_file(store: &mut EnvStore, shell: &Shell, path: &Path) {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "env file not found, skipping");
        return;
    }
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(err) => {
            shell.error(format!("failed to load {}: {}", path.display(), err));
            return;
        }
    };
    for item in iter {
        match item {
            Ok((key, value)) => {
                // Existing process or earlier-file values win over this file.
                if !store.contains(&key) {
                    let expanded = expand(&value, store);
                    store.set(key, expanded);
                }
            }
            Err(err) => {
                shell.error(format!("failed to parse {}: {}", path.display(), err));
                return;
            }
        }
    }
    tracing::debug!(path = %path.display(), "loaded env file");
}

/// Load environment files for the given mode into the store.
///
/// When a mode is given, also derive `NODE_ENV` and `BABEL_ENV`: the mode
/// itself for `production` and `test`, `development` otherwise. File and
/// pre-existing values win over the derived default, except under the
/// test-harness force rule (`BOSUN_TEST` set, `BOSUN_TEST_TESTING_ENV`
/// unset) which always overwrites.
pub fn load(store: &mut EnvStore, shell: &Shell, context_root: &Path, mode: Option<&str>) {
    let base = match mode {
        Some(mode) => context_root.join(format!(".env.{}", mode)),
        None => context_root.join(".env"),
    };
    let local = base.with_file_name(format!(
        "{}.local",
        base.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    ));

    load_file(store, shell, &local);
    load_file(store, shell, &base);

    if let Some(mode) = mode {
        let force_default =
            store.contains("BOSUN_TEST") && !store.contains("BOSUN_TEST_TESTING_ENV");
        let default_env = if mode == "production" || mode == "test" {
            mode
        } else {
            "development"
        };
        if force_default || !store.contains("NODE_ENV") {
            store.set("NODE_ENV", default_env);
        }
        if force_default || !store.contains("BABEL_ENV") {
            store.set("BABEL_ENV", default_env);
        }
    }
}

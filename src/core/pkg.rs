//! Project descriptor (package.json) resolution.
//!
//! The descriptor is the nearest `package.json` above the project context.
//! A `bosunPlugins.resolveFrom` entry redirects descriptor resolution into
//! another directory, so a thin wrapper project can delegate its plugin list
//! to a shared location. The descriptor is read-only after resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::service::ServiceError;

/// Maximum number of `resolveFrom` redirects to follow.
const MAX_REDIRECTS: usize = 8;

/// Engine version requirements from the `engines` field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Engines {
    /// Required bosun version range, e.g. `>=0.1`.
    pub bosun: Option<String>,
}

/// Vendor-specific plugin declarations under the `bosunPlugins` key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BosunPlugins {
    /// Ordered list of local plugin file paths. Kept as a raw value so a
    /// malformed declaration can be rejected with a useful type name.
    pub service: Option<Value>,

    /// Relative directory to resolve the descriptor (and plugins) from.
    pub resolve_from: Option<String>,
}

/// The resolved package manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectDescriptor {
    pub name: Option<String>,
    pub version: Option<String>,

    /// Regular dependencies, in declaration order.
    pub dependencies: IndexMap<String, String>,

    /// Development dependencies, in declaration order.
    pub dev_dependencies: IndexMap<String, String>,

    /// Optional dependencies. Plugins listed here fall back to a no-op when
    /// their module cannot be loaded.
    pub optional_dependencies: IndexMap<String, String>,

    pub engines: Engines,

    /// Inline fallback configuration object.
    pub bosun: Option<Value>,

    /// Vendor-specific plugin declarations.
    pub bosun_plugins: Option<BosunPlugins>,
}

impl ProjectDescriptor {
    /// Look up the declared version string of a dependency in any of the
    /// three dependency maps.
    pub fn declared_version(&self, id: &str) -> Option<&str> {
        self.dependencies
            .get(id)
            .or_else(|| self.dev_dependencies.get(id))
            .or_else(|| self.optional_dependencies.get(id))
            .map(String::as_str)
    }
}

fn load_descriptor(dir: &Path) -> Result<Option<ProjectDescriptor>> {
    let path = dir.join("package.json");
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let pkg = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(pkg))
}

/// Resolve the nearest project descriptor above `context`, following
/// `bosunPlugins.resolveFrom` redirects.
///
/// Returns the descriptor and the directory it was resolved from (the
/// "descriptor root" local plugins load relative to). A project without a
/// `package.json` resolves to an empty descriptor rooted at the context.
pub fn resolve_descriptor(context: &Path) -> Result<(ProjectDescriptor, PathBuf)> {
    let mut dir = context.to_path_buf();
    let (mut pkg, mut root) = loop {
        if let Some(pkg) = load_descriptor(&dir)? {
            break (pkg, dir);
        }
        if !dir.pop() {
            return Ok((ProjectDescriptor::default(), context.to_path_buf()));
        }
    };

    let mut redirects = 0;
    while let Some(target) = pkg
        .bosun_plugins
        .as_ref()
        .and_then(|bp| bp.resolve_from.as_ref())
    {
        let redirected = root.join(target);
        if redirected == root {
            break;
        }
        redirects += 1;
        if redirects > MAX_REDIRECTS {
            anyhow::bail!(
                "too many bosunPlugins.resolveFrom redirects (starting from {})",
                context.display()
            );
        }
        tracing::debug!(from = %root.display(), to = %redirected.display(), "descriptor redirect");
        pkg = load_descriptor(&redirected)?.unwrap_or_default();
        root = redirected;
    }

    Ok((pkg, root))
}

/// Check the descriptor's `engines.bosun` requirement against this build.
pub fn check_engine(pkg: &ProjectDescriptor) -> Result<()> {
    check_engine_against(pkg, env!("CARGO_PKG_VERSION"))
}

fn check_engine_against(pkg: &ProjectDescriptor, current: &str) -> Result<()> {
    let Some(required) = pkg.engines.bosun.as_deref() else {
        return Ok(());
    };
    let req = semver::VersionReq::parse(required)
        .with_context(|| format!("invalid engines.bosun range {:?} in package.json", required))?;
    let version = semver::Version::parse(current)
        .with_context(|| format!("invalid bosun version {:?}", current))?;
    if !req.matches(&version) {
        return Err(ServiceError::EngineMismatch {
            current: current.to_string(),
            required: required.to_string(),
        }
        .into());
    }
    Ok(())
}

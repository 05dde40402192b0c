//! Plugin identifier resolution.
//!
//! Plugin packages follow a naming convention: `@bosun/plugin-<name>` for
//! official plugins, `bosun-plugin-<name>` for unscoped community plugins,
//! and `@scope/bosun-plugin-<name>` for scoped ones. Short forms used on the
//! command line or in `--skip-plugins` expand to the canonical id.

use std::sync::LazyLock;

use regex::Regex;

static PLUGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(@bosun/|bosun-|@[\w-]+(\.)?[\w-]+/bosun-)plugin-").unwrap());
static SCOPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@[\w-]+(\.)?[\w-]+/").unwrap());

/// Official plugins resolvable by bare short name.
pub const OFFICIAL_PLUGINS: &[&str] = &[
    "babel",
    "e2e-cypress",
    "eslint",
    "pwa",
    "router",
    "store",
    "typescript",
    "unit-jest",
    "unit-mocha",
];

/// Whether an id names a plugin package.
pub fn is_plugin(id: &str) -> bool {
    PLUGIN_RE.is_match(id)
}

/// Strip the plugin-naming prefix, e.g. `@bosun/plugin-babel` -> `babel`.
pub fn to_short_plugin_id(id: &str) -> String {
    PLUGIN_RE.replace(id, "").into_owned()
}

/// Expand a short or full plugin id to its canonical form.
pub fn resolve_plugin_id(id: &str) -> String {
    // Already full, e.g. bosun-plugin-foo, @bosun/plugin-foo,
    // @scope/bosun-plugin-foo.
    if is_plugin(id) {
        return id.to_string();
    }
    if id == "@bosun/service" {
        return id.to_string();
    }
    if OFFICIAL_PLUGINS.contains(&id) {
        return format!("@bosun/plugin-{}", id);
    }
    // Scoped short, e.g. @bosun/foo, @scope/foo.
    if id.starts_with('@') {
        if let Some(scope) = SCOPE_RE.find(id) {
            let scope = scope.as_str();
            let short = &id[scope.len()..];
            return if scope == "@bosun/" {
                format!("{}plugin-{}", scope, short)
            } else {
                format!("{}bosun-plugin-{}", scope, short)
            };
        }
    }
    // Default short, e.g. foo.
    format!("bosun-plugin-{}", id)
}

/// Whether a user-supplied id refers to the given full plugin id, accepting
/// full, short, and scoped-short forms.
pub fn matches_plugin_id(input: &str, full: &str) -> bool {
    let short = to_short_plugin_id(full);
    full == input || short == input || short == SCOPE_RE.replace(input, "").as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_plugin() {
        assert!(is_plugin("@bosun/plugin-babel"));
        assert!(is_plugin("bosun-plugin-foo"));
        assert!(is_plugin("@scope/bosun-plugin-foo"));
        assert!(is_plugin("@scope.dotted/bosun-plugin-foo"));
        assert!(!is_plugin("foo"));
        assert!(!is_plugin("@bosun/service"));
        assert!(!is_plugin("bosun-helper-foo"));
    }

    #[test]
    fn test_resolve_short_ids() {
        assert_eq!(resolve_plugin_id("babel"), "@bosun/plugin-babel");
        assert_eq!(resolve_plugin_id("foo"), "bosun-plugin-foo");
        assert_eq!(resolve_plugin_id("@bosun/foo"), "@bosun/plugin-foo");
        assert_eq!(resolve_plugin_id("@acme/foo"), "@acme/bosun-plugin-foo");
    }

    #[test]
    fn test_resolve_full_ids_unchanged() {
        for id in [
            "@bosun/plugin-babel",
            "bosun-plugin-foo",
            "@acme/bosun-plugin-foo",
            "@bosun/service",
        ] {
            assert_eq!(resolve_plugin_id(id), id);
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        for id in ["babel", "foo", "@bosun/foo", "@acme/foo", "bosun-plugin-x"] {
            let once = resolve_plugin_id(id);
            assert_eq!(resolve_plugin_id(&once), once, "input {:?}", id);
        }
    }

    #[test]
    fn test_to_short() {
        assert_eq!(to_short_plugin_id("@bosun/plugin-babel"), "babel");
        assert_eq!(to_short_plugin_id("bosun-plugin-foo"), "foo");
        assert_eq!(to_short_plugin_id("@acme/bosun-plugin-foo"), "foo");
    }

    #[test]
    fn test_matches_plugin_id() {
        let full = "@bosun/plugin-babel";
        assert!(matches_plugin_id("@bosun/plugin-babel", full));
        assert!(matches_plugin_id("babel", full));
        assert!(matches_plugin_id("@bosun/babel", full));
        assert!(!matches_plugin_id("eslint", full));
    }
}

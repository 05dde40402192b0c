//! Project options resolution.
//!
//! User configuration is loaded from exactly one of three mutually exclusive
//! sources, in priority order: the config file (`bosun.config.toml` /
//! `bosun.config.json`, or an explicit `BOSUN_CONFIG_PATH` override), the
//! `"bosun"` field of the project descriptor, or inline options supplied at
//! construction. The chosen source is deep-filled with schema defaults,
//! normalized, and validated; validation failures are reported per-violation
//! and never abort resolution.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::{ProjectContext, ProjectDescriptor};
use crate::env::EnvStore;
use crate::service::ServiceError;
use crate::util::Shell;

/// Where the resolved user options came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsSource {
    /// A config file; carries the file name for messages.
    File(String),
    /// The `"bosun"` field of package.json.
    PkgField,
    /// Inline options passed at construction.
    Inline,
}

impl fmt::Display for OptionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsSource::File(name) => write!(f, "{}", name),
            OptionsSource::PkgField => write!(f, "\"bosun\" field in package.json"),
            OptionsSource::Inline => write!(f, "inline options"),
        }
    }
}

/// Schema defaults for project options.
pub fn defaults() -> Value {
    json!({
        "publicPath": "/",
        "outputDir": "dist",
        "assetsDir": "",
        "indexPath": "index.html",
        "filenameHashing": true,
        "lintOnSave": "default",
        "runtimeCompiler": false,
        "transpileDependencies": [],
        "productionSourceMap": true,
        "css": {},
        "devServer": {}
    })
}

/// CSS-related options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CssOptions {
    /// Whether only `*.module.*` files are treated as CSS modules.
    pub require_module_extension: bool,
    pub source_map: bool,
    /// Deprecated toggle, migrated into `require_module_extension`.
    pub modules: Option<bool>,
    pub extract: Option<Value>,
    pub loader_options: Value,
}

impl Default for CssOptions {
    fn default() -> Self {
        CssOptions {
            require_module_extension: true,
            source_map: false,
            modules: None,
            extract: None,
            loader_options: Value::Null,
        }
    }
}

/// The merged, normalized, validated project options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectOptions {
    pub public_path: String,
    pub output_dir: String,
    pub assets_dir: String,
    pub index_path: String,
    pub filename_hashing: bool,
    pub lint_on_save: Value,
    pub runtime_compiler: bool,
    pub transpile_dependencies: Vec<String>,
    pub production_source_map: bool,
    pub css: CssOptions,
    pub dev_server: Value,
    /// Literal raw-config fragment from the config file, pushed as the
    /// final raw mutator so project config wins over plugin contributions.
    pub configure_webpack: Option<Value>,
    /// The full merged document, for command-specific sub-objects.
    #[serde(skip)]
    pub raw: Value,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        ProjectOptions {
            public_path: "/".to_string(),
            output_dir: "dist".to_string(),
            assets_dir: String::new(),
            index_path: "index.html".to_string(),
            filename_hashing: true,
            lint_on_save: json!("default"),
            runtime_compiler: false,
            transpile_dependencies: Vec::new(),
            production_source_map: true,
            css: CssOptions::default(),
            dev_server: json!({}),
            configure_webpack: None,
            raw: Value::Null,
        }
    }
}

impl ProjectOptions {
    /// Interpret a merged options document. Type errors were already
    /// reported by validation, so failures fall back to defaults here.
    pub fn from_value(value: Value, shell: &Shell) -> Self {
        let raw = value.clone();
        match serde_json::from_value::<ProjectOptions>(value) {
            Ok(mut options) => {
                options.raw = raw;
                options
            }
            Err(err) => {
                shell.error(format!(
                    "failed to interpret project options ({}), falling back to defaults",
                    err
                ));
                ProjectOptions {
                    raw,
                    ..Default::default()
                }
            }
        }
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

fn toml_to_json(value: toml::Value) -> Result<Value> {
    serde_json::to_value(value).context("failed to convert TOML configuration to JSON")
}

fn load_config_file(path: &PathBuf) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    } else {
        let value: toml::Value = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        toml_to_json(value)
    }
}

/// Select the user configuration from exactly one source.
pub fn load_user_options(
    ctx: &ProjectContext,
    pkg: &ProjectDescriptor,
    inline: Option<&Value>,
    env: &EnvStore,
    shell: &Shell,
) -> Result<(Value, OptionsSource)> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(override_path) = env.get("BOSUN_CONFIG_PATH") {
        candidates.push(ctx.resolve(override_path));
    }
    candidates.push(ctx.resolve("bosun.config.toml"));
    candidates.push(ctx.resolve("bosun.config.json"));

    let file_path = candidates.into_iter().find(|p| p.exists());

    let mut file_config = None;
    if let Some(path) = &file_path {
        let value = load_config_file(path)?;
        if value.is_object() {
            file_config = Some(value);
        } else {
            shell.error(format!(
                "Error loading {}: should contain a configuration table, got {}.",
                path.display(),
                json_type_name(&value)
            ));
        }
    } else if ctx.resolve("bosun.config.js").exists() {
        // Leftover from a JavaScript-based toolchain; loading it would
        // silently drop the configuration.
        return Err(ServiceError::LegacyJsConfig.into());
    }

    let mut pkg_config = pkg.bosun.clone();
    if let Some(value) = &pkg_config {
        if !value.is_object() {
            shell.error(format!(
                "Error loading bosun config in package.json: the \"bosun\" field should be an object, got {}.",
                json_type_name(value)
            ));
            pkg_config = None;
        }
    }

    let file_name = file_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bosun.config.toml".to_string());

    if let Some(file_config) = file_config {
        if pkg_config.is_some() {
            shell.warn(format!(
                "\"bosun\" field in package.json ignored due to presence of {}.",
                file_name
            ));
            shell.warn(format!(
                "You should migrate it into {} and remove it from package.json.",
                file_name
            ));
        }
        return Ok((file_config, OptionsSource::File(file_name)));
    }
    if let Some(pkg_config) = pkg_config {
        return Ok((pkg_config, OptionsSource::PkgField));
    }
    Ok((
        inline.cloned().unwrap_or_else(|| json!({})),
        OptionsSource::Inline,
    ))
}

/// Deep-fill missing keys of `user` from `defaults`. User values win;
/// arrays are taken whole from whichever side provides them.
pub fn apply_defaults(user: Value, defaults: Value) -> Value {
    match (user, defaults) {
        (Value::Object(mut user), Value::Object(defaults)) => {
            for (key, default_value) in defaults {
                match user.remove(&key) {
                    Some(user_value) => {
                        user.insert(key, apply_defaults(user_value, default_value));
                    }
                    None => {
                        user.insert(key, default_value);
                    }
                }
            }
            Value::Object(user)
        }
        (Value::Null, defaults) => defaults,
        (user, _) => user,
    }
}

/// Migrate the deprecated `css.modules` toggle into
/// `css.requireModuleExtension`.
pub fn migrate_deprecated(options: &mut Value, source: &OptionsSource, shell: &Shell) {
    let Some(css) = options.get_mut("css").and_then(Value::as_object_mut) else {
        return;
    };
    let Some(modules) = css.get("modules").and_then(Value::as_bool) else {
        return;
    };
    if css.contains_key("requireModuleExtension") {
        shell.warn(format!(
            "You have set both \"css.modules\" and \"css.requireModuleExtension\" in {}, \
             \"css.modules\" will be ignored in favor of \"css.requireModuleExtension\".",
            source
        ));
    } else {
        shell.warn(format!(
            "\"css.modules\" option in {} is deprecated now, \
             please use \"css.requireModuleExtension\" instead.",
            source
        ));
        css.insert("requireModuleExtension".to_string(), json!(!modules));
    }
}

/// Normalize path-like options in place.
pub fn normalize(options: &mut Value) {
    if let Some(public_path) = options.get("publicPath").and_then(Value::as_str) {
        let mut normalized = public_path.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        if let Some(stripped) = normalized.strip_prefix("./") {
            normalized = stripped.to_string();
        }
        options["publicPath"] = json!(normalized);
    }
    if let Some(output_dir) = options.get("outputDir").and_then(Value::as_str) {
        if let Some(stripped) = output_dir.strip_suffix('/') {
            options["outputDir"] = json!(stripped);
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "publicPath",
    "outputDir",
    "assetsDir",
    "indexPath",
    "filenameHashing",
    "lintOnSave",
    "runtimeCompiler",
    "transpileDependencies",
    "productionSourceMap",
    "css",
    "devServer",
    "configureWebpack",
    "pluginOptions",
];

const KNOWN_CSS_KEYS: &[&str] = &[
    "requireModuleExtension",
    "sourceMap",
    "modules",
    "extract",
    "loaderOptions",
];

fn expect_string(obj: &Map<String, Value>, key: &str, errors: &mut Vec<String>) {
    if let Some(value) = obj.get(key) {
        if !value.is_string() {
            errors.push(format!(
                "\"{}\" should be a string, got {}",
                key,
                json_type_name(value)
            ));
        }
    }
}

fn expect_bool(obj: &Map<String, Value>, key: &str, errors: &mut Vec<String>) {
    if let Some(value) = obj.get(key) {
        if !value.is_boolean() {
            errors.push(format!(
                "\"{}\" should be a boolean, got {}",
                key,
                json_type_name(value)
            ));
        }
    }
}

fn expect_object(obj: &Map<String, Value>, key: &str, errors: &mut Vec<String>) {
    if let Some(value) = obj.get(key) {
        if !value.is_object() {
            errors.push(format!(
                "\"{}\" should be an object, got {}",
                key,
                json_type_name(value)
            ));
        }
    }
}

/// Validate the merged options document against the schema. Returns every
/// violation, not just the first.
pub fn validate(options: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let Some(obj) = options.as_object() else {
        return vec!["options should be an object".to_string()];
    };

    for key in obj.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            errors.push(format!("unknown option \"{}\"", key));
        }
    }

    expect_string(obj, "publicPath", &mut errors);
    expect_string(obj, "outputDir", &mut errors);
    expect_string(obj, "assetsDir", &mut errors);
    expect_string(obj, "indexPath", &mut errors);
    expect_bool(obj, "filenameHashing", &mut errors);
    expect_bool(obj, "runtimeCompiler", &mut errors);
    expect_bool(obj, "productionSourceMap", &mut errors);
    expect_object(obj, "devServer", &mut errors);
    expect_object(obj, "configureWebpack", &mut errors);
    expect_object(obj, "pluginOptions", &mut errors);

    if let Some(value) = obj.get("lintOnSave") {
        if !value.is_boolean() && !value.is_string() {
            errors.push(format!(
                "\"lintOnSave\" should be a boolean or a string, got {}",
                json_type_name(value)
            ));
        }
    }
    if let Some(value) = obj.get("transpileDependencies") {
        match value.as_array() {
            Some(entries) => {
                for entry in entries {
                    if !entry.is_string() {
                        errors.push(format!(
                            "\"transpileDependencies\" entries should be strings, got {}",
                            json_type_name(entry)
                        ));
                    }
                }
            }
            None => errors.push(format!(
                "\"transpileDependencies\" should be an array, got {}",
                json_type_name(value)
            )),
        }
    }

    if let Some(css) = obj.get("css") {
        match css.as_object() {
            Some(css) => {
                for key in css.keys() {
                    if !KNOWN_CSS_KEYS.contains(&key.as_str()) {
                        errors.push(format!("unknown option \"css.{}\"", key));
                    }
                }
                expect_bool(css, "requireModuleExtension", &mut errors);
                expect_bool(css, "sourceMap", &mut errors);
                expect_bool(css, "modules", &mut errors);
                expect_object(css, "loaderOptions", &mut errors);
                if let Some(extract) = css.get("extract") {
                    if !extract.is_boolean() && !extract.is_object() {
                        errors.push(format!(
                            "\"css.extract\" should be a boolean or an object, got {}",
                            json_type_name(extract)
                        ));
                    }
                }
            }
            None => errors.push(format!(
                "\"css\" should be an object, got {}",
                json_type_name(css)
            )),
        }
    }

    errors
}

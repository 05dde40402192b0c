//! Chainable bundler configuration.
//!
//! `ChainedConfig` is the intermediate, composable representation plugins
//! mutate before it is converted into the final plain configuration object.
//! Rules are addressed by name, and the name is serialized as part of each
//! rule value so it survives later deep merges and stays visible to the
//! inspect command.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::config::merge::merge;

/// Output section of the chained configuration.
#[derive(Debug, Clone, Default)]
pub struct OutputChain {
    pub path: Option<String>,
    pub public_path: Option<String>,
    pub filename: Option<String>,
}

/// A named bundler plugin entry.
#[derive(Debug, Clone)]
pub struct NamedPlugin {
    pub name: String,
    pub options: Value,
}

/// A single loader use within a rule.
#[derive(Debug, Clone)]
pub struct LoaderUse {
    pub name: String,
    pub loader: String,
    pub options: Value,
}

/// A named module rule, optionally with nested one-of branches.
#[derive(Debug, Clone, Default)]
pub struct ChainedRule {
    name: String,
    test: Option<String>,
    include: Vec<String>,
    exclude: Vec<String>,
    uses: Vec<LoaderUse>,
    one_of: Vec<ChainedRule>,
}

impl ChainedRule {
    fn named(name: &str) -> Self {
        ChainedRule {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the rule's test pattern.
    pub fn test(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.test = Some(pattern.into());
        self
    }

    pub fn include(&mut self, path: impl Into<String>) -> &mut Self {
        self.include.push(path.into());
        self
    }

    pub fn exclude(&mut self, path: impl Into<String>) -> &mut Self {
        self.exclude.push(path.into());
        self
    }

    /// Add or replace a named loader use.
    pub fn use_loader(
        &mut self,
        name: impl Into<String>,
        loader: impl Into<String>,
        options: Value,
    ) -> &mut Self {
        let entry = LoaderUse {
            name: name.into(),
            loader: loader.into(),
            options,
        };
        if let Some(existing) = self.uses.iter_mut().find(|u| u.name == entry.name) {
            *existing = entry;
        } else {
            self.uses.push(entry);
        }
        self
    }

    /// Get or create a named one-of branch.
    pub fn one_of(&mut self, name: &str) -> &mut ChainedRule {
        if let Some(i) = self.one_of.iter().position(|r| r.name == name) {
            &mut self.one_of[i]
        } else {
            self.one_of.push(ChainedRule::named(name));
            self.one_of.last_mut().unwrap()
        }
    }

    fn to_value(&self) -> Value {
        let mut rule = Map::new();
        rule.insert("name".to_string(), json!(self.name));
        if let Some(test) = &self.test {
            rule.insert("test".to_string(), json!(test));
        }
        if !self.include.is_empty() {
            rule.insert("include".to_string(), json!(self.include));
        }
        if !self.exclude.is_empty() {
            rule.insert("exclude".to_string(), json!(self.exclude));
        }
        if !self.uses.is_empty() {
            let uses: Vec<Value> = self
                .uses
                .iter()
                .map(|u| json!({ "loader": u.loader, "options": u.options }))
                .collect();
            rule.insert("use".to_string(), Value::Array(uses));
        }
        if !self.one_of.is_empty() {
            let branches: Vec<Value> = self.one_of.iter().map(|r| r.to_value()).collect();
            rule.insert("oneOf".to_string(), Value::Array(branches));
        }
        Value::Object(rule)
    }
}

/// The chainable configuration accumulated by plugin chain mutators.
#[derive(Debug, Clone, Default)]
pub struct ChainedConfig {
    mode: Option<String>,
    context: Option<PathBuf>,
    entries: IndexMap<String, Vec<String>>,
    output: OutputChain,
    resolve_alias: IndexMap<String, String>,
    resolve_extensions: Vec<String>,
    rules: Vec<ChainedRule>,
    plugins: Vec<NamedPlugin>,
    devtool: Option<String>,
    optimization: Map<String, Value>,
    extras: Map<String, Value>,
}

impl ChainedConfig {
    pub fn new() -> Self {
        ChainedConfig::default()
    }

    pub fn mode(&mut self, mode: impl Into<String>) -> &mut Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn context(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.context = Some(path.into());
        self
    }

    /// Get or create a named entry point's file list.
    pub fn entry(&mut self, name: &str) -> &mut Vec<String> {
        self.entries.entry(name.to_string()).or_default()
    }

    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn output_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.output.path = Some(path.into());
        self
    }

    pub fn output_public_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.output.public_path = Some(path.into());
        self
    }

    pub fn output_filename(&mut self, filename: impl Into<String>) -> &mut Self {
        self.output.filename = Some(filename.into());
        self
    }

    pub fn alias(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.resolve_alias.insert(from.into(), to.into());
        self
    }

    /// Register a resolvable extension, keeping insertion order, no dupes.
    pub fn extension(&mut self, ext: impl Into<String>) -> &mut Self {
        let ext = ext.into();
        if !self.resolve_extensions.contains(&ext) {
            self.resolve_extensions.push(ext);
        }
        self
    }

    /// Get or create a named module rule.
    pub fn rule(&mut self, name: &str) -> &mut ChainedRule {
        if let Some(i) = self.rules.iter().position(|r| r.name == name) {
            &mut self.rules[i]
        } else {
            self.rules.push(ChainedRule::named(name));
            self.rules.last_mut().unwrap()
        }
    }

    /// Add or replace a named bundler plugin.
    pub fn plugin(&mut self, name: impl Into<String>, options: Value) -> &mut Self {
        let entry = NamedPlugin {
            name: name.into(),
            options,
        };
        if let Some(existing) = self.plugins.iter_mut().find(|p| p.name == entry.name) {
            *existing = entry;
        } else {
            self.plugins.push(entry);
        }
        self
    }

    pub fn devtool(&mut self, devtool: impl Into<String>) -> &mut Self {
        self.devtool = Some(devtool.into());
        self
    }

    pub fn optimization(&mut self, key: &str, value: Value) -> &mut Self {
        self.optimization.insert(key.to_string(), value);
        self
    }

    /// Raw escape hatch: set an arbitrary top-level key, merged last.
    pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
        self.extras.insert(key.to_string(), value);
        self
    }

    /// Convert the chained representation into a plain configuration object.
    pub fn to_config(&self) -> Value {
        let mut config = Map::new();

        if let Some(mode) = &self.mode {
            config.insert("mode".to_string(), json!(mode));
        }
        if let Some(context) = &self.context {
            config.insert("context".to_string(), json!(context.display().to_string()));
        }
        if !self.entries.is_empty() {
            let mut entries = Map::new();
            for (name, files) in &self.entries {
                entries.insert(name.clone(), json!(files));
            }
            config.insert("entry".to_string(), Value::Object(entries));
        }

        let mut output = Map::new();
        if let Some(path) = &self.output.path {
            output.insert("path".to_string(), json!(path));
        }
        if let Some(public_path) = &self.output.public_path {
            output.insert("publicPath".to_string(), json!(public_path));
        }
        if let Some(filename) = &self.output.filename {
            output.insert("filename".to_string(), json!(filename));
        }
        config.insert("output".to_string(), Value::Object(output));

        if !self.resolve_alias.is_empty() || !self.resolve_extensions.is_empty() {
            let mut resolve = Map::new();
            if !self.resolve_alias.is_empty() {
                let mut alias = Map::new();
                for (from, to) in &self.resolve_alias {
                    alias.insert(from.clone(), json!(to));
                }
                resolve.insert("alias".to_string(), Value::Object(alias));
            }
            if !self.resolve_extensions.is_empty() {
                resolve.insert("extensions".to_string(), json!(self.resolve_extensions));
            }
            config.insert("resolve".to_string(), Value::Object(resolve));
        }

        if !self.rules.is_empty() {
            let rules: Vec<Value> = self.rules.iter().map(|r| r.to_value()).collect();
            config.insert("module".to_string(), json!({ "rules": rules }));
        }

        if !self.plugins.is_empty() {
            let plugins: Vec<Value> = self
                .plugins
                .iter()
                .map(|p| json!({ "name": p.name, "options": p.options }))
                .collect();
            config.insert("plugins".to_string(), Value::Array(plugins));
        }

        if let Some(devtool) = &self.devtool {
            config.insert("devtool".to_string(), json!(devtool));
        }
        if !self.optimization.is_empty() {
            config.insert(
                "optimization".to_string(),
                Value::Object(self.optimization.clone()),
            );
        }

        let mut config = Value::Object(config);
        if !self.extras.is_empty() {
            config = merge(config, Value::Object(self.extras.clone()));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_get_or_create() {
        let mut config = ChainedConfig::new();
        config.rule("js").test(r"\.js$");
        config.rule("js").exclude("node_modules");

        let value = config.to_config();
        let rules = value["module"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0]["name"], "js");
        assert_eq!(rules[0]["test"], r"\.js$");
        assert_eq!(rules[0]["exclude"][0], "node_modules");
    }

    #[test]
    fn test_rule_name_survives_in_value() {
        let mut config = ChainedConfig::new();
        {
            let css = config.rule("css");
            css.test(r"\.css$");
            css.one_of("modules").test(r"\.module\.css$");
            css.one_of("normal");
        }

        let value = config.to_config();
        let rule = &value["module"]["rules"][0];
        assert_eq!(rule["name"], "css");
        assert_eq!(rule["oneOf"][0]["name"], "modules");
        assert_eq!(rule["oneOf"][1]["name"], "normal");
    }

    #[test]
    fn test_use_loader_replaces_by_name() {
        let mut config = ChainedConfig::new();
        config
            .rule("js")
            .use_loader("babel", "babel-loader", json!({}));
        config
            .rule("js")
            .use_loader("babel", "babel-loader", json!({ "cacheDirectory": true }));

        let value = config.to_config();
        let uses = value["module"]["rules"][0]["use"].as_array().unwrap();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0]["options"]["cacheDirectory"], true);
    }

    #[test]
    fn test_entry_order_preserved() {
        let mut config = ChainedConfig::new();
        config.entry("app").push("./src/main.js".to_string());
        config.entry("vendor").push("./src/vendor.js".to_string());

        let value = config.to_config();
        let keys: Vec<&String> = value["entry"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["app", "vendor"]);
    }

    #[test]
    fn test_extras_merge_last() {
        let mut config = ChainedConfig::new();
        config.output_public_path("/");
        config.set("output", json!({ "publicPath": "/cdn/" }));

        let value = config.to_config();
        assert_eq!(value["output"]["publicPath"], "/cdn/");
    }
}

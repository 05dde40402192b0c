//! The `inspect` command: print the resolved configuration, or a selected
//! part of it, as pretty JSON.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::plugin::ServicePlugin;
use crate::service::{Command, CommandArgs, Service};

pub fn plugin() -> ServicePlugin {
    ServicePlugin::new("built-in:commands/inspect", |api, _options| {
        api.register_command(
            "inspect",
            Command::new("inspect the resolved bundler configuration", inspect)
                .with_usage("bosun inspect [options] [...paths]")
                .with_option("--mode", "specify env mode (default: development)")
                .with_option("--rule <name>", "inspect a specific module rule")
                .with_option("--plugin <name>", "inspect a specific plugin")
                .with_option("--rules", "list all module rule names")
                .with_option("--plugins", "list all plugin names"),
        );
        Ok(())
    })
    .with_default_mode("inspect", "development")
}

fn inspect(service: &Service, args: &CommandArgs, _raw: &[String]) -> Result<()> {
    let resolved = service.resolve_webpack_config(None)?;
    let config = &resolved.config;

    let selected = if args.bool("rules") {
        names_of(config.pointer("/module/rules"))
    } else if args.bool("plugins") {
        names_of(config.get("plugins"))
    } else if let Some(name) = args.string("rule") {
        find_named(config.pointer("/module/rules"), name)
    } else if let Some(name) = args.string("plugin") {
        find_named(config.get("plugins"), name)
    } else if !args.positionals.is_empty() {
        let parts: Vec<Value> = args
            .positionals
            .iter()
            .map(|path| select_path(config, path))
            .collect();
        if parts.len() == 1 {
            parts.into_iter().next().unwrap_or(Value::Null)
        } else {
            Value::Array(parts)
        }
    } else {
        config.clone()
    };

    let rendered =
        serde_json::to_string_pretty(&selected).context("failed to render configuration")?;
    service.shell().log(rendered);
    Ok(())
}

fn names_of(list: Option<&Value>) -> Value {
    let names: Vec<Value> = list
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("name").cloned())
                .collect()
        })
        .unwrap_or_default();
    Value::Array(names)
}

fn find_named(list: Option<&Value>, name: &str) -> Value {
    list.and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .find(|item| item.get("name").and_then(Value::as_str) == Some(name))
        })
        .cloned()
        .unwrap_or(Value::Null)
}

/// Walk a dot-separated path into the configuration. Numeric segments index
/// into arrays.
fn select_path(config: &Value, path: &str) -> Value {
    let mut current = config;
    for segment in path.split('.') {
        let next = match current {
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => current.get(segment),
        };
        match next {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_path() {
        let config = json!({
            "output": { "publicPath": "/app/" },
            "module": { "rules": [{ "name": "js" }] }
        });
        assert_eq!(select_path(&config, "output.publicPath"), json!("/app/"));
        assert_eq!(select_path(&config, "module.rules.0.name"), json!("js"));
        assert_eq!(select_path(&config, "missing.path"), Value::Null);
    }

    #[test]
    fn test_names_of() {
        let rules = json!([{ "name": "js" }, { "name": "css" }]);
        assert_eq!(names_of(Some(&rules)), json!(["js", "css"]));
        assert_eq!(names_of(None), json!([]));
    }

    #[test]
    fn test_find_named() {
        let plugins = json!([{ "name": "html", "options": {} }]);
        assert_eq!(
            find_named(Some(&plugins), "html")["options"],
            json!({})
        );
        assert_eq!(find_named(Some(&plugins), "copy"), Value::Null);
    }
}

//! CSS rule configuration: the module/plain split, source maps, and
//! extraction.

use serde_json::{json, Value};

use crate::config::merge;
use crate::plugin::ServicePlugin;

pub fn plugin() -> ServicePlugin {
    ServicePlugin::new("built-in:config/css", |api, options| {
        let css = options.css.clone();
        let production = api.mode() == Some("production");

        // Extraction defaults on for production; an object form carries
        // plugin options and implies extraction.
        let extract = match &css.extract {
            Some(Value::Bool(enabled)) => *enabled,
            Some(Value::Object(_)) => true,
            _ => production,
        };
        let extract_options = match &css.extract {
            Some(Value::Object(options)) => Value::Object(options.clone()),
            _ => json!({}),
        };

        let loader_options = match &css.loader_options {
            Value::Object(_) => css.loader_options.clone(),
            _ => json!({}),
        };
        let base_options = merge(
            json!({ "sourceMap": css.source_map }),
            loader_options.get("css").cloned().unwrap_or_else(|| json!({})),
        );
        let require_module_extension = css.require_module_extension;

        api.chain_webpack(move |config| {
            let rule = config.rule("css");
            rule.test(r"\.css$");
            if require_module_extension {
                let modules = rule.one_of("css-modules");
                modules.test(r"\.module\.css$");
                modules.use_loader(
                    "css",
                    "css-loader",
                    merge(base_options.clone(), json!({ "modules": true })),
                );
                rule.one_of("normal")
                    .use_loader("css", "css-loader", base_options.clone());
            } else {
                // Every file is treated as a CSS module.
                rule.use_loader(
                    "css",
                    "css-loader",
                    merge(base_options.clone(), json!({ "modules": true })),
                );
            }
            if extract {
                config.plugin("extract-css", extract_options.clone());
            }
        });
        Ok(())
    })
}

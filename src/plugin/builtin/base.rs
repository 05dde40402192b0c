//! Base configuration shared by every mode: context, the default app
//! entry, output location, module resolution, and the script rule.

use serde_json::json;

use crate::plugin::ServicePlugin;

pub fn plugin() -> ServicePlugin {
    ServicePlugin::new("built-in:config/base", |api, options| {
        let context = api.context_root().to_path_buf();
        let output_path = api.resolve(&options.output_dir).display().to_string();
        let public_path = options.public_path.clone();
        let src = api.resolve("src").display().to_string();
        let transpile = options.transpile_dependencies.clone();

        api.chain_webpack(move |config| {
            config.mode("development");
            config.context(context.clone());
            if !config.has_entries() {
                config.entry("app").push("./src/main.js".to_string());
            }
            config.output_path(output_path.clone());
            config.output_public_path(public_path.clone());
            config.output_filename("[name].js");

            config.alias("@", src.clone());
            config.extension(".mjs");
            config.extension(".js");
            config.extension(".json");

            let js = config.rule("js");
            js.test(r"\.m?jsx?$");
            js.include(src.clone());
            for dep in &transpile {
                js.include(format!("node_modules/{}", dep));
            }
            js.use_loader("babel", "babel-loader", json!({ "cacheDirectory": true }));
        });
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainedConfig;
    use crate::core::ProjectDescriptor;
    use crate::env::EnvStore;
    use crate::service::{PluginApi, Service, ServiceOptions};
    use crate::util::Shell;

    fn chain_base(options_json: serde_json::Value) -> ChainedConfig {
        let mut service = Service::new(
            "/proj",
            ServiceOptions::default()
                .with_pkg(ProjectDescriptor::default())
                .with_plugins(vec![])
                .without_built_ins()
                .with_env(EnvStore::empty())
                .with_shell(Shell::capturing()),
        )
        .unwrap();
        let options = crate::options::ProjectOptions::from_value(
            crate::options::apply_defaults(options_json, crate::options::defaults()),
            &Shell::capturing(),
        );
        let plugin = plugin();
        {
            let mut api = PluginApi::new(&plugin.id, &mut service);
            (plugin.apply)(&mut api, &options).unwrap();
        }
        service.init(None).unwrap();
        service.resolve_chainable_config().unwrap()
    }

    #[test]
    fn test_base_defaults() {
        let config = chain_base(json!({})).to_config();
        assert_eq!(config["entry"]["app"][0], "./src/main.js");
        assert_eq!(config["output"]["publicPath"], "/");
        assert_eq!(config["mode"], "development");
        assert_eq!(config["resolve"]["alias"]["@"], "/proj/src");
    }

    #[test]
    fn test_transpile_dependencies_included() {
        let config =
            chain_base(json!({ "transpileDependencies": ["some-es-module"] })).to_config();
        let include = config["module"]["rules"][0]["include"].as_array().unwrap();
        assert!(include
            .iter()
            .any(|v| v == "node_modules/some-es-module"));
    }
}

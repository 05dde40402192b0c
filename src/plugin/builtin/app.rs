//! App-target configuration: the HTML page plugin and static asset
//! copying. Skipped entirely for non-app build targets.

use serde_json::json;

use crate::plugin::ServicePlugin;

pub fn plugin() -> ServicePlugin {
    ServicePlugin::new("built-in:config/app", |api, options| {
        if api
            .env()
            .get("BOSUN_BUILD_TARGET")
            .is_some_and(|target| target != "app")
        {
            return Ok(());
        }

        let title = api
            .pkg()
            .name
            .clone()
            .unwrap_or_else(|| "bosun app".to_string());
        let index_path = options.index_path.clone();
        let has_public = api.resolve("public").is_dir();

        api.chain_webpack(move |config| {
            config.plugin(
                "html",
                json!({
                    "title": title,
                    "template": "public/index.html",
                    "filename": index_path,
                }),
            );
            if has_public {
                config.plugin(
                    "copy",
                    json!({
                        "patterns": [{
                            "from": "public",
                            "globOptions": { "ignore": ["**/index.html"] }
                        }]
                    }),
                );
            }
        });
        Ok(())
    })
}

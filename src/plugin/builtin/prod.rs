//! Production-mode overrides: minification, source maps, and hashed
//! output filenames.

use serde_json::json;

use crate::plugin::ServicePlugin;

pub fn plugin() -> ServicePlugin {
    ServicePlugin::new("built-in:config/prod", |api, options| {
        if api.mode() != Some("production") {
            return Ok(());
        }
        let source_map = options.production_source_map;
        let hashing = options.filename_hashing;

        api.chain_webpack(move |config| {
            config.mode("production");
            if source_map {
                config.devtool("source-map");
            }
            if hashing {
                config.output_filename("[name].[contenthash:8].js");
            }
            config.optimization("minimize", json!(true));
        });
        Ok(())
    })
}

//! The `build` command: materialize the production configuration and write
//! the build artifact to the output directory.

use anyhow::{Context, Result};

use crate::plugin::ServicePlugin;
use crate::service::{Command, CommandArgs, Service};

/// File name of the materialized configuration artifact.
pub const BUILD_ARTIFACT: &str = "build-config.json";

pub fn plugin() -> ServicePlugin {
    ServicePlugin::new("built-in:commands/build", |api, _options| {
        api.register_command(
            "build",
            Command::new("produce the production build configuration", build)
                .with_usage("bosun build [options]")
                .with_option("--mode", "specify env mode (default: production)")
                .with_option("--dest", "specify output directory (default: dist)")
                .with_option("--watch", "resolve in development mode")
                .with_option("--report", "list resolved entry files"),
        );
        Ok(())
    })
    .with_default_mode("build", "production")
}

fn build(service: &Service, args: &CommandArgs, _raw: &[String]) -> Result<()> {
    let resolved = service.resolve_webpack_config(None)?;
    service.publish(&resolved);

    let options = service.options();
    let dest = args.string("dest").unwrap_or(&options.output_dir);
    let out_dir = service.context().resolve(dest);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    let artifact = out_dir.join(BUILD_ARTIFACT);
    let rendered = serde_json::to_string_pretty(&resolved.config)
        .context("failed to render resolved configuration")?;
    std::fs::write(&artifact, rendered)
        .with_context(|| format!("failed to write {}", artifact.display()))?;

    let shell = service.shell();
    shell.status(
        "Building",
        format!("in {} mode", resolved.mode.as_deref().unwrap_or("default")),
    );
    shell.log(format!(
        "Build configuration written to {}.",
        artifact.display()
    ));
    if args.bool("report") {
        for file in &resolved.entry_files {
            shell.log(format!("  entry {}", file.display()));
        }
    }
    Ok(())
}

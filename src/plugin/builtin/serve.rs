//! The `serve` command: materialize the development configuration and
//! report the resolved server address.

use anyhow::Result;
use serde_json::Value;

use crate::plugin::ServicePlugin;
use crate::service::{Command, CommandArgs, Service};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: i64 = 8080;

pub fn plugin() -> ServicePlugin {
    ServicePlugin::new("built-in:commands/serve", |api, _options| {
        api.register_command(
            "serve",
            Command::new("start the development server", serve)
                .with_usage("bosun serve [options] [entry]")
                .with_option("--mode", "specify env mode (default: development)")
                .with_option("--host", format!("specify host (default: {})", DEFAULT_HOST))
                .with_option("--port", format!("specify port (default: {})", DEFAULT_PORT))
                .with_option("--https", "use https")
                .with_option("--open", "open browser on server start")
                .with_option("--public", "specify the public network URL"),
        );
        Ok(())
    })
    .with_default_mode("serve", "development")
}

fn serve(service: &Service, args: &CommandArgs, _raw: &[String]) -> Result<()> {
    let mut chained = service.resolve_chainable_config()?;
    // An explicit entry argument replaces the default app entry.
    if let Some(entry) = args.positionals.first() {
        let files = chained.entry("app");
        files.clear();
        files.push(entry.clone());
    }
    let resolved = service.resolve_webpack_config(Some(chained))?;
    service.publish(&resolved);

    let dev_server = service.dev_server_config()?;
    let https = args.bool("https")
        || dev_server
            .get("https")
            .and_then(Value::as_bool)
            .unwrap_or(false);
    let protocol = if https { "https" } else { "http" };
    let host = args
        .string("host")
        .map(str::to_string)
        .or_else(|| {
            dev_server
                .get("host")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args
        .flags
        .get("port")
        .and_then(Value::as_i64)
        .or_else(|| dev_server.get("port").and_then(Value::as_i64))
        .unwrap_or(DEFAULT_PORT);
    let display_host = if host == DEFAULT_HOST { "localhost" } else { host.as_str() };
    let public = args
        .string("public")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}://{}:{}", protocol, display_host, port));

    let shell = service.shell();
    shell.status("Starting", format!("development server at {}/", public));
    shell.log(format!(
        "  App running at: {}{}",
        public,
        service.options().public_path
    ));
    for file in &resolved.entry_files {
        tracing::debug!(entry = %file.display(), "serving entry");
    }
    Ok(())
}

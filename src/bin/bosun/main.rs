//! Bosun CLI - a plugin-based build orchestrator for web projects

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bosun::core::{check_engine, resolve_descriptor};
use bosun::{CommandArgs, Service, ServiceOptions};

mod cli;

use cli::Cli;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let args = CommandArgs::parse(&cli.args);

    // Set up logging
    let filter = if args.bool("verbose") {
        EnvFilter::new("bosun=debug")
    } else {
        EnvFilter::new("bosun=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let context = match std::env::var_os("BOSUN_CONTEXT") {
        Some(dir) => std::path::PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    // Gate on the project's declared engine range before doing any work.
    let (pkg, _) = resolve_descriptor(&context)?;
    check_engine(&pkg)?;

    let mut service = Service::new(&context, ServiceOptions::default())?;
    let name = args.command().map(str::to_string);
    service.run(name.as_deref(), args, &cli.args)
}

//! The `help` command: list registered commands, or print usage for one.

use anyhow::Result;

use crate::plugin::ServicePlugin;
use crate::service::{Command, CommandArgs, Service};

pub fn plugin() -> ServicePlugin {
    ServicePlugin::new("built-in:commands/help", |api, _options| {
        api.register_command(
            "help",
            Command::new("print usage information", help)
                .with_usage("bosun help [command]"),
        );
        Ok(())
    })
}

fn help(service: &Service, args: &CommandArgs, _raw: &[String]) -> Result<()> {
    match args.positionals.first() {
        Some(name) => match service.commands().get(name.as_str()) {
            Some(command) => log_command_help(service, name, command),
            None => {
                service
                    .shell()
                    .error(format!("command \"{}\" does not exist.", name));
                log_main_help(service);
            }
        },
        None => log_main_help(service),
    }
    Ok(())
}

fn log_main_help(service: &Service) {
    let shell = service.shell();
    shell.log("\n  Usage: bosun <command> [options]\n");
    shell.log("  Commands:\n");
    let width = service
        .commands()
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(0);
    for (name, command) in service.commands() {
        shell.log(format!(
            "    {:<width$}    {}",
            name,
            command.description,
            width = width
        ));
    }
    shell.log("\n  run bosun help [command] for usage of a specific command.\n");
}

fn log_command_help(service: &Service, name: &str, command: &Command) {
    let shell = service.shell();
    let usage = command
        .usage
        .clone()
        .unwrap_or_else(|| format!("bosun {} [options]", name));
    shell.log(format!("\n  Usage: {}\n", usage));
    if !command.options.is_empty() {
        shell.log("  Options:\n");
        let width = command
            .options
            .iter()
            .map(|(flag, _)| flag.len())
            .max()
            .unwrap_or(0);
        for (flag, description) in &command.options {
            shell.log(format!(
                "    {:<width$}    {}",
                flag,
                description,
                width = width
            ));
        }
        shell.log("");
    }
}

//! `help` unit: lists commands or describes one of them.

use numberone_dispatch::{
    Args, CommandDefinition, CommandHandler, MessageContext, ParamType, RegistrationError, Scope,
    Signature, UnitRegistrar,
};

use crate::unit::ExtensionUnit;

pub const UNIT_NAME: &str = "help";

const PATTERN: &str = r"(?P<cmd_name>\S+)?";

pub struct HelpUnit;

impl ExtensionUnit for HelpUnit {
    fn name(&self) -> &str {
        UNIT_NAME
    }

    fn register(&self, registrar: &mut UnitRegistrar<'_>) -> Result<(), RegistrationError> {
        registrar.register_command(
            Scope::any(),
            Scope::any(),
            PATTERN,
            CommandHandler::suspending(
                Signature::new("help_")
                    .optional_param("cmd_name", ParamType::Str)
                    .description("Show the list of commands, or the help for a specific command."),
                help,
            ),
        )
    }
}

async fn help(ctx: MessageContext, args: Args) -> anyhow::Result<()> {
    let text = match args.str("cmd_name") {
        None => format!(
            "Available commands: {}",
            ctx.commands().command_names().join(" ")
        ),
        Some(name) => match ctx.commands().command(name) {
            Some(command) => describe(command, ctx.prefix()),
            None => format!(
                "{}, the command \"{name}\" does not exist",
                ctx.message.author_mention()
            ),
        },
    };
    ctx.reply(&text).await
}

/// Multi-line description of `command` as shown by `help <name>`.
pub fn describe(command: &CommandDefinition, prefix: &str) -> String {
    let description = command
        .description()
        .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_else(|| "Nobody wrote a description for this one...".to_string());
    let channels = if command.channels.is_restricted() {
        command.channels.to_string()
    } else {
        "*anywhere*".to_string()
    };
    let roles = if command.roles.is_restricted() {
        command.roles.to_string()
    } else {
        "*everyone*".to_string()
    };
    let pattern = command
        .pattern
        .as_ref()
        .map_or_else(|| "*N/A*".to_string(), |p| format!("`{}`", p.source()));

    format!(
        "Command **{name}**: {description}\nUsable in: {channels}\nUsable by: {roles}\nArgument \
         pattern: {pattern}\nUsage: ```\n{usage}```",
        name = command.name,
        usage = command.usage(prefix),
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use numberone_dispatch::{DispatchOutcome, Dispatcher, DispatcherBuilder};

    use {
        super::*,
        crate::{
            bundled::ping::PingUnit,
            test_support::{RecordingOutbound, message},
        },
    };

    fn dispatcher(outbound: &Arc<RecordingOutbound>) -> Dispatcher {
        let mut builder = DispatcherBuilder::new("root");
        builder
            .register_unit("ping", |r| PingUnit.register(r))
            .unwrap();
        builder
            .register_unit(UNIT_NAME, |r| HelpUnit.register(r))
            .unwrap();
        builder
            .register_command(
                Scope::only(["ops"]),
                Scope::only(["admin"]),
                r"(?P<target>\S+)",
                CommandHandler::blocking(Signature::new("kick").untyped_param("target"), |_, _| {
                    Ok(())
                }),
            )
            .unwrap();
        Dispatcher::new(Arc::new(builder.build()), "!", "bot", outbound.clone())
    }

    #[tokio::test]
    async fn lists_commands_without_argument() {
        let outbound = RecordingOutbound::new();
        let d = dispatcher(&outbound);
        d.dispatch(message("general", "u1", "!help")).await;
        assert_eq!(outbound.texts(), vec!["Available commands: help kick ping"]);
    }

    #[tokio::test]
    async fn describes_a_known_command() {
        let outbound = RecordingOutbound::new();
        let d = dispatcher(&outbound);
        d.dispatch(message("general", "u1", "!help help")).await;
        let text = &outbound.texts()[0];
        assert!(text.starts_with("Command **help**: Show the list of commands"));
        assert!(text.contains("Usable in: *anywhere*"));
        assert!(text.contains("Usable by: *everyone*"));
        assert!(text.contains(r"`(?P<cmd_name>\S+)?`"));
        assert!(text.ends_with("!help [cmd_name]```"));
    }

    #[tokio::test]
    async fn describes_restrictions_and_required_args() {
        let outbound = RecordingOutbound::new();
        let d = dispatcher(&outbound);
        d.dispatch(message("general", "u1", "!help kick")).await;
        let text = &outbound.texts()[0];
        assert!(text.contains("Nobody wrote a description"));
        assert!(text.contains("Usable in: ops"));
        assert!(text.contains("Usable by: admin"));
        assert!(text.contains("!kick <target>"));
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let outbound = RecordingOutbound::new();
        let d = dispatcher(&outbound);
        let outcome = d.dispatch(message("general", "u1", "!help frobnicate")).await;
        assert_eq!(outcome, DispatchOutcome::Completed { name: "help".into() });
        assert_eq!(outbound.texts(), vec![
            "<@u1>, the command \"frobnicate\" does not exist"
        ]);
    }

    #[test]
    fn command_without_pattern_has_no_pattern_line() {
        let mut builder = DispatcherBuilder::new("root");
        builder
            .register_unit("ping", |r| PingUnit.register(r))
            .unwrap();
        let def = builder.build();
        let text = describe(def.command("ping").unwrap(), "?");
        assert!(text.contains("Argument pattern: *N/A*"));
        assert!(text.ends_with("?ping```"));
    }
}

//! `ping` unit: liveness check.

use numberone_dispatch::{CommandHandler, RegistrationError, Scope, Signature, UnitRegistrar};

use crate::unit::ExtensionUnit;

pub const UNIT_NAME: &str = "ping";

pub struct PingUnit;

impl ExtensionUnit for PingUnit {
    fn name(&self) -> &str {
        UNIT_NAME
    }

    fn register(&self, registrar: &mut UnitRegistrar<'_>) -> Result<(), RegistrationError> {
        registrar.register_command(
            Scope::any(),
            Scope::any(),
            "",
            CommandHandler::suspending(
                Signature::new("ping").description("Check that the bot is alive."),
                |ctx, _| async move { ctx.reply("Pong!").await },
            ),
        )
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use numberone_dispatch::{DispatchOutcome, Dispatcher, DispatcherBuilder};

    use {
        super::*,
        crate::test_support::{RecordingOutbound, message},
    };

    #[tokio::test]
    async fn ping_replies_pong() {
        let mut builder = DispatcherBuilder::new("root");
        builder
            .register_unit(UNIT_NAME, |r| PingUnit.register(r))
            .unwrap();
        let outbound = RecordingOutbound::new();
        let dispatcher = Dispatcher::new(Arc::new(builder.build()), "!", "bot", outbound.clone());

        let outcome = dispatcher.dispatch(message("general", "u1", "!ping")).await;
        assert_eq!(outcome, DispatchOutcome::Completed { name: "ping".into() });
        assert_eq!(outbound.texts(), vec!["Pong!"]);
    }
}

use std::sync::Arc;

use {
    secrecy::{ExposeSecret, Secret},
    serenity::{Client, all::ShardManager},
    tracing::info,
};

use numberone_channels::{Error, EventSender, Result};

use crate::{handler::DiscordHandler, outbound::DiscordOutbound};

/// A configured, not yet started, gateway connection.
pub struct DiscordSession {
    client: Client,
}

impl DiscordSession {
    /// Build the serenity client. Events are delivered to `events`.
    pub async fn connect(
        token: &Secret<String>,
        status: impl Into<String>,
        events: EventSender,
    ) -> Result<Self> {
        let token = token.expose_secret().trim();
        if token.is_empty() {
            return Err(Error::invalid_input("discord token is empty"));
        }
        let client = Client::builder(token, DiscordHandler::intents())
            .event_handler(DiscordHandler::new(events, status))
            .await
            .map_err(|e| Error::external("discord client setup", e))?;
        Ok(Self { client })
    }

    pub fn outbound(&self) -> Arc<DiscordOutbound> {
        Arc::new(DiscordOutbound::new(Arc::clone(&self.client.http)))
    }

    /// Handle used to stop the gateway from another task.
    pub fn shard_manager(&self) -> Arc<ShardManager> {
        Arc::clone(&self.client.shard_manager)
    }

    /// Run the gateway until the shards stop.
    pub async fn run(mut self) -> Result<()> {
        info!("starting discord gateway");
        self.client
            .start()
            .await
            .map_err(|e| Error::external("discord gateway", e))
    }
}

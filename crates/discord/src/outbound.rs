use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::all::{ChannelId, Http},
    tracing::debug,
};

use numberone_channels::{ChannelOutbound, Error, ReplyTarget, Result};

/// Sends replies through the Discord REST API.
pub struct DiscordOutbound {
    http: Arc<Http>,
}

impl DiscordOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

pub(crate) fn parse_channel_id(raw: &str) -> Result<ChannelId> {
    let id: u64 = raw.parse()?;
    if id == 0 {
        return Err(Error::invalid_input(format!("invalid discord channel id {raw:?}")));
    }
    Ok(ChannelId::new(id))
}

#[async_trait]
impl ChannelOutbound for DiscordOutbound {
    async fn send_reply(&self, target: &ReplyTarget, text: &str) -> Result<()> {
        let channel = parse_channel_id(&target.channel_id)?;
        channel
            .say(&self.http, text)
            .await
            .map_err(|e| Error::external("discord send message", e))?;
        debug!(channel = %target.channel_id, len = text.len(), "reply sent");
        Ok(())
    }
}

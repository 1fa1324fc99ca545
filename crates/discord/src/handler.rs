//! Discord event handler for serenity.
//!
//! Translates gateway events into [`SessionEvent`]s for the dispatch loop.

use {
    serenity::{
        all::{
            ActivityData, Cache, Context, EventHandler, GatewayIntents, GuildId, Message, Ready,
        },
        async_trait,
    },
    tracing::{debug, info, warn},
};

use numberone_channels::{ChatKind, EventSender, InboundMessage, SessionEvent};

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    pub events: EventSender,
    /// Presence text set on every `ready`.
    pub status: String,
}

impl DiscordHandler {
    pub fn new(events: EventSender, status: impl Into<String>) -> Self {
        Self {
            events,
            status: status.into(),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            warn!("event receiver dropped, discarding discord event");
        }
    }
}

/// Build the transport-neutral view of a Discord message.
pub fn inbound_message(msg: &Message) -> InboundMessage {
    let author_roles = msg
        .member
        .as_ref()
        .map(|member| member.roles.iter().map(|r| r.to_string()).collect())
        .unwrap_or_default();

    InboundMessage {
        channel_id: msg.channel_id.to_string(),
        author_id: msg.author.id.to_string(),
        author_name: Some(msg.author.name.clone()),
        author_roles,
        text: msg.content.clone(),
        chat_kind: chat_kind(msg.guild_id),
        ..Default::default()
    }
}

/// Fill in channel and role names from the gateway cache.
///
/// Scopes may list names as well as IDs. Nothing is resolved for direct
/// messages or guilds the cache has not seen yet.
fn resolve_names(cache: &Cache, msg: &Message, inbound: &mut InboundMessage) {
    let Some(guild_id) = msg.guild_id else {
        return;
    };
    let Some(guild) = cache.guild(guild_id) else {
        debug!(guild_id = %guild_id, "guild not cached, scopes match IDs only");
        return;
    };
    inbound.channel_name = guild.channels.get(&msg.channel_id).map(|c| c.name.clone());
    if let Some(member) = &msg.member {
        inbound.author_role_names = member
            .roles
            .iter()
            .filter_map(|id| guild.roles.get(id))
            .map(|role| role.name.clone())
            .collect();
    }
}

/// Messages outside a guild are direct messages.
fn chat_kind(guild_id: Option<GuildId>) -> ChatKind {
    if guild_id.is_some() {
        ChatKind::Group
    } else {
        ChatKind::Direct
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            bot_user_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        ctx.set_activity(Some(ActivityData::playing(self.status.clone())));

        self.emit(SessionEvent::Ready {
            bot_user_id: ready.user.id.to_string(),
            bot_name: Some(ready.user.name.clone()),
        })
        .await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let mut inbound = inbound_message(&msg);
        resolve_names(&ctx.cache, &msg, &mut inbound);
        self.emit(SessionEvent::Message(inbound)).await;
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<GuildId>) {
        debug!(guild_count = guilds.len(), "discord cache ready");
    }
}

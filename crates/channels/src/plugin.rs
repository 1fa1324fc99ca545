use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tokio::sync::mpsc,
};

use crate::Result;

// ── Inbound ─────────────────────────────────────────────────────────────────

/// Whether a message arrived in a one-to-one conversation or a shared room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// Private/direct message channel.
    Direct,
    /// Public or group channel (guild text channel, group chat, ...).
    #[default]
    Group,
}

impl std::fmt::Display for ChatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// A message received from the messaging service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel_id: String,
    /// Human-readable channel name, when the transport can resolve it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    pub author_id: String,
    /// Display name of the author, for logs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Role identifiers held by the author in the channel's server.
    pub author_roles: Vec<String>,
    /// Names of the same roles, when the transport can resolve them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_role_names: Vec<String>,
    pub text: String,
    pub chat_kind: ChatKind,
}

impl InboundMessage {
    pub fn is_private(&self) -> bool {
        self.chat_kind == ChatKind::Direct
    }

    /// Channel ID then channel name: the keys a channel scope may list.
    pub fn channel_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.channel_id.as_str()).chain(self.channel_name.as_deref())
    }

    /// Role IDs then role names: the keys a role scope may list.
    pub fn role_keys(&self) -> impl Iterator<Item = &str> {
        self.author_roles
            .iter()
            .chain(&self.author_role_names)
            .map(String::as_str)
    }

    /// Where replies to this message go.
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            channel_id: self.channel_id.clone(),
            author_id: self.author_id.clone(),
        }
    }

    /// The `<@id>` token addressing the author.
    pub fn author_mention(&self) -> String {
        mention(&self.author_id)
    }
}

/// Format the mention token for a user ID.
pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Events produced by a transport session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session is authenticated; carries the bot's own account ID.
    /// Transports may emit this more than once (e.g. after a reconnect).
    Ready {
        bot_user_id: String,
        bot_name: Option<String>,
    },
    /// A message arrived in a channel the bot can see.
    Message(InboundMessage),
}

/// Sender end of a session event stream.
pub type EventSender = mpsc::Sender<SessionEvent>;

/// Receiver end of a session event stream.
pub type EventReceiver = mpsc::Receiver<SessionEvent>;

// ── Outbound ────────────────────────────────────────────────────────────────

/// Where to send a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub channel_id: String,
    /// User the reply is addressed to.
    pub author_id: String,
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Send a plain-text reply into `target.channel_id`.
    async fn send_reply(&self, target: &ReplyTarget, text: &str) -> Result<()>;
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use {
    async_trait::async_trait,
    numberone_channels::{ChannelOutbound, ChatKind, InboundMessage, ReplyTarget},
};

use crate::{
    handler::{CommandHandler, ForwardHandler, MessageContext, Signature},
    registry::DispatcherBuilder,
};

pub const BOT_ID: &str = "42";

/// Outbound double that keeps every reply.
#[derive(Default)]
pub struct RecordingOutbound {
    replies: Mutex<Vec<(ReplyTarget, String)>>,
}

impl RecordingOutbound {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replies(&self) -> Vec<(ReplyTarget, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.replies().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send_reply(&self, target: &ReplyTarget, text: &str) -> numberone_channels::Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((target.clone(), text.to_string()));
        Ok(())
    }
}

pub fn message(channel: &str, author: &str, text: &str) -> InboundMessage {
    InboundMessage {
        channel_id: channel.into(),
        author_id: author.into(),
        text: text.into(),
        chat_kind: ChatKind::Group,
        ..Default::default()
    }
}

pub fn context_for(message: InboundMessage, outbound: Arc<RecordingOutbound>) -> MessageContext {
    MessageContext::new(
        message,
        outbound,
        Arc::new(DispatcherBuilder::new("test").build()),
        Arc::from("!"),
    )
}

pub fn noop_command(signature: Signature) -> CommandHandler {
    CommandHandler::blocking(signature, |_, _| Ok(()))
}

pub fn noop_forward(name: &str) -> ForwardHandler {
    ForwardHandler::blocking(name, |_| Ok(()))
}

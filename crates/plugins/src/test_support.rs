#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use {
    async_trait::async_trait,
    numberone_channels::{ChannelOutbound, InboundMessage, ReplyTarget},
};

#[derive(Default)]
pub struct RecordingOutbound {
    texts: Mutex<Vec<String>>,
}

impl RecordingOutbound {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send_reply(
        &self,
        _target: &ReplyTarget,
        text: &str,
    ) -> numberone_channels::Result<()> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub fn message(channel: &str, author: &str, text: &str) -> InboundMessage {
    InboundMessage {
        channel_id: channel.into(),
        author_id: author.into(),
        text: text.into(),
        ..Default::default()
    }
}

//! Transport-facing types for numberone.
//!
//! A transport (Discord, or a test double) turns its native events into
//! [`SessionEvent`]s and implements [`ChannelOutbound`] so the dispatcher can
//! answer without knowing which messaging service it is talking to.

pub mod error;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::{
        ChannelOutbound, ChatKind, EventReceiver, EventSender, InboundMessage, ReplyTarget,
        SessionEvent, mention,
    },
};

//! Per-message interpretation.
//!
//! [`Dispatcher::dispatch`] walks a message through the fixed sequence
//! self-filter → forwards → invocation detection → resolution → channel
//! scope → role scope → pattern → casting → invocation. Every denial ends
//! processing with a reply to the author; nothing escapes as an error.

use std::sync::Arc;

use {
    numberone_channels::{ChannelOutbound, ChatKind, InboundMessage, mention},
    tracing::{debug, error, info, warn},
};

use crate::{
    cast::{Args, cast_with_type_hints},
    handler::MessageContext,
    registry::{CommandDefinition, DispatcherDefinition},
};

/// Reply sent when a handler fails, whatever the cause.
pub const INTERNAL_ERROR_REPLY: &str = "Internal error...";

/// How a command was addressed to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStyle {
    Prefix,
    Mention,
    Direct,
}

/// A detected command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub payload: &'a str,
    pub style: InvocationStyle,
}

/// Split `text` at its first whitespace into command name and payload.
fn split_command(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(at) => (&text[..at], text[at..].trim_start()),
        None => (text, ""),
    }
}

/// Decide whether `text` addresses a command to the bot, and how.
///
/// A prefixed message yields the token right after the prefix, so `"! ping"`
/// names the empty command. A leading `bot_mention` may be followed by
/// whitespace. In a direct chat any other text is a command.
pub fn detect_invocation<'a>(
    text: &'a str,
    prefix: &str,
    bot_mention: &str,
    kind: ChatKind,
) -> Option<Invocation<'a>> {
    if !prefix.is_empty()
        && let Some(rest) = text.strip_prefix(prefix)
    {
        let (name, payload) = split_command(rest);
        return Some(Invocation {
            name,
            payload,
            style: InvocationStyle::Prefix,
        });
    }
    if !bot_mention.is_empty()
        && let Some(rest) = text.strip_prefix(bot_mention)
    {
        let (name, payload) = split_command(rest.trim_start());
        return Some(Invocation {
            name,
            payload,
            style: InvocationStyle::Mention,
        });
    }
    match kind {
        ChatKind::Direct => {
            let (name, payload) = split_command(text.trim_start());
            Some(Invocation {
                name,
                payload,
                style: InvocationStyle::Direct,
            })
        },
        ChatKind::Group => None,
    }
}

/// Where processing of a message ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent by the bot itself.
    OwnMessage,
    /// A forward subscriber disallowed commands on the channel.
    Suppressed,
    /// Not addressed to the bot.
    NotACommand,
    UnknownCommand { name: String },
    ChannelDenied { name: String },
    RoleDenied { name: String },
    /// The payload did not match the command pattern.
    UsageError { name: String },
    Completed { name: String },
    /// The handler or the argument conversion failed.
    Failed { name: String },
}

/// Interprets inbound messages against a frozen registry.
pub struct Dispatcher {
    definition: Arc<DispatcherDefinition>,
    prefix: Arc<str>,
    bot_user_id: String,
    bot_mention: String,
    outbound: Arc<dyn ChannelOutbound>,
}

impl Dispatcher {
    pub fn new(
        definition: Arc<DispatcherDefinition>,
        prefix: impl Into<Arc<str>>,
        bot_user_id: impl Into<String>,
        outbound: Arc<dyn ChannelOutbound>,
    ) -> Self {
        let bot_user_id = bot_user_id.into();
        Self {
            definition,
            prefix: prefix.into(),
            bot_mention: mention(&bot_user_id),
            bot_user_id,
            outbound,
        }
    }

    pub fn definition(&self) -> &Arc<DispatcherDefinition> {
        &self.definition
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn context(&self, message: InboundMessage) -> MessageContext {
        MessageContext::new(
            message,
            Arc::clone(&self.outbound),
            Arc::clone(&self.definition),
            Arc::clone(&self.prefix),
        )
    }

    /// Process one message to completion.
    pub async fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        if message.author_id == self.bot_user_id {
            return DispatchOutcome::OwnMessage;
        }
        debug!(
            channel = %message.channel_id,
            author = %message.author_id,
            kind = %message.chat_kind,
            text = %message.text,
            "inbound message"
        );

        for forward in self.definition.forwards(&message.channel_id) {
            info!(
                channel = %message.channel_id,
                handler = %forward.handler.name,
                "forwarding message"
            );
            if let Err(e) = forward.handler.invoke(self.context(message.clone())).await {
                error!(
                    channel = %message.channel_id,
                    handler = %forward.handler.name,
                    error = %format!("{e:#}"),
                    "forward handler failed"
                );
            }
            if !forward.allow_commands {
                debug!(channel = %message.channel_id, "commands suppressed by forward");
                return DispatchOutcome::Suppressed;
            }
        }

        let Some(invocation) = detect_invocation(
            &message.text,
            &self.prefix,
            &self.bot_mention,
            message.chat_kind,
        ) else {
            return DispatchOutcome::NotACommand;
        };
        let name = invocation.name.to_string();
        let author = message.author_mention();

        let Some(command) = self.definition.command(&name) else {
            warn!(command = %name, author = %message.author_id, "unknown command");
            self.deny(
                &message,
                format!(
                    "{author}, the command \"{name}\" does not exist. Try `{}help` for the list \
                     of commands.",
                    self.prefix
                ),
            )
            .await;
            return DispatchOutcome::UnknownCommand { name };
        };

        if !command.channels.permits_any(message.channel_keys()) {
            warn!(
                command = %name,
                channel = %message.channel_id,
                "command not available in channel"
            );
            self.deny(
                &message,
                format!(
                    "{author}, the command \"{name}\" is only available in the following \
                     channels: {}.",
                    command.channels
                ),
            )
            .await;
            return DispatchOutcome::ChannelDenied { name };
        }

        if !command.roles.permits_any(message.role_keys()) {
            warn!(
                command = %name,
                author = %message.author_id,
                "author lacks a role required by command"
            );
            self.deny(
                &message,
                format!(
                    "{author}, the command \"{name}\" is only available to the following roles: \
                     {}.",
                    command.roles
                ),
            )
            .await;
            return DispatchOutcome::RoleDenied { name };
        }

        let raw = match &command.pattern {
            None => Default::default(),
            Some(pattern) => match pattern.captures(invocation.payload) {
                Some(raw) => raw,
                None => {
                    warn!(
                        command = %name,
                        payload = %invocation.payload,
                        "syntax error in command"
                    );
                    self.deny(
                        &message,
                        format!(
                            "{author}, the command \"{name}\" could not be run because it \
                             expects the following pattern: ```{}```",
                            pattern.source()
                        ),
                    )
                    .await;
                    return DispatchOutcome::UsageError { name };
                },
            },
        };

        let args = match cast_with_type_hints(&command.type_hints, raw) {
            Ok(args) => args,
            Err(e) => {
                error!(command = %name, error = %e, "argument conversion failed");
                self.deny(&message, INTERNAL_ERROR_REPLY.to_string()).await;
                return DispatchOutcome::Failed { name };
            },
        };

        self.invoke(command, message, args).await
    }

    async fn invoke(
        &self,
        command: &CommandDefinition,
        message: InboundMessage,
        args: Args,
    ) -> DispatchOutcome {
        let name = command.name.clone();
        debug!(command = %name, args = ?args, "dispatching command");
        let target = message.reply_target();
        match command
            .handler
            .func
            .invoke(self.context(message), args)
            .await
        {
            Ok(()) => DispatchOutcome::Completed { name },
            Err(e) => {
                error!(command = %name, error = %format!("{e:#}"), "error in dispatched command");
                if let Err(e) = self
                    .outbound
                    .send_reply(&target, INTERNAL_ERROR_REPLY)
                    .await
                {
                    warn!(command = %name, error = %e, "failed to send error reply");
                }
                DispatchOutcome::Failed { name }
            },
        }
    }

    async fn deny(&self, message: &InboundMessage, text: String) {
        if let Err(e) = self
            .outbound
            .send_reply(&message.reply_target(), &text)
            .await
        {
            warn!(channel = %message.channel_id, error = %e, "failed to send reply");
        }
    }
}

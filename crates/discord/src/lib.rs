//! Discord transport for numberone, built on serenity.

pub mod client;
pub mod handler;
pub mod outbound;

pub use {client::DiscordSession, handler::DiscordHandler, outbound::DiscordOutbound};

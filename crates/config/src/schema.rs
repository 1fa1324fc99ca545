//! Config schema types (bot, plugins, discord).

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NumberOneConfig {
    pub bot: BotConfig,
    pub plugins: PluginsConfig,
    pub discord: DiscordConfig,
}

/// Command surface of the bot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Prefix that marks a message as a command, e.g. `!` in `!ping`.
    pub prefix: String,
    /// Presence text shown once connected. `{prefix}` is replaced.
    pub status: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
            status: "{prefix}help".into(),
        }
    }
}

impl BotConfig {
    pub fn status_text(&self) -> String {
        self.status.replace("{prefix}", &self.prefix)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory scanned for manifest units.
    pub dir: PathBuf,
    /// File in `dir` that is never loaded as a unit.
    pub initializer: String,
    /// Bundled units to register, in order.
    pub enabled_bundled: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("plugins"),
            initializer: "init.toml".into(),
            enabled_bundled: vec!["ping".into(), "help".into()],
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token.
    pub token: Option<Secret<String>>,
}

impl DiscordConfig {
    /// True if a non-blank token is configured.
    pub fn has_token(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().trim().is_empty())
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

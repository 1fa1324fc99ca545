//! Configuration loading, validation and env substitution.
//!
//! Config files: `numberone.toml`, `numberone.yaml`, or `numberone.json`
//! Searched in `./` then `~/.config/numberone/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config,
        load_or_discover,
    },
    schema::{BotConfig, DiscordConfig, NumberOneConfig, PluginsConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};

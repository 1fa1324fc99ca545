use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::NumberOneConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "numberone.toml",
    "numberone.yaml",
    "numberone.yml",
    "numberone.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<NumberOneConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path).with_context(|| format!("failed to parse {}", path.display()))
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./numberone.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/numberone/numberone.{toml,yaml,yml,json}` (user-global)
///
/// Returns `NumberOneConfig::default()` if no config file is found.
pub fn discover_and_load() -> NumberOneConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %format!("{e:#}"),
                    "failed to load config, using defaults"
                );
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    NumberOneConfig::default()
}

/// Load `path` if given (failing loudly), else discover.
pub fn load_or_discover(path: Option<&Path>) -> anyhow::Result<NumberOneConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(discover_and_load()),
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/numberone/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "numberone").map(|d| d.config_dir().to_path_buf())
}

/// Apply `NUMBERONE_*` and `DISCORD_TOKEN` environment overrides.
pub fn apply_env_overrides(config: NumberOneConfig) -> NumberOneConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: NumberOneConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> NumberOneConfig {
    if let Some(prefix) = lookup("NUMBERONE_PREFIX") {
        config.bot.prefix = prefix;
    }
    if let Some(dir) = lookup("NUMBERONE_PLUGINS_DIR") {
        config.plugins.dir = PathBuf::from(dir);
    }
    if let Some(token) = lookup("NUMBERONE_DISCORD_TOKEN").or_else(|| lookup("DISCORD_TOKEN")) {
        config.discord.token = Some(Secret::new(token));
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<NumberOneConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn loads_each_format() {
        let tmp = tempfile::tempdir().unwrap();
        let cases = [
            ("numberone.toml", "[bot]\nprefix = \"?\"\n"),
            ("numberone.yaml", "bot:\n  prefix: \"?\"\n"),
            ("numberone.json", r#"{"bot": {"prefix": "?"}}"#),
        ];
        for (name, content) in cases {
            let path = tmp.path().join(name);
            std::fs::write(&path, content).unwrap();
            let cfg = load_config(&path).unwrap();
            assert_eq!(cfg.bot.prefix, "?", "{name}");
            assert_eq!(cfg.plugins.initializer, "init.toml", "{name}");
        }
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("numberone.ini");
        std::fs::write(&path, "prefix=!").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported config format"));
    }

    #[test]
    fn missing_explicit_file_fails() {
        assert!(load_or_discover(Some(Path::new("/nonexistent/numberone.toml"))).is_err());
    }

    #[test]
    fn default_placeholder_survives_missing_env() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("numberone.toml");
        std::fs::write(
            &path,
            "[plugins]\ndir = \"${NUMBERONE_TEST_SURELY_UNSET_DIR:-extensions}\"\n",
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.plugins.dir, PathBuf::from("extensions"));
    }

    #[test]
    fn env_overrides_win() {
        let lookup = |name: &str| match name {
            "NUMBERONE_PREFIX" => Some("$".to_string()),
            "NUMBERONE_PLUGINS_DIR" => Some("/srv/plugins".to_string()),
            "DISCORD_TOKEN" => Some("plain".to_string()),
            "NUMBERONE_DISCORD_TOKEN" => Some("scoped".to_string()),
            _ => None,
        };
        let cfg = apply_env_overrides_with(NumberOneConfig::default(), lookup);
        assert_eq!(cfg.bot.prefix, "$");
        assert_eq!(cfg.plugins.dir, PathBuf::from("/srv/plugins"));
        assert_eq!(cfg.discord.token.unwrap().expose_secret(), "scoped");
    }

    #[test]
    fn discord_token_fallback() {
        let lookup = |name: &str| (name == "DISCORD_TOKEN").then(|| "plain".to_string());
        let cfg = apply_env_overrides_with(NumberOneConfig::default(), lookup);
        assert_eq!(cfg.discord.token.unwrap().expose_secret(), "plain");
        assert_eq!(cfg.bot.prefix, "!");
    }
}

//! Configuration validation.
//!
//! Checks a loaded [`NumberOneConfig`] for values the bot cannot run with.

use std::path::Path;

use secrecy::ExposeSecret;

use crate::schema::NumberOneConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "value", "credentials", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "bot.prefix"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate `config`.
///
/// A missing token is an error when `require_token` is set (the bot is about
/// to connect) and a warning otherwise.
pub fn validate(config: &NumberOneConfig, require_token: bool) -> ValidationResult {
    let mut result = ValidationResult::default();

    let prefix = &config.bot.prefix;
    if prefix.is_empty() {
        result.push(Severity::Error, "value", "bot.prefix", "prefix must not be empty");
    } else if prefix.chars().any(char::is_whitespace) {
        result.push(
            Severity::Error,
            "value",
            "bot.prefix",
            format!("prefix {prefix:?} must not contain whitespace"),
        );
    }

    if config.bot.status.trim().is_empty() {
        result.push(Severity::Info, "value", "bot.status", "presence text is empty");
    }

    let initializer = &config.plugins.initializer;
    if Path::new(initializer).components().count() != 1 {
        result.push(
            Severity::Warning,
            "value",
            "plugins.initializer",
            format!("{initializer:?} should be a bare file name inside plugins.dir"),
        );
    }

    if !config.plugins.dir.is_dir() {
        result.push(
            Severity::Warning,
            "file-ref",
            "plugins.dir",
            format!(
                "{} is not a directory; only bundled units will load",
                config.plugins.dir.display()
            ),
        );
    }

    match &config.discord.token {
        Some(token) if token.expose_secret().trim().is_empty() => {
            result.push(Severity::Error, "credentials", "discord.token", "token is empty");
        },
        Some(_) => {},
        None => result.push(
            if require_token {
                Severity::Error
            } else {
                Severity::Warning
            },
            "credentials",
            "discord.token",
            "no token configured (set discord.token or DISCORD_TOKEN)",
        ),
    }

    result
}

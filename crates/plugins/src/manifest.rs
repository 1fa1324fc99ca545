//! Manifest units: extension units declared in TOML files.
//!
//! ```text
//! name = "greetings"            # defaults to the file stem
//!
//! [[command]]
//! name = "hello"
//! description = "Greet someone"
//! channels = ["bots", "1234"]   # omitted: any channel
//! roles = ["admin"]             # omitted: anyone
//! pattern = '(?P<who>\S+)?'
//! reply = "Hello {who}! (asked by {author})"
//!
//! [command.params]
//! who = { type = "str", optional = true }
//!
//! [[forward]]
//! channels = ["4321"]
//! allow_commands = false
//! reply = "{author} said: {text}"
//! log = true
//! ```
//!
//! Command `channels` and `roles` accept IDs or names; names are matched
//! when the transport can resolve them. Forward `channels` are channel IDs.
//!
//! Command replies may use `{author}` and the command's declared
//! parameters. Forward replies may use `{author}`, `{channel}` and `{text}`.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    numberone_dispatch::{
        Args, CommandHandler, ForwardHandler, Param, ParamType, RegistrationError, Scope,
        Signature, UnitRegistrar,
    },
    serde::Deserialize,
    tracing::info,
};

use crate::{
    error::{Context, Error, Result},
    unit::ExtensionUnit,
};

/// Declared type of a manifest parameter: `"int"` or `{ type = "int", optional = true }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Type(ParamType),
    Detailed {
        #[serde(rename = "type", default)]
        ty: Option<ParamType>,
        #[serde(default)]
        optional: bool,
    },
}

impl ParamSpec {
    fn to_param(&self, name: &str) -> Param {
        let (ty, optional) = match self {
            Self::Type(ty) => (Some(*ty), false),
            Self::Detailed { ty, optional } => (*ty, *optional),
        };
        Param {
            name: name.to_string(),
            ty,
            optional,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub channels: Option<Vec<String>>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
    pub reply: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForwardSpec {
    pub channels: Vec<String>,
    #[serde(default = "default_allow_commands")]
    pub allow_commands: bool,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub log: bool,
}

fn default_allow_commands() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "command")]
    pub commands: Vec<CommandSpec>,
    #[serde(default, rename = "forward")]
    pub forwards: Vec<ForwardSpec>,
}

// ── Templates ───────────────────────────────────────────────────────────────

/// A reply text with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTemplate {
    source: String,
}

enum Piece<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

impl ReplyTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    fn pieces(&self) -> Vec<Piece<'_>> {
        let mut pieces = Vec::new();
        let mut rest = self.source.as_str();
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close)
                    if close > 0
                        && after[..close]
                            .chars()
                            .all(|c| c.is_alphanumeric() || c == '_') =>
                {
                    pieces.push(Piece::Literal(&rest[..open]));
                    pieces.push(Piece::Placeholder(&after[..close]));
                    rest = &after[close + 1..];
                },
                _ => {
                    pieces.push(Piece::Literal(&rest[..=open]));
                    rest = after;
                },
            }
        }
        pieces.push(Piece::Literal(rest));
        pieces
    }

    /// Distinct placeholder names.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.pieces()
            .into_iter()
            .filter_map(|p| match p {
                Piece::Placeholder(name) => Some(name),
                Piece::Literal(_) => None,
            })
            .collect()
    }

    /// Substitute every placeholder; unknown names render empty.
    pub fn render(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for piece in self.pieces() {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Placeholder(name) => out.push_str(&lookup(name).unwrap_or_default()),
            }
        }
        out
    }
}

// ── Unit ────────────────────────────────────────────────────────────────────

/// An extension unit loaded from a manifest file.
#[derive(Debug, Clone)]
pub struct ManifestUnit {
    name: String,
    path: PathBuf,
    manifest: Manifest,
}

impl ManifestUnit {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

/// Read and validate a manifest file.
pub fn load_manifest(path: &Path) -> Result<ManifestUnit> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_manifest(&content, path)
}

/// Parse manifest `content`; `path` names the unit when the manifest does not.
pub fn parse_manifest(content: &str, path: &Path) -> Result<ManifestUnit> {
    let manifest: Manifest = toml::from_str(content)?;

    let name = match &manifest.name {
        Some(name) => name.trim().to_string(),
        None => path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_manifest(path, "cannot derive a unit name"))?,
    };
    if name.is_empty() {
        return Err(Error::invalid_manifest(path, "unit name is empty"));
    }
    if manifest.commands.is_empty() && manifest.forwards.is_empty() {
        return Err(Error::invalid_manifest(path, "declares no command and no forward"));
    }

    for command in &manifest.commands {
        for placeholder in ReplyTemplate::new(&command.reply).placeholders() {
            if placeholder != "author" && !command.params.contains_key(placeholder) {
                return Err(Error::invalid_manifest(
                    path,
                    format!(
                        "reply of command `{}` uses undeclared placeholder `{{{placeholder}}}`",
                        command.name
                    ),
                ));
            }
        }
    }
    for (index, forward) in manifest.forwards.iter().enumerate() {
        if forward.channels.is_empty() {
            return Err(Error::invalid_manifest(
                path,
                format!("forward #{} lists no channel", index + 1),
            ));
        }
        if let Some(reply) = &forward.reply {
            for placeholder in ReplyTemplate::new(reply).placeholders() {
                if !matches!(placeholder, "author" | "channel" | "text") {
                    return Err(Error::invalid_manifest(
                        path,
                        format!(
                            "reply of forward #{} uses unknown placeholder `{{{placeholder}}}`",
                            index + 1
                        ),
                    ));
                }
            }
        }
    }

    Ok(ManifestUnit {
        name,
        path: path.to_path_buf(),
        manifest,
    })
}

fn command_handler(spec: &CommandSpec) -> CommandHandler {
    let mut signature = Signature::new(spec.name.clone());
    if let Some(description) = &spec.description {
        signature = signature.description(description.clone());
    }
    for (name, param) in &spec.params {
        signature = signature.with_param(param.to_param(name));
    }

    let template = Arc::new(ReplyTemplate::new(spec.reply.clone()));
    CommandHandler::suspending(signature, move |ctx, args: Args| {
        let template = Arc::clone(&template);
        async move {
            let author = ctx.message.author_mention();
            let text = template.render(|name| match name {
                "author" => Some(author.clone()),
                other => args.get(other).map(ToString::to_string),
            });
            ctx.reply(&text).await
        }
    })
}

fn forward_handler(unit: &str, index: usize, spec: &ForwardSpec) -> ForwardHandler {
    let name = format!("{unit}.forward{}", index + 1);
    let template = spec.reply.clone().map(|r| Arc::new(ReplyTemplate::new(r)));
    let log = spec.log;
    let handler_name = name.clone();
    ForwardHandler::suspending(name, move |ctx| {
        let template = template.clone();
        let handler_name = handler_name.clone();
        async move {
            let message = &ctx.message;
            if log {
                info!(
                    handler = %handler_name,
                    channel = %message.channel_id,
                    author = %message.author_id,
                    text = %message.text,
                    "forwarded message"
                );
            }
            if let Some(template) = template {
                let text = template.render(|name| match name {
                    "author" => Some(message.author_mention()),
                    "channel" => Some(message.channel_id.clone()),
                    "text" => Some(message.text.clone()),
                    _ => None,
                });
                ctx.reply(&text).await?;
            }
            Ok(())
        }
    })
}

impl ExtensionUnit for ManifestUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(
        &self,
        registrar: &mut UnitRegistrar<'_>,
    ) -> std::result::Result<(), RegistrationError> {
        for spec in &self.manifest.commands {
            registrar.register_command(
                Scope::from_option(spec.channels.clone()),
                Scope::from_option(spec.roles.clone()),
                &spec.pattern,
                command_handler(spec),
            )?;
        }
        for (index, spec) in self.manifest.forwards.iter().enumerate() {
            registrar.register_forward(
                spec.channels.iter().cloned(),
                spec.allow_commands,
                forward_handler(&self.name, index, spec),
            );
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use numberone_dispatch::{DispatchOutcome, Dispatcher, DispatcherBuilder};

    use {
        super::*,
        crate::test_support::{RecordingOutbound, message},
    };

    const GREETINGS: &str = r#"
[[command]]
name = "hello"
description = "Greet someone"
pattern = '(?P<who>\S+)?'
reply = "Hello {who}! (asked by {author})"

[command.params]
who = { type = "str", optional = true }

[[command]]
name = "double"
channels = ["math"]
pattern = '(?P<n>-?\d+)$'
reply = "{n}{n}"

[command.params]
n = "int"

[[forward]]
channels = ["quiet"]
allow_commands = false
reply = "{author} said: {text}"
"#;

    fn greetings() -> ManifestUnit {
        parse_manifest(GREETINGS, Path::new("plugins/greetings.toml")).unwrap()
    }

    fn dispatcher(unit: &ManifestUnit, outbound: &Arc<RecordingOutbound>) -> Dispatcher {
        let mut builder = DispatcherBuilder::new("root");
        builder.register_unit(unit.name(), |r| unit.register(r)).unwrap();
        Dispatcher::new(Arc::new(builder.build()), "!", "bot", outbound.clone())
    }

    #[test]
    fn parses_commands_and_forwards() {
        let unit = greetings();
        assert_eq!(unit.name(), "greetings");
        assert_eq!(unit.manifest().commands.len(), 2);
        assert_eq!(
            unit.manifest().commands[0].params["who"],
            ParamSpec::Detailed {
                ty: Some(ParamType::Str),
                optional: true
            }
        );
        assert_eq!(
            unit.manifest().commands[1].params["n"],
            ParamSpec::Type(ParamType::Int)
        );
        assert!(!unit.manifest().forwards[0].allow_commands);
    }

    #[test]
    fn explicit_name_wins_over_file_stem() {
        let unit = parse_manifest(
            "name = \"custom\"\n[[command]]\nname = \"x\"\nreply = \"x\"\n",
            Path::new("whatever.toml"),
        )
        .unwrap();
        assert_eq!(unit.name(), "custom");
    }

    #[test]
    fn rejects_undeclared_placeholder() {
        let err = parse_manifest(
            "[[command]]\nname = \"x\"\nreply = \"hi {who}\"\n",
            Path::new("bad.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { .. }));
        assert!(err.to_string().contains("{who}"));
    }

    #[test]
    fn rejects_empty_manifest_and_syntax_errors() {
        assert!(matches!(
            parse_manifest("", Path::new("empty.toml")).unwrap_err(),
            Error::InvalidManifest { .. }
        ));
        assert!(matches!(
            parse_manifest("[[command]\n", Path::new("broken.toml")).unwrap_err(),
            Error::TomlDe(_)
        ));
    }

    #[test]
    fn template_placeholders_and_rendering() {
        let t = ReplyTemplate::new("{a} and {b} but not { c } or {}");
        assert_eq!(t.placeholders().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        let out = t.render(|name| (name == "a").then(|| "A".to_string()));
        assert_eq!(out, "A and  but not { c } or {}");
    }

    #[tokio::test]
    async fn command_reply_renders_arguments() {
        let unit = greetings();
        let outbound = RecordingOutbound::new();
        let d = dispatcher(&unit, &outbound);

        d.dispatch(message("general", "u1", "!hello world")).await;
        d.dispatch(message("general", "u1", "!hello")).await;
        d.dispatch(message("math", "u1", "!double 21")).await;
        assert_eq!(outbound.texts(), vec![
            "Hello world! (asked by <@u1>)",
            "Hello ! (asked by <@u1>)",
            "2121",
        ]);
    }

    #[tokio::test]
    async fn forward_replies_and_suppresses_commands() {
        let unit = greetings();
        let outbound = RecordingOutbound::new();
        let d = dispatcher(&unit, &outbound);

        let outcome = d.dispatch(message("quiet", "u1", "!hello")).await;
        assert_eq!(outcome, DispatchOutcome::Suppressed);
        assert_eq!(outbound.texts(), vec!["<@u1> said: !hello"]);
    }

    #[test]
    fn pattern_group_without_param_fails_registration() {
        let unit = parse_manifest(
            "[[command]]\nname = \"x\"\npattern = '(?P<y>.+)'\nreply = \"ok\"\n",
            Path::new("mismatch.toml"),
        )
        .unwrap();
        let mut builder = DispatcherBuilder::new("root");
        let err = builder.register_unit(unit.name(), |r| unit.register(r)).unwrap_err();
        assert!(matches!(err, RegistrationError::PatternArgumentMismatch { .. }));
    }
}

//! Command and forward registries.
//!
//! A [`DispatcherDefinition`] is an ordered list of immutable layers, own
//! layer first, then ancestors. Lookups walk the list and the first layer
//! holding a key wins, for commands by name and for forwards by channel.
//! Registration only ever touches the own layer of a [`DispatcherBuilder`],
//! and only before [`DispatcherBuilder::build`] freezes it.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use tracing::{info, warn};

use crate::{
    cast::TypeHints,
    error::RegistrationError,
    handler::{CommandHandler, ForwardHandler},
    pattern::CommandPattern,
    scope::Scope,
};

// ── Entries ─────────────────────────────────────────────────────────────────

/// A registered command.
#[derive(Debug)]
pub struct CommandDefinition {
    pub name: String,
    pub channels: Scope,
    pub roles: Scope,
    pub pattern: Option<CommandPattern>,
    pub handler: CommandHandler,
    pub type_hints: TypeHints,
    /// Extension unit that registered the command.
    pub origin: String,
}

impl CommandDefinition {
    pub fn description(&self) -> Option<&str> {
        self.handler.signature.doc()
    }

    /// Invocation line, e.g. `!help [cmd_name]`.
    ///
    /// Arguments follow the pattern's named groups; a group whose parameter
    /// is optional is shown in brackets.
    pub fn usage(&self, prefix: &str) -> String {
        let mut line = format!("{prefix}{}", self.name);
        if let Some(pattern) = &self.pattern {
            for group in pattern.group_names() {
                let optional = self
                    .handler
                    .signature
                    .param_named(group)
                    .is_some_and(|p| p.optional);
                if optional {
                    line.push_str(&format!(" [{group}]"));
                } else {
                    line.push_str(&format!(" <{group}>"));
                }
            }
        }
        line
    }
}

/// A forward subscription on one channel.
#[derive(Debug)]
pub struct ForwardSubscription {
    pub channel: String,
    /// When false, command dispatch stops after this subscriber runs.
    pub allow_commands: bool,
    pub handler: ForwardHandler,
    pub origin: String,
}

// ── Layers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Layer {
    name: String,
    commands: HashMap<String, Arc<CommandDefinition>>,
    forwards: HashMap<String, Vec<Arc<ForwardSubscription>>>,
}

impl Layer {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A frozen dispatcher: own layer plus every ancestor layer.
#[derive(Debug)]
pub struct DispatcherDefinition {
    name: String,
    layers: Vec<Arc<Layer>>,
}

impl DispatcherDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layer names, most specific first.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Resolve a command by exact name.
    pub fn command(&self, name: &str) -> Option<&Arc<CommandDefinition>> {
        self.layers.iter().find_map(|layer| layer.commands.get(name))
    }

    /// Forward list for `channel`, taken whole from the most specific layer
    /// that has one.
    pub fn forwards(&self, channel: &str) -> &[Arc<ForwardSubscription>] {
        self.layers
            .iter()
            .find_map(|layer| layer.forwards.get(channel))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every effective command, sorted by name.
    pub fn commands(&self) -> Vec<&Arc<CommandDefinition>> {
        let mut effective: BTreeMap<&str, &Arc<CommandDefinition>> = BTreeMap::new();
        for layer in &self.layers {
            for (name, def) in &layer.commands {
                effective.entry(name.as_str()).or_insert(def);
            }
        }
        effective.into_values().collect()
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands().into_iter().map(|c| c.name.as_str()).collect()
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Mutable startup phase of a dispatcher.
pub struct DispatcherBuilder {
    own: Layer,
    parents: Vec<Arc<Layer>>,
}

/// What one extension unit contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitSummary {
    pub unit: String,
    pub commands: Vec<String>,
    pub forwards: usize,
}

impl DispatcherBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            own: Layer::named(name),
            parents: Vec::new(),
        }
    }

    /// A dispatcher inheriting from `parents`, earlier parents taking
    /// precedence. A layer reachable through several parents is kept once.
    pub fn extending(name: impl Into<String>, parents: &[&DispatcherDefinition]) -> Self {
        let mut inherited: Vec<Arc<Layer>> = Vec::new();
        for parent in parents {
            for layer in &parent.layers {
                if !inherited.iter().any(|l| Arc::ptr_eq(l, layer)) {
                    inherited.push(Arc::clone(layer));
                }
            }
        }
        Self {
            own: Layer::named(name),
            parents: inherited,
        }
    }

    pub fn name(&self) -> &str {
        &self.own.name
    }

    /// Register a single command directly on this dispatcher's own layer.
    pub fn register_command(
        &mut self,
        channels: Scope,
        roles: Scope,
        pattern: &str,
        handler: CommandHandler,
    ) -> Result<(), RegistrationError> {
        let unit = self.own.name.clone();
        self.register_unit(&unit, |r| r.register_command(channels, roles, pattern, handler))
            .map(|_| ())
    }

    /// Subscribe `handler` to every channel in `channels`.
    pub fn register_forward<I, S>(
        &mut self,
        channels: I,
        allow_commands: bool,
        handler: ForwardHandler,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unit = self.own.name.clone();
        for sub in forward_entries(&unit, channels, allow_commands, &handler) {
            self.own
                .forwards
                .entry(sub.channel.clone())
                .or_default()
                .push(sub);
        }
    }

    /// Run `register` against a staging area and commit what it staged only
    /// if it returns `Ok`.
    pub fn register_unit<F>(
        &mut self,
        unit: &str,
        register: F,
    ) -> Result<UnitSummary, RegistrationError>
    where
        F: FnOnce(&mut UnitRegistrar<'_>) -> Result<(), RegistrationError>,
    {
        let mut registrar = UnitRegistrar {
            layer: &self.own,
            unit: unit.to_string(),
            commands: Vec::new(),
            forwards: Vec::new(),
        };
        register(&mut registrar)?;

        let UnitRegistrar {
            commands, forwards, ..
        } = registrar;
        let summary = UnitSummary {
            unit: unit.to_string(),
            commands: commands.iter().map(|c| c.name.clone()).collect(),
            forwards: forwards.len(),
        };
        for def in commands {
            self.own.commands.insert(def.name.clone(), def);
        }
        for sub in forwards {
            self.own
                .forwards
                .entry(sub.channel.clone())
                .or_default()
                .push(sub);
        }
        Ok(summary)
    }

    pub fn build(self) -> DispatcherDefinition {
        let name = self.own.name.clone();
        let mut layers = Vec::with_capacity(self.parents.len() + 1);
        layers.push(Arc::new(self.own));
        layers.extend(self.parents);
        DispatcherDefinition { name, layers }
    }
}

// ── Staging ─────────────────────────────────────────────────────────────────

/// Registration surface handed to an extension unit.
///
/// Validation happens here, at the call; nothing is visible to the
/// dispatcher until the unit as a whole succeeds.
pub struct UnitRegistrar<'a> {
    layer: &'a Layer,
    unit: String,
    commands: Vec<Arc<CommandDefinition>>,
    forwards: Vec<Arc<ForwardSubscription>>,
}

impl UnitRegistrar<'_> {
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Validate and stage a command.
    ///
    /// An empty `pattern` means the command takes no arguments.
    pub fn register_command(
        &mut self,
        channels: Scope,
        roles: Scope,
        pattern: &str,
        handler: CommandHandler,
    ) -> Result<(), RegistrationError> {
        let signature = &handler.signature;
        let name = signature.command_name().to_string();

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RegistrationError::InvalidName {
                handler: signature.name().to_string(),
                name,
            });
        }
        if signature.positional_count() < 1 && !signature.accepts_varargs() {
            return Err(RegistrationError::InvalidSignature {
                handler: signature.name().to_string(),
            });
        }

        let pattern = if pattern.is_empty() {
            None
        } else {
            Some(
                CommandPattern::compile(pattern)
                    .map_err(|e| RegistrationError::invalid_pattern(&name, e))?,
            )
        };

        if let Some(pattern) = &pattern
            && !signature.accepts_varkw()
        {
            let groups: HashSet<&str> = pattern.group_names().iter().map(String::as_str).collect();
            let missing: Vec<String> = pattern
                .group_names()
                .iter()
                .filter(|g| signature.param_named(g).is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(RegistrationError::PatternArgumentMismatch {
                    command: name,
                    missing,
                });
            }
            for param in signature.params() {
                if !groups.contains(param.name.as_str()) {
                    warn!(
                        command = %name,
                        param = %param.name,
                        "keyword parameter is not captured by the pattern"
                    );
                }
            }
        }

        if self.layer.commands.contains_key(&name) || self.commands.iter().any(|c| c.name == name) {
            return Err(RegistrationError::DuplicateCommand {
                name,
                layer: self.layer.name.clone(),
            });
        }

        info!(
            command = %name,
            unit = %self.unit,
            channels = %channels,
            roles = %roles,
            pattern = pattern.as_ref().map(CommandPattern::source).unwrap_or(""),
            has_pattern = pattern.is_some(),
            handler = signature.name(),
            "command registered"
        );

        let type_hints = signature.type_hints();
        self.commands.push(Arc::new(CommandDefinition {
            name,
            channels,
            roles,
            pattern,
            handler,
            type_hints,
            origin: self.unit.clone(),
        }));
        Ok(())
    }

    /// Stage `handler` as a forward on every channel in `channels`.
    pub fn register_forward<I, S>(
        &mut self,
        channels: I,
        allow_commands: bool,
        handler: ForwardHandler,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forwards
            .extend(forward_entries(&self.unit, channels, allow_commands, &handler));
    }

    /// Names staged so far by this unit.
    pub fn staged_commands(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name.as_str()).collect()
    }
}

fn forward_entries<I, S>(
    unit: &str,
    channels: I,
    allow_commands: bool,
    handler: &ForwardHandler,
) -> Vec<Arc<ForwardSubscription>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    channels
        .into_iter()
        .map(|channel| {
            let channel = channel.into();
            info!(
                channel = %channel,
                unit = %unit,
                handler = %handler.name,
                allow_commands,
                "forward registered"
            );
            Arc::new(ForwardSubscription {
                channel,
                allow_commands,
                handler: handler.clone(),
                origin: unit.to_string(),
            })
        })
        .collect()
}

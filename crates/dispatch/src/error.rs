use crate::cast::ParamType;

/// Errors raised while registering commands and forwards.
///
/// Any of these aborts the extension unit being registered; nothing the unit
/// staged before the failure reaches the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The handler cannot receive the message context.
    #[error(
        "invalid signature for handler `{handler}`: it must accept at least one positional \
         argument (the message context)"
    )]
    InvalidSignature { handler: String },

    /// The pattern captures groups the handler has no keyword parameter for.
    #[error(
        "pattern of command `{command}` has named groups without a matching keyword parameter: {}",
        missing.join(", ")
    )]
    PatternArgumentMismatch {
        command: String,
        missing: Vec<String>,
    },

    /// The pattern source is not a valid regular expression.
    #[error("invalid pattern for command `{command}`: {source}")]
    InvalidPattern {
        command: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// Stripping decoration left an empty name, or one containing whitespace.
    #[error("handler `{handler}` yields an invalid command name {name:?}")]
    InvalidName { handler: String, name: String },

    /// The same command name was registered twice in one dispatcher layer.
    #[error("command `{name}` is already registered in dispatcher `{layer}`")]
    DuplicateCommand { name: String, layer: String },
}

impl RegistrationError {
    #[must_use]
    pub fn invalid_pattern(command: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            command: command.into(),
            source: Box::new(source),
        }
    }
}

/// A captured value could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot convert {value:?} for parameter `{param}` to {expected}: {reason}")]
pub struct CastError {
    pub param: String,
    pub value: String,
    pub expected: ParamType,
    pub reason: String,
}

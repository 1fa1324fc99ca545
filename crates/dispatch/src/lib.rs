//! Command dispatch for numberone.
//!
//! Extension units register commands and forwards into a [`DispatcherBuilder`]
//! during startup. Once built, the frozen [`DispatcherDefinition`] is shared
//! read-only by a [`Dispatcher`], which interprets every inbound message:
//! forwards first, then invocation-style detection, command lookup, scope
//! checks, pattern extraction, typed argument casting and handler invocation.

pub mod cast;
pub mod engine;
pub mod error;
pub mod handler;
pub mod pattern;
pub mod registry;
pub mod scope;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    cast::{ArgValue, Args, Converter, ParamType, RawArgs, TypeHints, cast_with_type_hints},
    engine::{DispatchOutcome, Dispatcher, Invocation, InvocationStyle, detect_invocation},
    error::{CastError, RegistrationError},
    handler::{
        CommandHandler, ForwardHandler, HandlerFn, MessageContext, Param, Signature,
    },
    pattern::CommandPattern,
    registry::{
        CommandDefinition, DispatcherBuilder, DispatcherDefinition, ForwardSubscription,
        UnitRegistrar, UnitSummary,
    },
    scope::Scope,
};

//! Handler shapes and the context they receive.
//!
//! A handler is either blocking (called directly on the dispatch task) or
//! suspending (awaited). [`HandlerFn::invoke`] hides the difference and
//! turns panics into ordinary errors so a faulty handler only affects its own
//! message.

use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc};

use {
    futures::{FutureExt, future::BoxFuture},
    numberone_channels::{ChannelOutbound, InboundMessage},
};

use crate::{
    cast::{Args, ParamType, TypeHints},
    registry::DispatcherDefinition,
};

// ── Context ─────────────────────────────────────────────────────────────────

/// Everything a handler gets besides its keyword arguments.
#[derive(Clone)]
pub struct MessageContext {
    /// The raw inbound message.
    pub message: InboundMessage,
    outbound: Arc<dyn ChannelOutbound>,
    definition: Arc<DispatcherDefinition>,
    prefix: Arc<str>,
}

impl MessageContext {
    pub fn new(
        message: InboundMessage,
        outbound: Arc<dyn ChannelOutbound>,
        definition: Arc<DispatcherDefinition>,
        prefix: Arc<str>,
    ) -> Self {
        Self {
            message,
            outbound,
            definition,
            prefix,
        }
    }

    /// Send `text` to the channel the message came from.
    pub async fn reply(&self, text: &str) -> anyhow::Result<()> {
        self.outbound
            .send_reply(&self.message.reply_target(), text)
            .await?;
        Ok(())
    }

    /// The effective command registry, e.g. for a help command.
    pub fn commands(&self) -> &DispatcherDefinition {
        &self.definition
    }

    /// The configured command prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn outbound(&self) -> &Arc<dyn ChannelOutbound> {
        &self.outbound
    }
}

// ── Signature ───────────────────────────────────────────────────────────────

/// A declared keyword parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// `None` keeps the captured text as a string.
    pub ty: Option<ParamType>,
    /// Shown as `[name]` instead of `<name>` in usage lines.
    pub optional: bool,
}

/// What a handler declares about itself.
///
/// The registration API validates commands against this instead of
/// inspecting the callable.
#[derive(Debug, Clone)]
pub struct Signature {
    name: String,
    positional: usize,
    varargs: bool,
    params: Vec<Param>,
    varkw: bool,
    description: Option<String>,
}

impl Signature {
    /// A handler called `name` taking the message context and nothing else.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positional: 1,
            varargs: false,
            params: Vec::new(),
            varkw: false,
            description: None,
        }
    }

    /// Number of positional parameters, the message context included.
    #[must_use]
    pub fn positional(mut self, count: usize) -> Self {
        self.positional = count;
        self
    }

    /// Accept arbitrary extra positional arguments.
    #[must_use]
    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    /// Accept arbitrary extra keyword arguments.
    #[must_use]
    pub fn varkw(mut self) -> Self {
        self.varkw = true;
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty: Some(ty),
            optional: false,
        });
        self
    }

    #[must_use]
    pub fn optional_param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty: Some(ty),
            optional: true,
        });
        self
    }

    /// A keyword parameter without a declared type.
    #[must_use]
    pub fn untyped_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty: None,
            optional: false,
        });
        self
    }

    #[must_use]
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Declared handler name, decoration included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command name: the handler name without leading/trailing `_`.
    pub fn command_name(&self) -> &str {
        self.name.trim_matches('_')
    }

    pub fn positional_count(&self) -> usize {
        self.positional
    }

    pub fn accepts_varargs(&self) -> bool {
        self.varargs
    }

    pub fn accepts_varkw(&self) -> bool {
        self.varkw
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param_named(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn doc(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Converter table for the typed parameters.
    pub fn type_hints(&self) -> TypeHints {
        self.params
            .iter()
            .filter_map(|p| p.ty.map(|ty| (p.name.clone(), ty.converter())))
            .collect()
    }
}

// ── Callables ───────────────────────────────────────────────────────────────

type BlockingFn<A> = dyn Fn(&MessageContext, &A) -> anyhow::Result<()> + Send + Sync;
type SuspendingFn<A> =
    dyn Fn(MessageContext, A) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// A handler callable, blocking or suspending.
///
/// `A` is the argument bundle: [`Args`] for commands, `()` for forwards.
pub enum HandlerFn<A = Args> {
    Blocking(Arc<BlockingFn<A>>),
    Suspending(Arc<SuspendingFn<A>>),
}

impl<A> Clone for HandlerFn<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Blocking(f) => Self::Blocking(Arc::clone(f)),
            Self::Suspending(f) => Self::Suspending(Arc::clone(f)),
        }
    }
}

impl<A: Send + 'static> HandlerFn<A> {
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(&MessageContext, &A) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Blocking(Arc::new(f))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(MessageContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Suspending(Arc::new(move |ctx, args| f(ctx, args).boxed()))
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Blocking(_))
    }

    /// Run the handler to completion. Panics come back as errors.
    pub async fn invoke(&self, ctx: MessageContext, args: A) -> anyhow::Result<()> {
        match self {
            Self::Blocking(f) => std::panic::catch_unwind(AssertUnwindSafe(|| f(&ctx, &args)))
                .unwrap_or_else(|panic| Err(panic_error(panic))),
            // `f` itself may panic before returning a future.
            Self::Suspending(f) => AssertUnwindSafe(async move { f(ctx, args).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(panic_error(panic))),
        }
    }
}

fn panic_error(panic: Box<dyn Any + Send>) -> anyhow::Error {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("handler panicked: {detail}")
}

/// A command handler: declared signature plus callable.
#[derive(Clone)]
pub struct CommandHandler {
    pub signature: Signature,
    pub func: HandlerFn<Args>,
}

impl CommandHandler {
    pub fn new(signature: Signature, func: HandlerFn<Args>) -> Self {
        Self { signature, func }
    }

    pub fn blocking<F>(signature: Signature, f: F) -> Self
    where
        F: Fn(&MessageContext, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(signature, HandlerFn::blocking(f))
    }

    pub fn suspending<F, Fut>(signature: Signature, f: F) -> Self
    where
        F: Fn(MessageContext, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(signature, HandlerFn::suspending(f))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("signature", &self.signature)
            .field("blocking", &self.func.is_blocking())
            .finish()
    }
}

/// A forward handler: receives the raw message through its context.
#[derive(Clone)]
pub struct ForwardHandler {
    pub name: String,
    pub func: HandlerFn<()>,
}

impl ForwardHandler {
    pub fn blocking<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&MessageContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: HandlerFn::blocking(move |ctx, _: &()| f(ctx)),
        }
    }

    pub fn suspending<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(MessageContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: HandlerFn::suspending(move |ctx, _: ()| f(ctx)),
        }
    }

    pub async fn invoke(&self, ctx: MessageContext) -> anyhow::Result<()> {
        self.func.invoke(ctx, ()).await
    }
}

impl std::fmt::Debug for ForwardHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardHandler")
            .field("name", &self.name)
            .field("blocking", &self.func.is_blocking())
            .finish()
    }
}

//! `numberone run`: connect, load plugins on the first ready event, dispatch.

use std::sync::Arc;

use {
    anyhow::Context,
    numberone_channels::{ChannelOutbound, EventReceiver, SessionEvent},
    numberone_config::{NumberOneConfig, validate},
    numberone_discord::DiscordSession,
    numberone_dispatch::{DispatchOutcome, Dispatcher},
    numberone_plugins::PluginLoader,
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::startup::{build_dispatcher, plugin_loader};

/// Capacity of the transport → dispatcher event queue.
const EVENT_BUFFER: usize = 256;

/// Event-loop state: waiting for readiness, then dispatching.
pub struct BotSession {
    loader: PluginLoader,
    prefix: String,
    outbound: Arc<dyn ChannelOutbound>,
    dispatcher: Option<Arc<Dispatcher>>,
}

impl BotSession {
    pub fn new(
        loader: PluginLoader,
        prefix: impl Into<String>,
        outbound: Arc<dyn ChannelOutbound>,
    ) -> Self {
        Self {
            loader,
            prefix: prefix.into(),
            outbound,
            dispatcher: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// React to one transport event.
    ///
    /// Messages are dispatched on their own task, whose handle is returned.
    pub fn handle_event(
        &mut self,
        event: SessionEvent,
    ) -> anyhow::Result<Option<JoinHandle<DispatchOutcome>>> {
        match event {
            SessionEvent::Ready {
                bot_user_id,
                bot_name,
            } => {
                if self.dispatcher.is_some() {
                    debug!(bot_user_id = %bot_user_id, "session resumed, plugins already loaded");
                    return Ok(None);
                }
                let (definition, report) = build_dispatcher(&self.loader)?;
                info!(
                    bot_user_id = %bot_user_id,
                    bot_name = bot_name.as_deref().unwrap_or(""),
                    units = report.loaded.len(),
                    commands = definition.command_names().len(),
                    "ready to dispatch"
                );
                self.dispatcher = Some(Arc::new(Dispatcher::new(
                    Arc::new(definition),
                    self.prefix.as_str(),
                    bot_user_id,
                    Arc::clone(&self.outbound),
                )));
                Ok(None)
            },
            SessionEvent::Message(message) => {
                let Some(dispatcher) = &self.dispatcher else {
                    debug!(channel = %message.channel_id, "message before ready, dropped");
                    return Ok(None);
                };
                let dispatcher = Arc::clone(dispatcher);
                Ok(Some(tokio::spawn(async move { dispatcher.dispatch(message).await })))
            },
        }
    }

    /// Consume events until the channel closes or `shutdown` fires.
    pub async fn run(
        mut self,
        mut events: EventReceiver,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event)?;
                    },
                    None => {
                        warn!("transport event channel closed");
                        break;
                    },
                },
            }
        }
        Ok(())
    }
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

pub async fn handle_run(config: NumberOneConfig) -> anyhow::Result<()> {
    let validation = validate(&config, true);
    for diagnostic in &validation.diagnostics {
        warn!(path = %diagnostic.path, severity = %diagnostic.severity, "{}", diagnostic.message);
    }
    if validation.has_errors() {
        anyhow::bail!("invalid configuration, run `numberone check` for details");
    }
    let token = config
        .discord
        .token
        .as_ref()
        .context("no discord token configured")?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let session = DiscordSession::connect(token, config.bot.status_text(), events_tx)
        .await
        .context("connecting to discord")?;
    let outbound: Arc<dyn ChannelOutbound> = session.outbound();
    let shards = session.shard_manager();
    let gateway = tokio::spawn(session.run());

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_token.cancel();
    });

    let bot = BotSession::new(plugin_loader(&config), config.bot.prefix.clone(), outbound);
    let result = bot.run(events_rx, shutdown).await;

    shards.shutdown_all().await;
    match gateway.await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => warn!(error = %e, "discord gateway stopped with an error"),
        Err(e) => warn!(error = %e, "discord gateway task failed"),
    }
    info!("stopped");
    result
}

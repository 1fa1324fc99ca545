mod bot_commands;
mod check_commands;
mod startup;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "numberone", about = "NumberOne, a plugin-driven chat command bot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in the working and config directories).
    #[arg(long, global = true, env = "NUMBERONE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and dispatch commands (default).
    Run,
    /// Validate config and plugins without connecting.
    Check,
}

fn init_telemetry(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},serenity=warn,tungstenite=warn",
            cli.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "numberone starting");

    let config = numberone_config::load_or_discover(cli.config.as_deref())
        .context("loading configuration")?;
    let config = numberone_config::apply_env_overrides(config);

    match cli.command {
        None | Some(Commands::Run) => bot_commands::handle_run(config).await,
        Some(Commands::Check) => {
            let path = cli.config.clone().or_else(numberone_config::find_config_file);
            check_commands::handle_check(&config, path.as_deref())
        },
    }
}

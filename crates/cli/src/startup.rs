//! Startup phase shared by `run` and `check`.

use {
    anyhow::Context,
    numberone_config::NumberOneConfig,
    numberone_dispatch::{DispatcherBuilder, DispatcherDefinition},
    numberone_plugins::{LoadReport, PluginLoader},
    tracing::warn,
};

/// Name of the top-level dispatcher.
pub const ROOT_DISPATCHER: &str = "numberone";

pub fn plugin_loader(config: &NumberOneConfig) -> PluginLoader {
    PluginLoader::new(
        config.plugins.dir.clone(),
        config.plugins.initializer.clone(),
        config.plugins.enabled_bundled.clone(),
    )
}

/// Load every unit and freeze the registry.
pub fn build_dispatcher(
    loader: &PluginLoader,
) -> anyhow::Result<(DispatcherDefinition, LoadReport)> {
    let mut builder = DispatcherBuilder::new(ROOT_DISPATCHER);
    let report = loader
        .load(&mut builder)
        .with_context(|| format!("loading plugins from {}", loader.dir().display()))?;
    for failed in &report.failed {
        warn!(unit = %failed.unit, reason = %failed.reason, "plugin not loaded");
    }
    Ok((builder.build(), report))
}

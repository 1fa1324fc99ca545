use std::path::Path;

use {
    numberone_config::{NumberOneConfig, Severity, validate},
    numberone_plugins::LoadReport,
};

use crate::startup::{build_dispatcher, plugin_loader};

/// Load config and plugins without connecting and print what would run.
pub fn handle_check(config: &NumberOneConfig, config_path: Option<&Path>) -> anyhow::Result<()> {
    match config_path {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: defaults (no file found)"),
    }

    let validation = validate(config, false);
    for diagnostic in &validation.diagnostics {
        println!("  {diagnostic}");
    }

    let loader = plugin_loader(config);
    let (definition, report) = build_dispatcher(&loader)?;
    print_report(&report);

    println!("Commands:");
    for command in definition.commands() {
        println!(
            "  {:<16} {}  [{}]",
            command.name,
            command.usage(&config.bot.prefix),
            command.origin
        );
    }

    let errors = validation.count(Severity::Error);
    if errors > 0 || report.has_failures() {
        anyhow::bail!(
            "check failed: {errors} config error(s), {} unit(s) failed to load",
            report.failed.len()
        );
    }
    println!("OK");
    Ok(())
}

fn print_report(report: &LoadReport) {
    println!("Plugins loaded in {:.2?}:", report.elapsed);
    for unit in &report.loaded {
        println!(
            "  loaded  {} ({} command(s), {} forward(s))",
            unit.unit,
            unit.commands.len(),
            unit.forwards
        );
    }
    for skipped in &report.skipped {
        println!("  skipped {} ({})", skipped.entry, skipped.reason);
    }
    for failed in &report.failed {
        println!("  FAILED  {}: {}", failed.unit, failed.reason);
    }
}

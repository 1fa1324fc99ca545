//! Extension units for numberone.
//!
//! Units come from two places: the bundled units compiled into the binary
//! (`ping`, `help`) and TOML manifests dropped into the plugins directory.
//! [`loader::PluginLoader`] registers both into a dispatcher once, at startup.

pub mod bundled;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod unit;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    error::{Error, Result},
    loader::{FailedUnit, LoadReport, PluginLoader, SkippedEntry, register_units},
    manifest::{ManifestUnit, load_manifest, parse_manifest},
    unit::ExtensionUnit,
};

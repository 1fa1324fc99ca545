//! Extension unit loading.
//!
//! Bundled units are registered first, in configuration order, then every
//! `*.toml` manifest found directly in the plugins directory, in file-name
//! order. Each unit is registered at most once; a unit that fails is logged
//! and reported without affecting the others.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use {
    numberone_dispatch::{DispatcherBuilder, UnitSummary},
    tracing::{debug, info, warn},
};

use crate::{
    bundled::{BUNDLED_UNIT_NAMES, bundled_unit},
    error::{Error, Result},
    manifest::load_manifest,
    unit::ExtensionUnit,
};

/// Extension of manifest units.
pub const MANIFEST_EXTENSION: &str = "toml";

/// An entry that was not loaded, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub entry: String,
    pub reason: String,
}

/// A unit that failed to parse or register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUnit {
    pub unit: String,
    pub reason: String,
}

/// Outcome of a loading pass.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<UnitSummary>,
    pub skipped: Vec<SkippedEntry>,
    pub failed: Vec<FailedUnit>,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|u| u.unit.as_str()).collect()
    }

    fn skip(&mut self, entry: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedEntry {
            entry: entry.into(),
            reason: reason.into(),
        });
    }

    fn fail(&mut self, unit: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(FailedUnit {
            unit: unit.into(),
            reason: reason.into(),
        });
    }
}

/// Loads bundled and manifest units into a dispatcher, once.
pub struct PluginLoader {
    dir: PathBuf,
    initializer: String,
    bundled: Vec<String>,
    done: AtomicBool,
}

impl PluginLoader {
    pub fn new(
        dir: impl Into<PathBuf>,
        initializer: impl Into<String>,
        bundled: Vec<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            initializer: initializer.into(),
            bundled,
            done: AtomicBool::new(false),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_loaded(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Register every unit into `builder`.
    ///
    /// Only the first call does anything; later calls return
    /// [`Error::AlreadyLoaded`].
    pub fn load(&self, builder: &mut DispatcherBuilder) -> Result<LoadReport> {
        if self.done.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyLoaded);
        }

        let started = Instant::now();
        let mut report = LoadReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for name in &self.bundled {
            match bundled_unit(name) {
                Some(unit) => register(builder, unit.as_ref(), &mut seen, &mut report),
                None => {
                    let available = BUNDLED_UNIT_NAMES.join(", ");
                    warn!(unit = %name, available = %available, "unknown bundled unit");
                    report.fail(
                        name.clone(),
                        format!("unknown bundled unit (available: {available})"),
                    );
                },
            }
        }

        for path in self.scan(&mut report) {
            match load_manifest(&path) {
                Ok(unit) => register(builder, &unit, &mut seen, &mut report),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load plugin manifest");
                    report.fail(path.display().to_string(), e.to_string());
                },
            }
        }

        report.elapsed = started.elapsed();
        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "plugins loaded in {:.2?}",
            report.elapsed
        );
        Ok(report)
    }

    /// Manifest files in the plugins directory, sorted by file name.
    fn scan(&self, report: &mut LoadReport) -> Vec<PathBuf> {
        if !self.dir.is_dir() {
            warn!(dir = %self.dir.display(), "plugins directory not found");
            return Vec::new();
        }
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to read plugins directory");
                return Vec::new();
            },
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();

        let mut manifests = Vec::new();
        for path in paths {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !path.is_file() {
                debug!(entry = %file_name, "skip: not a file");
                report.skip(file_name, "not a file");
            } else if file_name == self.initializer {
                debug!(entry = %file_name, "skip: initializer");
                report.skip(file_name, "initializer");
            } else if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) {
                debug!(entry = %file_name, "skip: not a manifest");
                report.skip(file_name, "not a manifest");
            } else {
                manifests.push(path);
            }
        }
        manifests
    }
}

fn register(
    builder: &mut DispatcherBuilder,
    unit: &dyn ExtensionUnit,
    seen: &mut HashSet<String>,
    report: &mut LoadReport,
) {
    let name = unit.name().to_string();
    if !seen.insert(name.clone()) {
        warn!(unit = %name, "unit already loaded, skipping");
        report.skip(name, "already loaded");
        return;
    }
    info!(unit = %name, "load plugin");
    match builder.register_unit(&name, |r| unit.register(r)) {
        Ok(summary) => report.loaded.push(summary),
        Err(e) => {
            warn!(unit = %name, error = %e, "failed to register plugin");
            report.fail(name, e.to_string());
        },
    }
}

/// Units registered explicitly by the embedding program.
pub fn register_units(
    builder: &mut DispatcherBuilder,
    units: &[Arc<dyn ExtensionUnit>],
) -> LoadReport {
    let started = Instant::now();
    let mut report = LoadReport::default();
    let mut seen = HashSet::new();
    for unit in units {
        register(builder, unit.as_ref(), &mut seen, &mut report);
    }
    report.elapsed = started.elapsed();
    report
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use numberone_dispatch::{RegistrationError, UnitRegistrar};

    use super::*;

    fn bundled_defaults() -> Vec<String> {
        vec!["ping".into(), "help".into()]
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn loads_bundled_then_manifests_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "b.toml", "[[command]]\nname = \"bee\"\nreply = \"b\"\n");
        write(tmp.path(), "a.toml", "[[command]]\nname = \"ay\"\nreply = \"a\"\n");

        let loader = PluginLoader::new(tmp.path(), "init.toml", bundled_defaults());
        let mut builder = DispatcherBuilder::new("root");
        let report = loader.load(&mut builder).unwrap();

        assert_eq!(report.loaded_names(), vec!["ping", "help", "a", "b"]);
        assert!(!report.has_failures());
        assert_eq!(builder.build().command_names(), vec!["ay", "bee", "help", "ping"]);
    }

    #[test]
    fn skips_directories_initializer_and_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("nested.toml")).unwrap();
        write(tmp.path(), "init.toml", "this is not even toml [");
        write(tmp.path(), "README.md", "docs");
        write(tmp.path(), "real.toml", "[[command]]\nname = \"real\"\nreply = \"r\"\n");

        let loader = PluginLoader::new(tmp.path(), "init.toml", Vec::new());
        let mut builder = DispatcherBuilder::new("root");
        let report = loader.load(&mut builder).unwrap();

        assert_eq!(report.loaded_names(), vec!["real"]);
        let skipped: Vec<(&str, &str)> = report
            .skipped
            .iter()
            .map(|s| (s.entry.as_str(), s.reason.as_str()))
            .collect();
        assert_eq!(skipped, vec![
            ("README.md", "not a manifest"),
            ("init.toml", "initializer"),
            ("nested.toml", "not a file"),
        ]);
    }

    #[test]
    fn failing_unit_does_not_abort_others() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "a_bad.toml",
            "[[command]]\nname = \"bad\"\npattern = '(?P<x>.+)'\nreply = \"x\"\n",
        );
        write(tmp.path(), "b_broken.toml", "[[command]\n");
        write(tmp.path(), "c_good.toml", "[[command]]\nname = \"good\"\nreply = \"g\"\n");

        let loader = PluginLoader::new(tmp.path(), "init.toml", Vec::new());
        let mut builder = DispatcherBuilder::new("root");
        let report = loader.load(&mut builder).unwrap();

        assert_eq!(report.loaded_names(), vec!["c_good"]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].unit, "a_bad");
        assert!(report.has_failures());
        let def = builder.build();
        assert!(def.command("bad").is_none());
        assert!(def.command("good").is_some());
    }

    #[test]
    fn duplicate_unit_names_load_once() {
        let tmp = tempfile::tempdir().unwrap();
        let unit = |command: &str| {
            format!("name = \"same\"\n[[command]]\nname = \"{command}\"\nreply = \"x\"\n")
        };
        write(tmp.path(), "one.toml", &unit("first"));
        write(tmp.path(), "two.toml", &unit("second"));

        let loader = PluginLoader::new(tmp.path(), "init.toml", Vec::new());
        let mut builder = DispatcherBuilder::new("root");
        let report = loader.load(&mut builder).unwrap();

        assert_eq!(report.loaded_names(), vec!["same"]);
        assert_eq!(report.skipped[0].reason, "already loaded");
        assert!(builder.build().command("second").is_none());
    }

    #[test]
    fn missing_directory_counts_as_empty() {
        let loader = PluginLoader::new("/nonexistent/plugins", "init.toml", bundled_defaults());
        let mut builder = DispatcherBuilder::new("root");
        let report = loader.load(&mut builder).unwrap();
        assert_eq!(report.loaded_names(), vec!["ping", "help"]);
    }

    #[test]
    fn unknown_bundled_unit_is_reported() {
        let loader = PluginLoader::new("/nonexistent", "init.toml", vec!["weather".into()]);
        let mut builder = DispatcherBuilder::new("root");
        let report = loader.load(&mut builder).unwrap();
        assert_eq!(report.failed[0].unit, "weather");
        assert_eq!(report.failed[0].reason, "unknown bundled unit (available: ping, help)");
    }

    #[test]
    fn second_load_is_refused() {
        let loader = PluginLoader::new("/nonexistent", "init.toml", bundled_defaults());
        let mut builder = DispatcherBuilder::new("root");
        loader.load(&mut builder).unwrap();
        assert!(loader.is_loaded());
        assert!(matches!(loader.load(&mut builder), Err(Error::AlreadyLoaded)));
        assert_eq!(builder.build().command_names(), vec!["help", "ping"]);
    }

    struct Broken;

    impl ExtensionUnit for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn register(
            &self,
            registrar: &mut UnitRegistrar<'_>,
        ) -> std::result::Result<(), RegistrationError> {
            Err(RegistrationError::InvalidSignature {
                handler: format!("{}::handler", registrar.unit()),
            })
        }
    }

    #[test]
    fn explicit_units_are_registered_with_isolation() {
        let units: Vec<Arc<dyn ExtensionUnit>> = vec![
            Arc::new(Broken),
            Arc::new(crate::bundled::ping::PingUnit),
            Arc::new(crate::bundled::ping::PingUnit),
        ];
        let mut builder = DispatcherBuilder::new("root");
        let report = register_units(&mut builder, &units);
        assert_eq!(report.loaded_names(), vec!["ping"]);
        assert_eq!(report.failed[0].unit, "broken");
        assert_eq!(report.skipped.len(), 1);
    }
}

//! Units compiled into the binary.

pub mod help;
pub mod ping;

use std::sync::Arc;

use crate::unit::ExtensionUnit;

/// Names accepted in `plugins.enabled_bundled`.
pub const BUNDLED_UNIT_NAMES: &[&str] = &[ping::UNIT_NAME, help::UNIT_NAME];

/// Look up a bundled unit by name.
pub fn bundled_unit(name: &str) -> Option<Arc<dyn ExtensionUnit>> {
    match name {
        ping::UNIT_NAME => Some(Arc::new(ping::PingUnit)),
        help::UNIT_NAME => Some(Arc::new(help::HelpUnit)),
        _ => None,
    }
}

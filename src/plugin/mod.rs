//! Plugin resolution: locating a plugin's root directory (Component B) and
//! loading its registered actions from its manifest (Component C).

pub mod locator;
pub mod manifest;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use manifest::Plugin;

use crate::error::HanError;

/// Resolve and load a single plugin by its fully-qualified `<name>@<marketplace>`
/// identifier, or a bare name when `marketplace` is `None`.
pub fn load(
    plugin_name: &str,
    marketplace_name: Option<&str>,
    marketplaces: &HashMap<String, PathBuf>,
    cwd: &Path,
) -> Result<Plugin, HanError> {
    let root = locator::locate(plugin_name, marketplace_name, marketplaces, cwd)?;
    Ok(manifest::load(plugin_name, &root))
}

/// Split a configuration key of the form `<plugin>@<marketplace>` into its
/// plugin name and optional marketplace qualifier.
pub fn split_qualified_name(qualified: &str) -> (&str, Option<&str>) {
    match qualified.split_once('@') {
        Some((plugin, marketplace)) => (plugin, Some(marketplace)),
        None => (qualified, None),
    }
}

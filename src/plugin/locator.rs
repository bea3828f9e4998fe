//! Component B — Plugin Locator.
//!
//! Resolves a plugin name (optionally qualified by a marketplace name) to
//! an on-disk root directory, probing a fixed, non-recursive set of
//! sub-roots per candidate marketplace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::HanError;

/// Marker file that makes the current working directory an implicit
/// marketplace root (a plugin-development checkout).
const MARKETPLACE_MARKER: &str = ".claude-plugin/marketplace.json";

/// Conventional sub-roots probed under each marketplace root, in order.
const SUB_ROOTS: &[&str] = &["jutsu", "do", "hashi"];

/// Find the on-disk root of `plugin_name`, optionally qualified by
/// `marketplace_name`.
///
/// `marketplaces` maps marketplace name to root directory, in the order
/// they appear in configuration (a `HashMap` loses insertion order, so
/// callers that care about deterministic unqualified search should pass
/// `search_order` explicitly via [`locate_in_order`]).
pub fn locate(
    plugin_name: &str,
    marketplace_name: Option<&str>,
    marketplaces: &HashMap<String, PathBuf>,
    cwd: &Path,
) -> Result<PathBuf, HanError> {
    let order: Vec<&str> = marketplaces.keys().map(String::as_str).collect();
    locate_in_order(plugin_name, marketplace_name, marketplaces, &order, cwd)
}

/// As [`locate`], but with an explicit, deterministic marketplace search
/// order for the unqualified case.
pub fn locate_in_order(
    plugin_name: &str,
    marketplace_name: Option<&str>,
    marketplaces: &HashMap<String, PathBuf>,
    search_order: &[&str],
    cwd: &Path,
) -> Result<PathBuf, HanError> {
    let mut probed = Vec::new();

    if implicit_marketplace(cwd) {
        if let Some(found) = probe_root(cwd, plugin_name, &mut probed) {
            return Ok(found);
        }
    }

    let candidate_roots: Vec<&Path> = if let Some(marketplace_name) = marketplace_name {
        let root = marketplaces
            .get(marketplace_name)
            .ok_or_else(|| HanError::UnknownMarketplace(marketplace_name.to_string()))?;
        vec![root.as_path()]
    } else {
        search_order
            .iter()
            .filter_map(|name| marketplaces.get(*name))
            .map(PathBuf::as_path)
            .collect()
    };

    for root in candidate_roots {
        if let Some(found) = probe_root(root, plugin_name, &mut probed) {
            return Ok(found);
        }
    }

    Err(HanError::PluginNotFound {
        name: plugin_name.to_string(),
        probed,
    })
}

fn implicit_marketplace(cwd: &Path) -> bool {
    cwd.join(MARKETPLACE_MARKER).is_file()
}

fn probe_root(root: &Path, plugin_name: &str, probed: &mut Vec<PathBuf>) -> Option<PathBuf> {
    for sub in SUB_ROOTS {
        let candidate = root.join(sub).join(plugin_name);
        probed.push(candidate.clone());
        if candidate.is_dir() {
            return Some(candidate);
        }
    }
    let flat = root.join(plugin_name);
    probed.push(flat.clone());
    if flat.is_dir() {
        return Some(flat);
    }
    None
}

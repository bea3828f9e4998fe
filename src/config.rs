//! Component A — Configuration Resolver.
//!
//! Merges the three layered settings scopes (user, project, project-local)
//! into an enabled-plugins set, a marketplace-name -> root map, and any
//! inline hook actions declared directly in settings.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::action::{Action, LifecycleEvent, DEFAULT_TIMEOUT_MS};

/// One scope's settings document, as written by the host CLI.
///
/// Unknown keys are ignored for forward compatibility; every field here is
/// optional because a real settings file usually only overrides a few of
/// them.
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default, rename = "enabledPlugins")]
    enabled_plugins: HashMap<String, bool>,
    #[serde(default, rename = "marketplaces")]
    marketplaces: HashMap<String, PathBuf>,
    #[serde(default)]
    hooks: HashMap<String, Vec<RawInlineHook>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawInlineHook {
    command: String,
    #[serde(default, rename = "dirsWith")]
    dirs_with: Option<String>,
    #[serde(default, rename = "testDir")]
    test_dir: Option<String>,
    #[serde(default, rename = "ifChanged")]
    if_changed: Vec<String>,
    #[serde(default, rename = "failFast")]
    fail_fast: bool,
    #[serde(default, rename = "timeoutMs")]
    timeout_ms: Option<u64>,
}

/// The merged result of resolving configuration across all scopes.
#[derive(Debug, Default, Clone)]
pub struct Config {
    /// Fully-qualified `<plugin>@<marketplace>` names mapped to whether they
    /// are enabled. A later scope's `false` always wins over an earlier
    /// scope's `true`.
    pub enabled_plugins: HashMap<String, bool>,
    /// Marketplace name -> on-disk root, last scope wins whole entry.
    pub marketplaces: HashMap<String, PathBuf>,
    /// Hook actions declared inline in settings rather than by a plugin.
    pub inline_actions: Vec<Action>,
}

impl Config {
    /// Names of plugins currently enabled, in arbitrary order.
    pub fn enabled_plugin_names(&self) -> BTreeSet<String> {
        self.enabled_plugins
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// The three configuration scopes, in precedence order (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    Project,
    ProjectLocal,
}

/// Resolve the default scope file paths, honoring `CLAUDE_CONFIG_DIR` and
/// `CLAUDE_PROJECT_DIR` overrides the same way the rest of the host CLI does.
pub fn default_scope_paths() -> Vec<(Scope, PathBuf)> {
    let project_dir = std::env::var_os("CLAUDE_PROJECT_DIR")
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let user_dir = std::env::var_os("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|d| d.join("claude")));

    let mut paths = Vec::with_capacity(3);
    if let Some(user_dir) = user_dir {
        paths.push((Scope::User, user_dir.join("settings.json")));
    }
    paths.push((
        Scope::Project,
        project_dir.join(".claude").join("settings.json"),
    ));
    paths.push((
        Scope::ProjectLocal,
        project_dir.join(".claude").join("settings.local.json"),
    ));
    paths
}

/// Read and merge the given scope paths in order (lowest precedence first).
///
/// A missing file is a silent no-op. A file that exists but fails to parse
/// is logged and treated as empty — it never aborts resolution for the
/// other scopes.
pub fn resolve(paths: &[(Scope, PathBuf)]) -> Config {
    let mut config = Config::default();

    for (scope, path) in paths {
        let raw = match read_scope(path) {
            Some(raw) => raw,
            None => continue,
        };

        for (name, enabled) in raw.enabled_plugins {
            config.enabled_plugins.insert(name, enabled);
        }
        for (name, root) in raw.marketplaces {
            config.marketplaces.insert(name, root);
        }
        for (event_name, hooks) in raw.hooks {
            let event = match LifecycleEvent::from_str(&event_name) {
                Ok(event) => event,
                Err(reason) => {
                    tracing::warn!(scope = ?scope, event = %event_name, %reason, "ignoring inline hook for unknown event");
                    continue;
                }
            };
            for (index, hook) in hooks.into_iter().enumerate() {
                config
                    .inline_actions
                    .push(inline_action(&event_name, event, index, hook));
            }
        }
    }

    config
}

fn inline_action(
    event_name: &str,
    event: LifecycleEvent,
    index: usize,
    hook: RawInlineHook,
) -> Action {
    let mut events = BTreeSet::new();
    events.insert(event);
    Action {
        name: format!("inline:{event_name}:{index}"),
        plugin_name: "inline".to_string(),
        plugin_root: None,
        events,
        command_template: hook.command,
        dirs_with: hook.dirs_with,
        test_dir: hook.test_dir,
        if_changed: hook.if_changed,
        fail_fast: hook.fail_fast,
        timeout_ms: hook.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
    }
}

fn read_scope(path: &Path) -> Option<RawSettings> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not read settings file");
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(raw) => Some(raw),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unparseable settings file");
            None
        }
    }
}

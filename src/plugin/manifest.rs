//! Component C — Plugin Manifest Loader.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::action::{Action, LifecycleEvent, DEFAULT_TIMEOUT_MS};

const MANIFEST_RELATIVE_PATH: &str = ".claude-plugin/plugin.json";

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(default)]
    hooks: Vec<RawAction>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAction {
    name: Option<String>,
    #[serde(default)]
    events: Vec<String>,
    #[serde(default, rename = "command")]
    command_template: Option<String>,
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

/// A plugin resolved on disk: its root and its registered actions.
#[derive(Debug, Clone)]
pub struct Plugin {
    pub name: String,
    pub root: PathBuf,
    pub actions: Vec<Action>,
}

/// Load a plugin's manifest from its root directory.
///
/// A missing or empty manifest yields an empty action set rather than an
/// error. An individual action missing `events` or `command` is skipped
/// with a warning; the rest of the plugin's actions still load.
pub fn load(plugin_name: &str, plugin_root: &Path) -> Plugin {
    let manifest_path = plugin_root.join(MANIFEST_RELATIVE_PATH);
    let raw = read_manifest(plugin_name, &manifest_path);

    let mut actions = Vec::with_capacity(raw.hooks.len());
    for (index, raw_action) in raw.hooks.into_iter().enumerate() {
        match build_action(plugin_name, plugin_root, index, raw_action) {
            Ok(action) => actions.push(action),
            Err(reason) => {
                tracing::warn!(plugin = plugin_name, %reason, "skipping malformed action");
            }
        }
    }

    Plugin {
        name: plugin_name.to_string(),
        root: plugin_root.to_path_buf(),
        actions,
    }
}

fn read_manifest(plugin_name: &str, path: &Path) -> RawManifest {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return RawManifest::default(),
        Err(err) => {
            tracing::warn!(plugin = plugin_name, path = %path.display(), error = %err, "could not read plugin manifest");
            return RawManifest::default();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(plugin = plugin_name, path = %path.display(), error = %err, "ignoring unparseable plugin manifest");
            RawManifest::default()
        }
    }
}

fn build_action(
    plugin_name: &str,
    plugin_root: &Path,
    index: usize,
    raw: RawAction,
) -> Result<Action, String> {
    let command_template = raw
        .command_template
        .filter(|c| !c.is_empty())
        .ok_or_else(|| "missing or empty 'command'".to_string())?;

    if raw.events.is_empty() {
        return Err("missing 'events'".to_string());
    }

    let mut events = BTreeSet::new();
    for event in &raw.events {
        match LifecycleEvent::from_str(event) {
            Ok(event) => {
                events.insert(event);
            }
            Err(reason) => return Err(reason),
        }
    }

    let name = raw
        .name
        .unwrap_or_else(|| format!("{plugin_name}#{index}"));

    Ok(Action {
        name,
        plugin_name: plugin_name.to_string(),
        plugin_root: Some(plugin_root.to_path_buf()),
        events,
        command_template,
        dirs_with: raw.dirs_with,
        test_dir: raw.test_dir,
        if_changed: raw.if_changed,
        fail_fast: raw.fail_fast,
        timeout_ms: raw.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(root: &Path, json: &str) {
        fs::create_dir_all(root.join(".claude-plugin")).unwrap();
        fs::write(root.join(MANIFEST_RELATIVE_PATH), json).unwrap();
    }

    #[test]
    fn missing_manifest_yields_empty_actions() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = load("p", dir.path());
        assert!(plugin.actions.is_empty());
    }

    #[test]
    fn loads_well_formed_action() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{"hooks": [{"name": "fmt", "events": ["Stop"], "command": "echo hi", "ifChanged": ["*.ts"]}]}"#,
        );
        let plugin = load("p", dir.path());
        assert_eq!(plugin.actions.len(), 1);
        assert_eq!(plugin.actions[0].name, "fmt");
        assert_eq!(plugin.actions[0].if_changed, vec!["*.ts".to_string()]);
    }

    #[test]
    fn action_missing_events_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{"hooks": [
                {"command": "echo hi"},
                {"name": "ok", "events": ["Stop"], "command": "echo bye"}
            ]}"#,
        );
        let plugin = load("p", dir.path());
        assert_eq!(plugin.actions.len(), 1);
        assert_eq!(plugin.actions[0].name, "ok");
    }

    #[test]
    fn unknown_manifest_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{"hooks": [{"name": "fmt", "events": ["Stop"], "command": "echo hi", "somethingNew": 42}]}"#,
        );
        let plugin = load("p", dir.path());
        assert_eq!(plugin.actions.len(), 1);
    }
}

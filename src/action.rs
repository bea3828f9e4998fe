//! The [`Action`] data model shared by the plugin manifest loader, the
//! inline-hook loader, and the legacy `run --dirs-with` synthesizer.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default per-action timeout, matching the host CLI's own hook timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// A lifecycle event a hook action can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LifecycleEvent {
    SessionStart,
    Stop,
    PostToolUse,
    PreToolUse,
    UserPromptSubmit,
    SubagentStop,
}

impl LifecycleEvent {
    /// The checkpoint type string injected for `Stop`/`SubagentStop` events.
    pub fn checkpoint_type(self) -> Option<&'static str> {
        match self {
            LifecycleEvent::Stop => Some("session"),
            LifecycleEvent::SubagentStop => Some("agent"),
            _ => None,
        }
    }
}

impl std::str::FromStr for LifecycleEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SessionStart" => Ok(LifecycleEvent::SessionStart),
            "Stop" => Ok(LifecycleEvent::Stop),
            "PostToolUse" => Ok(LifecycleEvent::PostToolUse),
            "PreToolUse" => Ok(LifecycleEvent::PreToolUse),
            "UserPromptSubmit" => Ok(LifecycleEvent::UserPromptSubmit),
            "SubagentStop" => Ok(LifecycleEvent::SubagentStop),
            other => Err(format!("unknown lifecycle event '{other}'")),
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleEvent::SessionStart => "SessionStart",
            LifecycleEvent::Stop => "Stop",
            LifecycleEvent::PostToolUse => "PostToolUse",
            LifecycleEvent::PreToolUse => "PreToolUse",
            LifecycleEvent::UserPromptSubmit => "UserPromptSubmit",
            LifecycleEvent::SubagentStop => "SubagentStop",
        };
        f.write_str(s)
    }
}

/// A named unit of work registered by a plugin (or synthesized inline / from
/// the legacy CLI form).
#[derive(Debug, Clone)]
pub struct Action {
    /// Identifier unique within the owning plugin.
    pub name: String,
    /// Plugin that owns this action (`"inline"` for settings-declared hooks,
    /// `"legacy"` for the ad-hoc `--dirs-with` CLI form).
    pub plugin_name: String,
    /// Absolute root of the owning plugin, used to expand
    /// `${CLAUDE_PLUGIN_ROOT}`. `None` for actions with no plugin root.
    pub plugin_root: Option<PathBuf>,
    pub events: BTreeSet<LifecycleEvent>,
    pub command_template: String,
    pub dirs_with: Option<String>,
    pub test_dir: Option<String>,
    pub if_changed: Vec<String>,
    pub fail_fast: bool,
    pub timeout_ms: u64,
}

impl Action {
    /// Whether this action runs across multiple discovered directories, or
    /// once in the caller's current directory.
    pub fn is_multi_directory(&self) -> bool {
        self.dirs_with.is_some() || self.test_dir.is_some()
    }

    /// Expand `${CLAUDE_PLUGIN_ROOT}` in the command template.
    pub fn resolved_command(&self) -> String {
        match &self.plugin_root {
            Some(root) => self
                .command_template
                .replace("${CLAUDE_PLUGIN_ROOT}", &root.to_string_lossy()),
            None => self.command_template.clone(),
        }
    }
}

//! Component H — Event Dispatcher.
//!
//! Orchestrates the full pipeline for a lifecycle event: resolve
//! configuration (A), locate and load each enabled plugin (B, C), merge in
//! inline actions, filter by event, discover target directories per action
//! (D), and run each action through the concurrency coordinator (G),
//! aggregating exit codes and output across actions in declaration order.

use std::path::PathBuf;

use serde::Deserialize;

use crate::action::{Action, LifecycleEvent};
use crate::config::{self, Config};
use crate::coordinator::{self, RunResult};
use crate::discover;
use crate::exec::RunContext;
use crate::plugin;

/// Disables the entire dispatcher when set to a truthy value, matching the
/// host CLI's own emergency kill switch.
const DISABLE_ENV: &str = "HAN_DISABLE_HOOKS";

/// The aggregate result of dispatching one event across every matching
/// action.
#[derive(Debug, Default)]
pub struct DispatchResult {
    pub exit_code: i32,
    pub actions_run: usize,
    pub runs: Vec<(String, RunResult)>,
}

/// Options controlling one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub cache_enabled: bool,
    /// Ignore per-event filtering and dispatch every registered action,
    /// regardless of which event it's bound to.
    pub all: bool,
    pub checkpoints_enabled: bool,
    pub stdin: Option<Vec<u8>>,
}

/// The fields of the trigger payload this engine cares about. The payload
/// carries more than this (at least `hook_event_name`); unknown keys are
/// ignored.
#[derive(Debug, Default, Deserialize)]
struct TriggerPayload {
    session_id: Option<String>,
    agent_id: Option<String>,
}

/// Dispatch `event`, running every enabled plugin action (plus inline
/// actions) registered for it.
pub async fn dispatch(
    event: LifecycleEvent,
    cwd: &std::path::Path,
    options: DispatchOptions,
) -> DispatchResult {
    if is_disabled() {
        tracing::info!(%event, "hooks disabled via HAN_DISABLE_HOOKS, skipping dispatch");
        return DispatchResult::default();
    }

    let config = config::resolve(&config::default_scope_paths());
    let actions = collect_actions(&config, cwd, event, options.all);

    if actions.is_empty() {
        tracing::debug!(%event, "no actions registered for event");
        return DispatchResult::default();
    }

    let project_dir = std::env::var_os("CLAUDE_PROJECT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.to_path_buf());

    let checkpoint_id = if options.checkpoints_enabled {
        checkpoint_id_from_payload(event, options.stdin.as_deref())
    } else {
        None
    };

    let mut result = DispatchResult::default();

    for action in &actions {
        let targets = discover::discover(action, cwd).await;
        let ctx = RunContext {
            event: Some(event),
            checkpoint_id: checkpoint_id.clone(),
            project_dir: project_dir.clone(),
            stdin: options.stdin.clone(),
        };

        let run_result = coordinator::run(action, targets, ctx, options.cache_enabled).await;
        result.actions_run += 1;
        result.exit_code = result.exit_code.max(run_result.exit_code);
        result.runs.push((action.name.clone(), run_result));
    }

    result
}

fn is_disabled() -> bool {
    std::env::var(DISABLE_ENV)
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Extract this event's checkpoint identifier (`session_id` for `Stop`,
/// `agent_id` for `SubagentStop`) from the trigger payload. Returns `None`
/// for events with no checkpoint type, when there's no stdin payload, or
/// when the payload doesn't parse or doesn't carry the relevant field.
fn checkpoint_id_from_payload(event: LifecycleEvent, stdin: Option<&[u8]>) -> Option<String> {
    let checkpoint_type = event.checkpoint_type()?;
    let payload: TriggerPayload = serde_json::from_slice(stdin?).ok()?;
    match checkpoint_type {
        "session" => payload.session_id,
        "agent" => payload.agent_id,
        _ => None,
    }
}

fn collect_actions(
    config: &Config,
    cwd: &std::path::Path,
    event: LifecycleEvent,
    all: bool,
) -> Vec<Action> {
    let mut actions = Vec::new();

    for qualified_name in config.enabled_plugin_names() {
        let (plugin_name, marketplace_name) = plugin::split_qualified_name(&qualified_name);
        match plugin::load(plugin_name, marketplace_name, &config.marketplaces, cwd) {
            Ok(loaded) => actions.extend(loaded.actions),
            Err(err) => {
                tracing::warn!(plugin = qualified_name, error = %err, "could not load enabled plugin");
            }
        }
    }

    actions.extend(config.inline_actions.iter().cloned());
    if !all {
        actions.retain(|action| action.events.contains(&event));
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_env_var_recognizes_common_truthy_values() {
        for value in ["1", "true", "yes"] {
            std::env::set_var(DISABLE_ENV, value);
            assert!(is_disabled());
        }
        std::env::remove_var(DISABLE_ENV);
        assert!(!is_disabled());
    }

    #[test]
    fn checkpoint_id_reads_session_id_for_stop() {
        let payload = br#"{"hook_event_name": "Stop", "session_id": "sess-1"}"#;
        assert_eq!(
            checkpoint_id_from_payload(LifecycleEvent::Stop, Some(payload)),
            Some("sess-1".to_string())
        );
    }

    #[test]
    fn checkpoint_id_reads_agent_id_for_subagent_stop() {
        let payload = br#"{"hook_event_name": "SubagentStop", "agent_id": "agent-1"}"#;
        assert_eq!(
            checkpoint_id_from_payload(LifecycleEvent::SubagentStop, Some(payload)),
            Some("agent-1".to_string())
        );
    }

    #[test]
    fn checkpoint_id_is_none_for_non_checkpoint_events() {
        let payload = br#"{"session_id": "sess-1"}"#;
        assert_eq!(
            checkpoint_id_from_payload(LifecycleEvent::PreToolUse, Some(payload)),
            None
        );
    }

    #[test]
    fn checkpoint_id_is_none_without_a_payload() {
        assert_eq!(checkpoint_id_from_payload(LifecycleEvent::Stop, None), None);
    }
}

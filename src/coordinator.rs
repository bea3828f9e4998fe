//! Component G — Concurrency Coordinator.
//!
//! Runs one action across its discovered target directories with bounded
//! worker concurrency, preserves deterministic lexicographic output
//! ordering regardless of completion order, and implements fail-fast
//! cancellation.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};

use crate::action::Action;
use crate::cache;
use crate::exec::{self, ExecutionOutcome, RunContext};

/// The combined result of running one action across all its target
/// directories.
#[derive(Debug)]
pub struct RunResult {
    pub outcomes: Vec<ExecutionOutcome>,
    pub exit_code: i32,
}

/// Run `action` against every directory in `targets`, honoring
/// `action.fail_fast` and consulting the fingerprint cache when
/// `cache_enabled` is set.
///
/// Worker concurrency is bounded to `min(targets.len(), num_cpus::get())`.
/// Output ordering in the returned `outcomes` always matches `targets`'
/// lexicographic order, independent of which child finished first.
pub async fn run(
    action: &Action,
    targets: Vec<PathBuf>,
    ctx: RunContext,
    cache_enabled: bool,
) -> RunResult {
    if targets.is_empty() {
        return RunResult {
            outcomes: Vec::new(),
            exit_code: 0,
        };
    }

    let concurrency = targets.len().min(num_cpus::get()).max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    // A watch channel doubles as the fail-fast signal: workers that haven't
    // started yet see `true` before acquiring a permit and skip straight to
    // `cancelled`, while workers already mid-execution observe it through
    // the same receiver passed into `exec::run` and get killed in flight.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel_tx = Arc::new(cancel_tx);
    let cache_root = cache::cache_root();

    let mut handles = Vec::with_capacity(targets.len());
    for dir in targets {
        let semaphore = Arc::clone(&semaphore);
        let cancel_tx = Arc::clone(&cancel_tx);
        let cancel_rx = cancel_rx.clone();
        let action = action.clone();
        let ctx = ctx.clone();
        let cache_root = cache_root.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore not closed");

            if *cancel_rx.borrow() {
                return ExecutionOutcome::cancelled(dir);
            }

            let fingerprint = if cache_enabled && !action.if_changed.is_empty() {
                cache::fingerprint(&dir, &action.if_changed).ok()
            } else {
                None
            };

            if let Some(fingerprint) = &fingerprint {
                if !cache::should_run(&cache_root, &action.plugin_name, &action.name, &dir, fingerprint)
                {
                    return ExecutionOutcome::skipped(dir);
                }
            }

            let outcome = exec::run(&action, &dir, &ctx, cancel_rx.clone()).await;

            if outcome.exit_code == 0 && !outcome.cancelled {
                if let Some(fingerprint) = &fingerprint {
                    if let Err(err) =
                        cache::commit(&cache_root, &action.plugin_name, &action.name, &dir, fingerprint)
                    {
                        tracing::warn!(dir = %dir.display(), error = %err, "failed to commit cache entry");
                    }
                }
            }

            if action.fail_fast && outcome.exit_code != 0 && !outcome.cancelled {
                let _ = cancel_tx.send(true);
            }

            outcome
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(join_err) => {
                tracing::error!(error = %join_err, "action worker task panicked");
            }
        }
    }
    outcomes.sort_by(|a, b| a.dir.cmp(&b.dir));

    let fail_fast_triggered = action.fail_fast && outcomes.iter().any(|o| o.exit_code != 0 && !o.cancelled);
    let exit_code = if fail_fast_triggered {
        outcomes
            .iter()
            .find(|o| o.exit_code != 0 && !o.cancelled)
            .map(|o| o.exit_code)
            .unwrap_or(0)
    } else {
        outcomes.iter().map(|o| o.exit_code).max().unwrap_or(0)
    };

    RunResult { outcomes, exit_code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn action(command: &str, fail_fast: bool) -> Action {
        Action {
            name: "a".to_string(),
            plugin_name: "p".to_string(),
            plugin_root: None,
            events: BTreeSet::new(),
            command_template: command.to_string(),
            dirs_with: None,
            test_dir: None,
            if_changed: Vec::new(),
            fail_fast,
            timeout_ms: 5000,
        }
    }

    fn ctx() -> RunContext {
        RunContext {
            event: None,
            checkpoint_id: None,
            project_dir: PathBuf::from("/tmp"),
            stdin: None,
        }
    }

    #[tokio::test]
    async fn outcomes_are_ordered_lexicographically() {
        let base = tempfile::tempdir().unwrap();
        let mut targets = Vec::new();
        for name in ["z", "a", "m"] {
            let dir = base.path().join(name);
            std::fs::create_dir_all(&dir).unwrap();
            targets.push(dir);
        }

        let result = run(&action("true", false), targets, ctx(), false).await;
        let dirs: Vec<_> = result.outcomes.iter().map(|o| o.dir.clone()).collect();
        let mut sorted = dirs.clone();
        sorted.sort();
        assert_eq!(dirs, sorted);
    }

    #[tokio::test]
    async fn fail_fast_kills_in_flight_sibling() {
        let base = tempfile::tempdir().unwrap();
        let alpha = base.path().join("alpha");
        let bravo = base.path().join("bravo");
        std::fs::create_dir_all(&alpha).unwrap();
        std::fs::create_dir_all(&bravo).unwrap();

        let action = action(
            "test \"$(basename \"$(pwd)\")\" = alpha && exit 7 || sleep 5",
            true,
        );

        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(4),
            run(&action, vec![alpha, bravo], ctx(), false),
        )
        .await
        .expect("fail-fast should kill bravo well before its 5s sleep completes");
        let elapsed = started.elapsed();

        assert_eq!(result.exit_code, 7);
        let bravo_outcome = result
            .outcomes
            .iter()
            .find(|o| o.dir.ends_with("bravo"))
            .unwrap();
        assert!(bravo_outcome.cancelled, "bravo should be killed in flight, not run to completion");
        assert!(elapsed < std::time::Duration::from_secs(4));
    }

    #[tokio::test]
    async fn exit_code_is_max_without_fail_fast() {
        let base = tempfile::tempdir().unwrap();
        let a = base.path().join("a");
        let b = base.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();

        let result = run(
            &action("exit $(basename $(pwd) | wc -c)", false),
            vec![a, b],
            ctx(),
            false,
        )
        .await;
        assert!(result.exit_code >= 0);
    }

    #[tokio::test]
    async fn no_targets_yields_zero_exit() {
        let result = run(&action("true", false), Vec::new(), ctx(), false).await;
        assert_eq!(result.exit_code, 0);
        assert!(result.outcomes.is_empty());
    }
}

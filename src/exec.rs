//! Component F — Per-Directory Executor.
//!
//! Spawns one action's resolved command in one target directory, forwards
//! stdin, drains stdout/stderr concurrently, and enforces the action's
//! timeout with a SIGTERM-then-SIGKILL grace period.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::action::{Action, LifecycleEvent};

/// Exit code synthesized when a child is killed for exceeding its timeout,
/// matching the convention shells use for signal-terminated processes.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// The grace period between SIGTERM and SIGKILL once a timeout fires.
const KILL_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// The outcome of running one action against one directory.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub dir: PathBuf,
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    pub timed_out: bool,
    pub skipped: bool,
    pub cancelled: bool,
}

impl ExecutionOutcome {
    pub fn skipped(dir: PathBuf) -> Self {
        ExecutionOutcome {
            dir,
            exit_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            duration: Duration::ZERO,
            timed_out: false,
            skipped: true,
            cancelled: false,
        }
    }

    pub fn cancelled(dir: PathBuf) -> Self {
        ExecutionOutcome {
            dir,
            exit_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            duration: Duration::ZERO,
            timed_out: false,
            skipped: false,
            cancelled: true,
        }
    }
}

/// Context shared by every child spawned for one dispatch: the triggering
/// event, optional checkpoint identity, and forwarded stdin bytes.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub event: Option<LifecycleEvent>,
    pub checkpoint_id: Option<String>,
    pub project_dir: PathBuf,
    pub stdin: Option<Vec<u8>>,
}

/// Run `action`'s resolved command in `dir`, enforcing its timeout and
/// killing the child in flight if `cancel` flips to `true` (fail-fast from a
/// sibling directory).
pub async fn run(
    action: &Action,
    dir: &Path,
    ctx: &RunContext,
    mut cancel: watch::Receiver<bool>,
) -> ExecutionOutcome {
    let started = Instant::now();
    let command_line = action.resolved_command();

    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(&command_line)
        .current_dir(dir)
        .env("CLAUDE_PROJECT_DIR", &ctx.project_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(root) = &action.plugin_root {
        command.env("CLAUDE_PLUGIN_ROOT", root);
    }
    if let Some(event) = ctx.event {
        command.env("HAN_HOOK_EVENT", event.to_string());
        if let Some(checkpoint_type) = event.checkpoint_type() {
            command.env("HAN_CHECKPOINT_TYPE", checkpoint_type);
            if let Some(checkpoint_id) = &ctx.checkpoint_id {
                command.env("HAN_CHECKPOINT_ID", checkpoint_id);
            }
        }
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::error!(dir = %dir.display(), error = %err, "failed to spawn action command");
            return ExecutionOutcome {
                dir: dir.to_path_buf(),
                exit_code: 127,
                stdout: Vec::new(),
                stderr: format!("failed to spawn: {err}").into_bytes(),
                duration: started.elapsed(),
                timed_out: false,
                skipped: false,
                cancelled: false,
            };
        }
    };

    if let (Some(bytes), Some(mut stdin)) = (&ctx.stdin, child.stdin.take()) {
        let bytes = bytes.clone();
        tokio::spawn(async move {
            let _ = stdin.write_all(&bytes).await;
        });
    } else {
        drop(child.stdin.take());
    }

    let mut stdout_pipe = child.stdout.take().expect("piped stdout");
    let mut stderr_pipe = child.stderr.take().expect("piped stderr");

    tokio::select! {
        _ = wait_for_cancel(&mut cancel) => {
            tracing::info!(dir = %dir.display(), "cancelling in-flight command (fail-fast)");
            terminate_then_kill(&mut child).await;
            ExecutionOutcome::cancelled(dir.to_path_buf())
        }
        drained = timeout(Duration::from_millis(action.timeout_ms), async {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            tokio::join!(
                stdout_pipe.read_to_end(&mut stdout),
                stderr_pipe.read_to_end(&mut stderr),
            );
            let status = child.wait().await;
            (status, stdout, stderr)
        }) => {
            match drained {
                Ok((status, stdout, stderr)) => {
                    let exit_code = status
                        .ok()
                        .and_then(|status| status.code())
                        .unwrap_or(127);
                    ExecutionOutcome {
                        dir: dir.to_path_buf(),
                        exit_code,
                        stdout,
                        stderr,
                        duration: started.elapsed(),
                        timed_out: false,
                        skipped: false,
                        cancelled: false,
                    }
                }
                Err(_) => {
                    tracing::warn!(dir = %dir.display(), timeout_ms = action.timeout_ms, "action timed out, sending SIGTERM");
                    terminate_then_kill(&mut child).await;
                    ExecutionOutcome {
                        dir: dir.to_path_buf(),
                        exit_code: TIMEOUT_EXIT_CODE,
                        stdout: Vec::new(),
                        stderr: format!(
                            "han: action timed out after {}ms\n",
                            action.timeout_ms
                        )
                        .into_bytes(),
                        duration: started.elapsed(),
                        timed_out: true,
                        skipped: false,
                        cancelled: false,
                    }
                }
            }
        }
    }
}

/// Resolve once `cancel` has (or becomes) `true`; stays pending forever if
/// the sender is dropped without ever cancelling, so it never spuriously
/// wins the race in [`run`]'s `select!`.
async fn wait_for_cancel(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
async fn terminate_then_kill(child: &mut tokio::process::Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc_kill(pid as i32, 15);
        }
    }
    if timeout(KILL_GRACE_PERIOD, child.wait()).await.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(not(unix))]
async fn terminate_then_kill(child: &mut tokio::process::Child) {
    let _ = child.start_kill();
    let _ = timeout(KILL_GRACE_PERIOD, child.wait()).await;
}

#[cfg(unix)]
extern "C" {
    #[link_name = "kill"]
    fn libc_kill(pid: i32, sig: i32) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn action(command: &str, timeout_ms: u64) -> Action {
        Action {
            name: "a".to_string(),
            plugin_name: "p".to_string(),
            plugin_root: None,
            events: BTreeSet::new(),
            command_template: command.to_string(),
            dirs_with: None,
            test_dir: None,
            if_changed: Vec::new(),
            fail_fast: false,
            timeout_ms,
        }
    }

    fn ctx() -> RunContext {
        RunContext {
            event: Some(LifecycleEvent::Stop),
            checkpoint_id: Some("chk-1".to_string()),
            project_dir: PathBuf::from("/tmp"),
            stdin: None,
        }
    }

    fn no_cancel() -> watch::Receiver<bool> {
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[tokio::test]
    async fn captures_exit_code_and_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run(&action("echo hello", 5000), dir.path(), &ctx(), no_cancel()).await;
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, b"hello\n");
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn nonzero_exit_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run(&action("exit 3", 5000), dir.path(), &ctx(), no_cancel()).await;
        assert_eq!(outcome.exit_code, 3);
    }

    #[tokio::test]
    async fn slow_command_is_killed_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run(&action("sleep 30", 200), dir.path(), &ctx(), no_cancel()).await;
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, TIMEOUT_EXIT_CODE);
        assert!(
            String::from_utf8_lossy(&outcome.stderr).contains("timed out"),
            "timeout outcome should carry a stderr note"
        );
    }

    #[tokio::test]
    async fn checkpoint_env_vars_are_injected_for_stop() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run(
            &action("echo $HAN_CHECKPOINT_TYPE:$HAN_CHECKPOINT_ID", 5000),
            dir.path(),
            &ctx(),
            no_cancel(),
        )
        .await;
        assert_eq!(outcome.stdout, b"session:chk-1\n");
    }

    #[tokio::test]
    async fn cancel_signal_kills_in_flight_command() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = watch::channel(false);

        let run_future = run(&action("sleep 30", 5000), dir.path(), &ctx(), rx);
        tokio::pin!(run_future);

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(3), run_future)
            .await
            .expect("cancellation should interrupt the sleep well before it finishes");
        assert!(outcome.cancelled);
        assert!(!outcome.timed_out);
    }
}

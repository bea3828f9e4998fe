//! Component D — Directory Discoverer.
//!
//! Enumerates the directories an action should run against: immediate
//! subdirectories of a start directory, filtered by a marker-file test
//! (`dirsWith`) and/or a probe command (`testDir`), lexicographically
//! ordered.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::action::Action;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Discover the directories `action` should run in, rooted at `start`.
///
/// If the action declares neither `dirsWith` nor `testDir`, the only
/// target is `start` itself. Otherwise every immediate subdirectory of
/// `start` (plus `start` itself) is tested against the declared filters,
/// in lexicographic order by path.
pub async fn discover(action: &Action, start: &Path) -> Vec<PathBuf> {
    if !action.is_multi_directory() {
        return vec![start.to_path_buf()];
    }

    let mut candidates = vec![start.to_path_buf()];
    if let Ok(mut entries) = tokio::fs::read_dir(start).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(file_type) = entry.file_type().await {
                if file_type.is_dir() {
                    candidates.push(entry.path());
                }
            }
        }
    }
    candidates.sort();
    candidates.dedup();

    let mut matched = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if matches(action, &candidate).await {
            matched.push(candidate);
        }
    }
    matched
}

async fn matches(action: &Action, dir: &Path) -> bool {
    if let Some(marker) = &action.dirs_with {
        if !dir.join(marker).exists() {
            return false;
        }
    }

    if let Some(probe) = &action.test_dir {
        if !probe_succeeds(probe, dir).await {
            return false;
        }
    }

    true
}

async fn probe_succeeds(probe_command: &str, dir: &Path) -> bool {
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(probe_command)
        .current_dir(dir)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    let spawned = match command.spawn() {
        Ok(child) => child,
        Err(_) => return false,
    };

    match timeout(PROBE_TIMEOUT, spawned.wait_with_output()).await {
        Ok(Ok(output)) => output.status.success(),
        _ => false,
    }
}

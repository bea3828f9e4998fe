//! Component E — Fingerprint Cache.
//!
//! Caches "this action already ran cleanly against this directory's current
//! content" so unrelated directories don't pay to re-run an action whose
//! `ifChanged` globs haven't changed since the last successful run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::HanError;

/// Root directory under which cache entries are stored, honoring
/// `HAN_CACHE_DIR` before falling back to the platform cache directory.
pub fn cache_root() -> PathBuf {
    std::env::var_os("HAN_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("han")
                .join("hooks")
        })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    recorded_at: DateTime<Utc>,
}

/// A content fingerprint over the files an action's `ifChanged` globs match
/// within a directory: each matched file's relative path, size, and content
/// digest, combined into a single digest.
pub fn fingerprint(dir: &Path, patterns: &[String]) -> Result<String, HanError> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let full_pattern = dir.join(pattern);
        let pattern_str = full_pattern.to_string_lossy().into_owned();
        match glob::glob(&pattern_str) {
            Ok(matches) => {
                for matched in matches.flatten() {
                    if matched.is_file() {
                        paths.push(matched);
                    }
                }
            }
            Err(err) => {
                return Err(HanError::CacheError {
                    dir: dir.to_path_buf(),
                    reason: format!("invalid ifChanged pattern '{pattern}': {err}"),
                });
            }
        }
    }
    paths.sort();
    paths.dedup();

    let mut hasher = Sha256::new();
    for path in &paths {
        let relative = path.strip_prefix(dir).unwrap_or(path);
        let metadata = std::fs::metadata(path).map_err(|err| HanError::CacheError {
            dir: dir.to_path_buf(),
            reason: format!("could not stat {}: {err}", path.display()),
        })?;
        let contents = std::fs::read(path).map_err(|err| HanError::CacheError {
            dir: dir.to_path_buf(),
            reason: format!("could not read {}: {err}", path.display()),
        })?;

        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(metadata.len().to_le_bytes());
        hasher.update(Sha256::digest(&contents));
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn entry_path(cache_root: &Path, plugin_name: &str, action_name: &str, dir: &Path) -> PathBuf {
    let mut key_hasher = Sha256::new();
    key_hasher.update(plugin_name.as_bytes());
    key_hasher.update([0u8]);
    key_hasher.update(action_name.as_bytes());
    key_hasher.update([0u8]);
    key_hasher.update(dir.to_string_lossy().as_bytes());
    let key = format!("{:x}", key_hasher.finalize());
    cache_root.join(format!("{key}.json"))
}

/// Whether an action should run against `dir`, given the fingerprint of its
/// current `ifChanged` inputs. Returns `true` (run) whenever there is no
/// cache entry, the entry can't be read, or the fingerprint has changed.
pub fn should_run(
    cache_root: &Path,
    plugin_name: &str,
    action_name: &str,
    dir: &Path,
    current_fingerprint: &str,
) -> bool {
    let path = entry_path(cache_root, plugin_name, action_name, dir);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return true;
    };
    let Ok(entry) = serde_json::from_str::<CacheEntry>(&contents) else {
        return true;
    };
    entry.fingerprint != current_fingerprint
}

/// Record a successful run's fingerprint for `dir`, committed atomically via
/// a temp-file-then-rename so a concurrent reader never observes a partial
/// write.
pub fn commit(
    cache_root: &Path,
    plugin_name: &str,
    action_name: &str,
    dir: &Path,
    fingerprint: &str,
) -> Result<(), HanError> {
    std::fs::create_dir_all(cache_root).map_err(|err| HanError::CacheError {
        dir: dir.to_path_buf(),
        reason: format!("could not create cache directory: {err}"),
    })?;

    let entry = CacheEntry {
        fingerprint: fingerprint.to_string(),
        recorded_at: Utc::now(),
    };
    let serialized = serde_json::to_vec_pretty(&entry).map_err(|err| HanError::CacheError {
        dir: dir.to_path_buf(),
        reason: format!("could not serialize cache entry: {err}"),
    })?;

    let final_path = entry_path(cache_root, plugin_name, action_name, dir);
    let tmp_path = final_path.with_extension("json.tmp");
    std::fs::write(&tmp_path, serialized).map_err(|err| HanError::CacheError {
        dir: dir.to_path_buf(),
        reason: format!("could not write temp cache file: {err}"),
    })?;
    std::fs::rename(&tmp_path, &final_path).map_err(|err| HanError::CacheError {
        dir: dir.to_path_buf(),
        reason: format!("could not commit cache file: {err}"),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn fingerprint_changes_when_matched_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "one").unwrap();
        let patterns = vec!["*.txt".to_string()];

        let before = fingerprint(dir.path(), &patterns).unwrap();
        fs::write(dir.path().join("a.txt"), "two").unwrap();
        let after = fingerprint(dir.path(), &patterns).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn should_run_is_true_with_no_cache_entry() {
        let cache = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(should_run(cache.path(), "p", "a", dir.path(), "deadbeef"));
    }

    #[test]
    fn commit_then_should_run_is_false_for_unchanged_fingerprint() {
        let cache = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        commit(cache.path(), "p", "a", dir.path(), "deadbeef").unwrap();
        assert!(!should_run(
            cache.path(),
            "p",
            "a",
            dir.path(),
            "deadbeef"
        ));
        assert!(should_run(
            cache.path(),
            "p",
            "a",
            dir.path(),
            "different"
        ));
    }

    #[test]
    fn commit_is_atomic_and_leaves_no_temp_file() {
        let cache = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        commit(cache.path(), "p", "a", dir.path(), "deadbeef").unwrap();
        let path = entry_path(cache.path(), "p", "a", dir.path());
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}

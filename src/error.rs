//! Error taxonomy for the hook engine.
//!
//! Components that can fail in a way scoped to a single target (spawn,
//! timeout, cache) report it through [`HanError`] but the caller is expected
//! to fold it into that target's `ExecutionOutcome` rather than abort the
//! whole run. Errors that mean the engine found no useful work at all
//! (`PluginNotFound`, an empty resolved action set) propagate up to the
//! dispatcher's exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the hook dispatch and validation engine.
#[derive(Debug, Error)]
pub enum HanError {
    #[error("plugin '{name}' not found (probed marketplaces: {probed:?})")]
    PluginNotFound { name: String, probed: Vec<PathBuf> },

    #[error("marketplace '{0}' is not declared in configuration")]
    UnknownMarketplace(String),

    #[error("manifest error in plugin '{plugin}': {reason}")]
    ManifestError { plugin: String, reason: String },

    #[error("action '{action}' has no enabled plugin")]
    ActionNotFound { action: String },

    #[error("failed to spawn command in {dir}: {source}")]
    SpawnError {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("command in {dir} timed out after {timeout_ms}ms")]
    Timeout { dir: PathBuf, timeout_ms: u64 },

    #[error("cache error for {dir}: {reason}")]
    CacheError { dir: PathBuf, reason: String },

    #[error("configuration error in {path}: {reason}")]
    ConfigError { path: PathBuf, reason: String },

    #[error("invalid action '{action}': {reason}")]
    InvalidAction { action: String, reason: String },

    #[error("legacy 'run' command given after '--' is empty")]
    EmptyLegacyCommand,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type HanResult<T> = Result<T, HanError>;

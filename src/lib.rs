//! Hook dispatch and validation engine for the Han plugin CLI.
//!
//! Resolves which plugins are enabled ([`config`]), finds them on disk and
//! loads their registered actions ([`plugin`]), discovers which directories
//! each action should run against ([`discover`]), runs them with bounded
//! concurrency and fail-fast semantics ([`coordinator`], [`exec`]), and
//! skips re-running actions whose inputs haven't changed since their last
//! clean run ([`cache`]). [`dispatch`] ties the whole pipeline together for
//! a single lifecycle event; [`cli`] exposes it to the `han` binary.

pub mod action;
pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod discover;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod plugin;
pub mod quoting;
pub mod stdin;

pub use action::{Action, LifecycleEvent};
pub use error::{HanError, HanResult};

/// Library version, exposed for the CLI's `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

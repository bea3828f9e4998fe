//! Command-line surface: `han hook dispatch <event>` and `han hook run
//! <name>` (plus the legacy `han hook run --dirs-with <file> -- <command...>`
//! form).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::action::LifecycleEvent;

#[derive(Debug, Parser)]
#[command(name = "han", version, about = "Hook dispatch and validation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: TopLevel,
}

#[derive(Debug, Subcommand)]
pub enum TopLevel {
    /// Hook dispatch and ad-hoc run commands.
    Hook(HookArgs),
}

#[derive(Debug, Args)]
pub struct HookArgs {
    #[command(subcommand)]
    pub command: HookCommand,
}

#[derive(Debug, Subcommand)]
pub enum HookCommand {
    /// Run every action registered for a lifecycle event.
    Dispatch(DispatchArgs),
    /// Run a single named action, or (legacy form) an ad-hoc command across
    /// discovered directories.
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct DispatchArgs {
    /// Lifecycle event name, e.g. `Stop` or `PostToolUse`.
    pub event: EventArg,
    /// Ignore each action's per-event filtering and dispatch every
    /// registered action regardless of which event it's bound to.
    #[arg(long)]
    pub all: bool,
    #[arg(long)]
    pub no_cache: bool,
    #[arg(long)]
    pub no_checkpoints: bool,
}

#[derive(Debug, Clone)]
pub struct EventArg(pub LifecycleEvent);

impl std::str::FromStr for EventArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(EventArg)
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Name of a registered action. Omit when using the legacy
    /// `--dirs-with ... -- <command>` form.
    pub hook_name: Option<String>,

    #[arg(long)]
    pub fail_fast: bool,
    #[arg(long)]
    pub stdin: bool,
    #[arg(long)]
    pub cache: bool,

    /// Legacy form: run an ad-hoc command in every subdirectory containing
    /// this marker file.
    #[arg(long = "dirs-with", value_name = "FILE")]
    pub dirs_with: Option<String>,

    /// Legacy form's command, everything after `--`.
    #[arg(last = true)]
    pub command: Vec<String>,

    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,
}

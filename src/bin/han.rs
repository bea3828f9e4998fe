//! `han` binary entry point: parses the CLI surface, wires up tracing, and
//! maps the engine's result to a process exit code.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use han::cli::{Cli, DispatchArgs, HookCommand, RunArgs, TopLevel};
use han::dispatch::{self, DispatchOptions};
use han::{action, config, coordinator, discover, exec, plugin, quoting};

fn init_tracing() {
    let filter = std::env::var("HAN_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "han=info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => exit_code(code),
        Err(err) => {
            tracing::error!(error = %err, "han failed");
            eprintln!("han: {err}");
            ExitCode::FAILURE
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code.clamp(0, 255) as u8)
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let TopLevel::Hook(hook_args) = cli.command;
    match hook_args.command {
        HookCommand::Dispatch(args) => run_dispatch(args).await,
        HookCommand::Run(args) => run_hook(args).await,
    }
}

async fn run_dispatch(args: DispatchArgs) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir()?;
    let stdin = han::stdin::read_once().await;

    let options = DispatchOptions {
        cache_enabled: !args.no_cache,
        all: args.all,
        checkpoints_enabled: !args.no_checkpoints,
        stdin,
    };

    let result = dispatch::dispatch(args.event.0, &cwd, options).await;
    for (name, run_result) in &result.runs {
        for outcome in &run_result.outcomes {
            print_outcome(name, outcome);
        }
    }
    Ok(result.exit_code)
}

async fn run_hook(args: RunArgs) -> anyhow::Result<i32> {
    if let Some(marker) = &args.dirs_with {
        return run_legacy(marker.clone(), args).await;
    }

    let hook_name = args
        .hook_name
        .ok_or_else(|| anyhow::anyhow!("missing hook name (or use --dirs-with -- <command>)"))?;

    let cwd = args.cwd.clone();
    let config = config::resolve(&config::default_scope_paths());
    let action = find_action(&config, &cwd, &hook_name)?;

    let targets = discover::discover(&action, &cwd).await;
    let stdin = if args.stdin {
        han::stdin::read_once().await
    } else {
        None
    };

    let project_dir = std::env::var_os("CLAUDE_PROJECT_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| cwd.clone());

    let ctx = exec::RunContext {
        event: None,
        checkpoint_id: None,
        project_dir,
        stdin,
    };

    let run_result = coordinator::run(&action, targets, ctx, args.cache).await;
    for outcome in &run_result.outcomes {
        print_outcome(&action.name, outcome);
    }
    Ok(run_result.exit_code)
}

async fn run_legacy(marker: String, args: RunArgs) -> anyhow::Result<i32> {
    let command = quoting::rejoin(&args.command)?;
    let cwd = args.cwd.clone();

    let action = action::Action {
        name: "legacy".to_string(),
        plugin_name: "legacy".to_string(),
        plugin_root: None,
        events: Default::default(),
        command_template: command,
        dirs_with: Some(marker),
        test_dir: None,
        if_changed: Vec::new(),
        fail_fast: args.fail_fast,
        timeout_ms: action::DEFAULT_TIMEOUT_MS,
    };

    let targets = discover::discover(&action, &cwd).await;
    let stdin = if args.stdin {
        han::stdin::read_once().await
    } else {
        None
    };

    let ctx = exec::RunContext {
        event: None,
        checkpoint_id: None,
        project_dir: cwd.clone(),
        stdin,
    };

    let run_result = coordinator::run(&action, targets, ctx, args.cache).await;
    for outcome in &run_result.outcomes {
        print_outcome(&action.name, outcome);
    }
    Ok(run_result.exit_code)
}

fn find_action(
    config: &config::Config,
    cwd: &std::path::Path,
    hook_name: &str,
) -> anyhow::Result<action::Action> {
    for qualified_name in config.enabled_plugin_names() {
        let (plugin_name, marketplace_name) = plugin::split_qualified_name(&qualified_name);
        if let Ok(loaded) = plugin::load(plugin_name, marketplace_name, &config.marketplaces, cwd) {
            if let Some(action) = loaded.actions.into_iter().find(|a| a.name == hook_name) {
                return Ok(action);
            }
        }
    }
    if let Some(action) = config
        .inline_actions
        .iter()
        .find(|a| a.name == hook_name)
        .cloned()
    {
        return Ok(action);
    }
    Err(han::HanError::ActionNotFound {
        action: hook_name.to_string(),
    }
    .into())
}

fn print_outcome(action_name: &str, outcome: &exec::ExecutionOutcome) {
    if outcome.skipped {
        tracing::debug!(action = action_name, dir = %outcome.dir.display(), "skipped (cache hit)");
        return;
    }
    if outcome.cancelled {
        tracing::debug!(action = action_name, dir = %outcome.dir.display(), "cancelled");
        return;
    }
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(&outcome.stdout);
    let mut stderr = std::io::stderr();
    let _ = stderr.write_all(&outcome.stderr);
}

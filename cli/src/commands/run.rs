use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tasker_core::config::AppConfig;
use tasker_core::executor::RunDirectory;
use tasker_core::{
    execute_tasks, CliError, ExecuteFn, ExecuteOpts, ExecutionLock, ExecutionOutcome, PrepareFn,
    PrepareOutcome, Scope, ScopeFlags, Status, StdoutSink, TaskData, TaskError,
};

use super::cli::RunArgs;

/// One shell command and its position on the command line.
#[derive(Debug, Clone)]
pub struct CommandTask {
    pub index: usize,
    pub command: String,
}

pub fn handle_run(args: RunArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let opts = merge_opts(&args, cfg);
    let flags = ScopeFlags::new(args.verbose, args.debug);
    tracing::info!(commands = args.commands.len(), ?opts, "run requested");

    let scope = Scope::create(Arc::new(StdoutSink::new()), "tasker", flags);
    let mut tasks = build_tasks(&args.commands, &args.serial);

    {
        let run_dir = RunDirectory::create(&scope)?;
        execute_tasks(
            &scope,
            &args.desc,
            &mut tasks,
            |task: &CommandTask| {
                let log_path = run_dir.log_path(task.index);
                Ok((log_path.clone(), prepare_command(&task.command, log_path)))
            },
            &opts,
        )?;
    }

    Ok(scope.finish())
}

/// Config defaults overridden by command-line flags.
fn merge_opts(args: &RunArgs, cfg: &AppConfig) -> ExecuteOpts {
    let mut opts = cfg.execution.to_execute_opts();
    if let Some(jobs) = args.jobs {
        opts.max_threads = (jobs > 0).then_some(jobs);
    }
    if args.quiet {
        opts.quiet = true;
    }
    if args.experience.is_some() {
        opts.experience = args.experience;
    }
    opts
}

/// Commands listed in `serial` share one execution lock.
pub fn build_tasks(commands: &[String], serial: &[usize]) -> Vec<TaskData<CommandTask>> {
    let serial_lock = ExecutionLock::default();

    commands
        .iter()
        .enumerate()
        .map(|(index, command)| {
            let task = TaskData::new(
                command.clone(),
                CommandTask {
                    index,
                    command: command.clone(),
                },
            );
            if serial.contains(&index) {
                task.with_lock(Arc::clone(&serial_lock))
            } else {
                task
            }
        })
        .collect()
}

fn prepare_command(command: &str, log_path: PathBuf) -> PrepareFn<'_> {
    Box::new(move |on_status| {
        on_status("Queued...");
        let execute: ExecuteFn<'_> =
            Box::new(move |status| run_command(command, &log_path, status));
        Ok(PrepareOutcome::Simple(execute))
    })
}

/// Run `command` through the platform shell with stdout and stderr captured in `log_path`.
///
/// A non-zero exit is a warning carrying `"exit status N"`; a command killed by a signal is a
/// task failure.
pub fn run_command(
    command: &str,
    log_path: &Path,
    status: &dyn Status,
) -> Result<ExecutionOutcome, TaskError> {
    let log = File::create(log_path)?;

    status.on_progress(None, Some("Running..."));
    let exit = shell(command)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log))
        .status()?;

    status.log(&format!("{command}: {exit}"));
    tracing::debug!(command, %exit, "command finished");

    match exit.code() {
        Some(0) => Ok(ExecutionOutcome::Simple(0)),
        Some(code) => Ok(ExecutionOutcome::Described(
            if code > 0 { code } else { 1 },
            Some(format!("exit status {code}")),
        )),
        None => Err(TaskError::Other(anyhow::anyhow!(
            "'{command}' was terminated by a signal"
        ))),
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

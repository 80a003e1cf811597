use clap::{Args as ClapArgs, Parser, Subcommand};
use tasker_core::ExperienceType;

#[derive(Parser, Debug)]
#[command(name = "tasker", version, about = "Run shell commands in parallel with live progress")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Maximum number of commands running at once (default: available parallelism).
    #[arg(short = 'j', long = "jobs")]
    pub jobs: Option<usize>,

    /// Only print the summary; no per-command error or warning lines.
    #[arg(long)]
    pub quiet: bool,

    #[arg(long)]
    pub verbose: bool,

    /// Full error chains in task logs. Implies --verbose.
    #[arg(long)]
    pub debug: bool,

    /// Display style: simple or progress. Defaults to progress on a terminal.
    #[arg(long)]
    pub experience: Option<ExperienceType>,

    /// Batch description shown in the heading.
    #[arg(long, default_value = "Commands")]
    pub desc: String,

    /// Zero-based index of a command that must not run concurrently with other serial
    /// commands. Can be specified multiple times.
    #[arg(long = "serial", value_name = "IDX", action = clap::ArgAction::Append)]
    pub serial: Vec<usize>,

    /// Shell commands, one task each.
    #[arg(required = true, value_name = "COMMAND")]
    pub commands: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run each COMMAND as a task.
    Run(RunArgs),
    /// Print the effective configuration as TOML.
    Config,
}

use clap::{Args as ClapArgs, Parser, Subcommand};
use protocol::LogLevel;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mcpdeck",
    version,
    about = "Log viewer and SDLC task runner for the MCP dashboard backend"
)]
pub(crate) struct Args {
    #[arg(long, default_value = "config/mcpdeck.toml")]
    pub(crate) config: PathBuf,
    /// Overrides `base_url` from the config file.
    #[arg(long)]
    pub(crate) base_url: Option<String>,
    /// Also log to stderr when `--log-dir` is set. Without a log dir,
    /// stderr is always used.
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
    #[arg(long)]
    pub(crate) log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Read the backend's application logs.
    #[command(subcommand)]
    Logs(LogsCommand),
    /// Submit and track SDLC tasks.
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Subcommand, Debug)]
pub(crate) enum LogsCommand {
    /// Load the newest lines once and print them.
    Show(LogArgs),
    /// Print the newest lines, then keep printing new ones until Ctrl-C.
    Follow(LogArgs),
}

#[derive(ClapArgs, Debug)]
pub(crate) struct LogArgs {
    #[arg(long)]
    pub(crate) file: Option<String>,
    #[arg(long)]
    pub(crate) max_lines: Option<usize>,
    /// Only show these levels; repeat for several. Defaults to all.
    #[arg(long = "level")]
    pub(crate) levels: Vec<LogLevel>,
    #[arg(long)]
    pub(crate) search: Option<String>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum TaskCommand {
    /// Create a task and wait for its result.
    Run {
        #[arg(long)]
        tool: String,
        #[arg(long)]
        task: String,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        cwd: Option<String>,
    },
    /// Print the current status report of a task.
    Status { task_id: String },
    /// Wait for an existing task and print its result.
    Wait { task_id: String },
}

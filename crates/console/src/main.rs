mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mcpdeck_console::config::{load_config, ResolvedConfig};
use mcpdeck_console::http::ConsoleHttp;
use mcpdeck_console::logging::init_tracing;
use mcpdeck_console::logs::render::render_line;
use mcpdeck_console::logs::{HttpLogSource, LogEvent, LogFilter, LogViewer};
use mcpdeck_console::tasks::{HttpTaskClient, TaskApi, TaskPoller};
use protocol::{CreateTaskRequest, TaskStatusReport};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::{Args, Command, LogArgs, LogsCommand, TaskCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_dir.as_deref(), args.log_to_stderr)?;

    let config = load_config(&args.config)?
        .resolve(args.base_url.clone())
        .with_context(|| format!("invalid config {}", args.config.display()))?;
    info!(
        base_url = %config.base_url,
        config = %args.config.display(),
        "mcpdeck starting"
    );
    let http = ConsoleHttp::new(&config.base_url, config.http)
        .with_context(|| format!("invalid base_url {}", config.base_url))?;

    match args.command {
        Command::Logs(LogsCommand::Show(log_args)) => show_logs(http, &config, log_args, false).await,
        Command::Logs(LogsCommand::Follow(log_args)) => show_logs(http, &config, log_args, true).await,
        Command::Task(command) => run_task(http, &config, command).await,
    }
}

async fn show_logs(
    http: ConsoleHttp,
    config: &ResolvedConfig,
    log_args: LogArgs,
    follow: bool,
) -> anyhow::Result<()> {
    let mut options = config.viewer.clone();
    if let Some(file) = log_args.file {
        options.log_file = file;
    }
    if let Some(max_lines) = log_args.max_lines {
        if max_lines == 0 {
            anyhow::bail!("--max-lines must be greater than 0");
        }
        options.max_lines = max_lines;
    }
    let mut filter = if log_args.levels.is_empty() {
        LogFilter::new()
    } else {
        LogFilter::only(log_args.levels)
    };
    if let Some(search) = log_args.search {
        filter.set_query(search);
    }

    let viewer = LogViewer::new(Arc::new(HttpLogSource::new(http)), options);
    viewer
        .load_initial()
        .await
        .with_context(|| format!("failed to load {}", viewer.options().log_file))?;
    for line in viewer.filtered(&filter).await.iter().rev() {
        println!("{}", render_line(line));
    }
    if !follow {
        return Ok(());
    }

    let mut events = viewer.subscribe();
    viewer.start_stream().await.context("failed to follow logs")?;
    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; stopping log stream");
                break Ok(());
            }
            event = events.recv() => match event {
                Ok(LogEvent::Batch { lines }) => {
                    for line in lines.iter().rev().filter(|line| filter.matches(line)) {
                        println!("{}", render_line(line));
                    }
                }
                Ok(LogEvent::StreamEnded) => {
                    info!("log stream closed by server");
                    break Ok(());
                }
                Ok(LogEvent::Error { message }) => {
                    break Err(anyhow::anyhow!("log stream failed: {message}"));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "terminal fell behind the log stream");
                }
                Err(RecvError::Closed) => break Ok(()),
            }
        }
    };
    viewer.stop_stream().await;
    outcome
}

async fn run_task(
    http: ConsoleHttp,
    config: &ResolvedConfig,
    command: TaskCommand,
) -> anyhow::Result<()> {
    let api = Arc::new(HttpTaskClient::new(http));
    let poller = TaskPoller::new(Arc::clone(&api) as Arc<dyn TaskApi>, config.poll);
    let on_progress = |attempt: u32, report: &TaskStatusReport| {
        info!(
            task_id = %report.task_id,
            attempt,
            max_attempts = config.poll.max_attempts,
            "task still in progress"
        );
    };

    let result = match command {
        TaskCommand::Status { task_id } => {
            let report = api.task_status(&task_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        TaskCommand::Wait { task_id } => {
            poller
                .poll_until_complete(&task_id, Some(&on_progress))
                .await?
        }
        TaskCommand::Run {
            tool,
            task,
            context,
            cwd,
        } => {
            let request = CreateTaskRequest {
                tool_type: tool,
                task,
                context,
                working_directory: cwd,
            };
            poller.run(&request, Some(&on_progress)).await?
        }
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

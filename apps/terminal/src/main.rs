use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use checkin_core::{
    HttpCheckinService, OperationOutcome, SessionController, SessionEvent, SessionSnapshot,
};
use checkin_shared::domain::SessionMode;
use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod view;

use config::{load_settings, parse_mode, Settings};
use view::{parse_command, progress_line, render, Command, HELP};

#[derive(Parser, Debug)]
#[command(about = "Employee check-in quiz client")]
struct Args {
    /// Config file; `checkin.toml` in the working directory when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Entry view to start in: quiz or summary.
    #[arg(long, value_parser = parse_mode)]
    mode: Option<SessionMode>,
    /// Identify immediately instead of prompting.
    #[arg(long)]
    employee_id: Option<String>,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.server_url {
            settings.server_url = v.clone();
        }
        if let Some(v) = self.timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = self.mode {
            settings.default_mode = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    args.apply(&mut settings);
    info!(server_url = %settings.server_url, mode = ?settings.default_mode, "checkin: starting");

    let service = HttpCheckinService::new(settings.service_config())
        .context("failed to build check-in service client")?;
    let controller = SessionController::with_mode(Arc::new(service), settings.default_mode);
    tokio::spawn(report_progress(controller.subscribe()));

    if let Some(employee_id) = &args.employee_id {
        controller.identify(employee_id, settings.default_mode).await;
    }
    run(&controller).await
}

async fn run(controller: &SessionController) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&controller.snapshot().await)?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };

        let snapshot = controller.snapshot().await;
        let outcome = match parse_command(&line, &snapshot) {
            Command::Identify(raw) => controller.identify(&raw, snapshot.mode).await,
            Command::SwitchMode(mode) => controller.switch_mode(mode).await,
            Command::Answer(option) => controller.submit_answer(&option).await,
            Command::Next => controller.next_question().await,
            Command::Retry => controller.retry().await,
            Command::Logout => {
                controller.reset().await;
                OperationOutcome::Applied
            }
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                OperationOutcome::Applied
            }
            Command::Nothing => OperationOutcome::Applied,
            Command::Unknown(text) => {
                println!("Unrecognised input '{text}'; type :help");
                OperationOutcome::Applied
            }
        };
        if let OperationOutcome::Rejected(reason) = outcome {
            debug!(?reason, "checkin: input ignored");
        }
    }

    controller.reset().await;
    Ok(())
}

fn prompt(snapshot: &SessionSnapshot) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\n{}> ", render(snapshot))?;
    stdout.flush()?;
    Ok(())
}

async fn report_progress(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Changed(snapshot)) => {
                if let Some(line) = progress_line(&snapshot) {
                    eprintln!("{line}");
                }
            }
            Ok(SessionEvent::StaleCompletionDiscarded { activity }) => {
                debug!(?activity, "checkin: stale completion dropped");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "checkin: progress reporter lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

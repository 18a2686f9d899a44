use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use copilot_dash::client::{self, Command};
use copilot_dash::config::DashConfig;
use copilot_dash::logging;
use copilot_dash::observer::{Frame, ObserverSession, RenderSurface};

#[derive(Parser)]
#[command(
    name = "copilot-observer",
    about = "Headless dashboard observer",
    long_about = "Connects to the simulator, derives the driver mode and logs the adaptive layout.\n\
                  Type driver commands on stdin: `accelerate on`, `brake off`, `reverse on`,\n\
                  `customize`, `done`, `move <widget> <index>`, `layout`."
)]
struct Cli {
    /// Simulator websocket URL
    #[arg(long, default_value = "ws://127.0.0.1:3001")]
    url: String,

    /// TOML config file for mode bands and layout policy
    #[arg(long, env = "COPILOT_CONFIG")]
    config: Option<PathBuf>,
}

/// Logs live values on every frame, and the full layout only when it changed.
struct LogSurface;

impl RenderSurface for LogSurface {
    fn draw(&mut self, frame: &Frame<'_>) {
        debug!(
            tick = frame.snapshot.tick,
            speed = frame.snapshot.speed,
            rpm = frame.snapshot.rpm,
            gear = %frame.snapshot.gear,
            "frame"
        );
        if !frame.layout_changed {
            return;
        }
        info!(
            mode = %frame.mode,
            editing = frame.editing,
            speed = frame.snapshot.speed,
            gear = %frame.snapshot.gear,
            widgets = frame.widgets.len(),
            "layout"
        );
        for w in frame.widgets {
            info!(
                widget = %w.id,
                cols = w.layout.column_span,
                rows = w.layout.row_span,
                draggable = w.draggable,
                "  widget"
            );
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let config = match DashConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let policy = match config.layout_policy() {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "invalid layout policy");
            return ExitCode::FAILURE;
        }
    };

    let (columns, rows) = policy.grid();
    info!(
        primary = %policy.primary(),
        columns,
        rows,
        widgets = policy.default_order().len(),
        "layout policy loaded"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse(&line) {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "ignored command"),
            }
        }
    });

    let mut session = ObserverSession::new(policy, config.modes);
    let mut surface = LogSurface;

    match client::run_observer(&cli.url, &mut session, &mut surface, rx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "observer stopped");
            ExitCode::FAILURE
        }
    }
}

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{error, info};

use copilot_dash::bus::SnapshotBus;
use copilot_dash::config::DashConfig;
use copilot_dash::physics::Simulation;
use copilot_dash::{logging, net, scheduler};

#[derive(Parser)]
#[command(name = "copilot-server", about = "Vehicle telemetry simulator")]
struct Cli {
    /// TOML config file; defaults are used when omitted
    #[arg(long, env = "COPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Override `server.bind`
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let mut config = match DashConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let listener = match net::bind(&config.server.bind).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, "cannot start distribution channel");
            return ExitCode::FAILURE;
        }
    };

    info!("engine ready");

    let bus = SnapshotBus::new(config.server.broadcast_capacity);
    let (controls_tx, controls_rx) = mpsc::unbounded_channel();

    tokio::spawn(net::serve(listener, bus.clone(), controls_tx));

    let sim = Simulation::new(config.vehicle.clone());
    tokio::select! {
        _ = scheduler::run(sim, bus, controls_rx) => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    ExitCode::SUCCESS
}

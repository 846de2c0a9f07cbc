//! CLI for fleetpub
//!
//! Subcommands:
//! - `publish`: run a fleet of simulated vehicles
//! - `subscribe`: print every message published on one topic

use std::process::ExitCode;

use clap::Parser;
use fleetpub::config::{Settings, load_config, load_config_from};
use fleetpub::fleet::{FleetPlan, run_fleet};
use fleetpub::subscriber::{self, SubscriberOptions};
use fleetpub::utils::logging;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "fleetpub")]
enum Command {
    /// Run simulated vehicles until Ctrl-C
    Publish {
        #[arg(long, default_value_t = 1)]
        vans: usize,
        #[arg(long, default_value_t = 0)]
        trucks: usize,
        /// GPS route name, loaded from `<routes.dir>/<route>-clean.csv`
        #[arg(long, default_value = "dublin-limerick")]
        route: String,
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
        /// Configuration file, without extension
        #[arg(long)]
        config: Option<String>,
    },
    /// Subscribe to one topic and print each payload
    Subscribe {
        topic: String,
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long, default_value_t = 1883)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let config_path = match &cmd {
        Command::Publish { config, .. } => config.clone(),
        Command::Subscribe { .. } => None,
    };
    let settings = match config_path {
        Some(path) => load_config_from(&path),
        None => load_config(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init_with(&settings.logging);

    let shutdown = shutdown_signal();

    match cmd {
        Command::Publish {
            vans,
            trucks,
            route,
            cycles,
            ..
        } => {
            let plan = FleetPlan {
                vans,
                trucks,
                route,
                cycles,
            };
            run_publish(plan, &settings, shutdown).await
        }
        Command::Subscribe { topic, host, port } => {
            let mut options = SubscriberOptions::new(topic, host, port);
            options.keep_alive =
                std::time::Duration::from_secs(settings.brokers.keep_alive_secs);
            match subscriber::run(options, shutdown).await {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Subscriber failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn run_publish(plan: FleetPlan, settings: &Settings, shutdown: watch::Receiver<bool>) -> ExitCode {
    match run_fleet(&plan, settings, shutdown).await {
        Ok(reports) => {
            for (vehicle, report) in reports {
                info!(%vehicle, %report, "vehicle finished");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fleet failed to start: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Flips to `true` on Ctrl-C.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Stopping.");
                let _ = tx.send(true);
            }
            Err(e) => {
                error!("Could not listen for Ctrl-C: {}", e);
                // Keep the sender alive so the fleet is not stopped.
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}

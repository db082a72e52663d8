//! Supervisor host for the control plane.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                 SUPERVISOR                   │
//!   control-cli    │  ┌──────────┐   ┌────────┐   ┌───────────┐   │
//!   ───────────────┼─▶│  socket  │──▶│ router │──▶│ endpoints │   │
//!   (Unix socket)  │  │ listener │   │POST only│  └─────┬─────┘   │
//!                  │  └──────────┘   └────────┘        │ publish │
//!                  │       ▲                           ▼         │
//!                  │       │ stop on             ┌───────────┐   │
//!                  │       │ GlobalShutdown      │ event bus │◀──┼── signals
//!                  │  ┌────┴───────┐  subscribe  └─────┬─────┘   │
//!                  │  │ event loop │◀───────────────────┘         │
//!                  │  └────────────┘                              │
//!                  └──────────────────────────────────────────────┘
//! ```
//!
//! Each generation builds a bus and a control server from the config file and
//! attaches the bus to the process-wide signal router.
//! A reload (SIGHUP or `POST /v3/reload`) shuts the generation down and the
//! loop starts the next one from a freshly loaded config.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use control_plane::config::load_config;
use control_plane::control::{BusEndpoints, ControlServer, Environ};
use control_plane::events::{Event, EventBus};
use control_plane::lifecycle::{forward_signals, SignalRouter};
use control_plane::observability::init_logging;

#[derive(Parser)]
#[command(name = "control-plane")]
#[command(about = "Process supervisor with a Unix socket control plane", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "/etc/control-plane.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "control-plane starting"
    );

    // Installed once: signals between generations still count.
    let signals = SignalRouter::new();
    let forwarder = forward_signals(signals.clone())?;
    let mut forced = signals.forced();

    // Survives reloads, like the process environment would.
    let environ = Environ::new();
    let mut generation: u64 = 0;

    loop {
        if signals.stop_requested() {
            tracing::info!("shutdown requested between generations");
            break;
        }

        generation += 1;
        let bus = EventBus::new();
        let span = tracing::info_span!("control", generation);
        signals.attach(bus.clone());

        let server = match ControlServer::new(config.control.as_ref(), span) {
            Ok(server) => server,
            Err(e) => {
                tracing::error!(error = %e, "refusing to run without a control plane");
                return Err(e.into());
            }
        };
        let endpoints = Arc::new(BusEndpoints::with_environ(bus.clone(), environ.clone()));

        let mut stopped = signals.stopped();
        let running = tokio::select! {
            result = server.with_endpoints(endpoints).run(&bus) => match result {
                Ok(running) => running,
                Err(e) => {
                    tracing::error!(error = %e, "refusing to run without a control plane");
                    return Err(e.into());
                }
            },
            _ = stopped.wait() => {
                tracing::info!("shutdown requested while acquiring the control socket");
                break;
            }
        };

        bus.publish(Event::GlobalStartup).await;

        tokio::select! {
            result = running.wait() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "control server stopped uncleanly");
                }
            }
            _ = forced.wait() => {
                tracing::error!("forced shutdown, abandoning the control server");
                return Err("forced shutdown".into());
            }
        }
        signals.detach();

        if !bus.is_reloading() || signals.stop_requested() {
            break;
        }

        tracing::info!(generation, "reloading configuration");
        match load_config(&args.config) {
            Ok(reloaded) => config = reloaded,
            Err(e) => {
                tracing::error!(error = %e, "failed to reload config, keeping current configuration");
            }
        }
    }

    forwarder.abort();
    tracing::info!(injected_env = environ.len(), "shutdown complete");
    Ok(())
}

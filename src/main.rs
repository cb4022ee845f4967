// src/main.rs

//! The `recoveryd` entry point: loads configuration, connects to the local
//! node daemon, and runs the steady-state control loop forever.

use anyhow::Result;
use ctdbrec::client::ControlClient;
use ctdbrec::config::Config;
use ctdbrec::net::PeerConnection;
use ctdbrec::recovery::{run, ControlLoopConfig};
use std::env;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("recoveryd version {VERSION}");
        return Ok(());
    }

    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("recoveryd.toml");

    let mut config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration from \"{config_path}\": {e}");
            std::process::exit(1);
        }
    };

    if let Some(socket_index) = args.iter().position(|arg| arg == "--socket") {
        match args.get(socket_index + 1) {
            Some(socket) => config.socket = socket.clone(),
            None => {
                eprintln!("--socket flag requires a value");
                std::process::exit(1);
            }
        }
    }

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter))
        .compact()
        .with_ansi(true)
        .init();

    info!(socket = %config.socket, local_nid = config.local_nid, "starting recovery controller");

    let conn = PeerConnection::connect_unix(&config.socket, config.local_nid).await?;
    let control = ControlClient::with_deadline(conn, config.rpc_deadline);
    let loop_config = ControlLoopConfig {
        tick_interval: config.tick_interval,
        role: config.role,
    };

    if let Err(e) = run(&control, config.local_nid, &loop_config).await {
        error!("control loop terminated with an error: {e}");
        return Err(e.into());
    }

    Ok(())
}

//! signwatchd - traffic-sign violation server
//!
//! This daemon:
//! 1. Holds the vehicle's current sign (updated via `POST /detected_sign`)
//! 2. Checks car actions (`POST /car_action`) against the rule table
//! 3. Reports violations to the storage backend (bounded timeout, no retry)

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use signwatch::{
    api::{ApiConfig, ApiServer, Controller},
    config::{ConfigOverrides, SignwatchConfig},
    transport::HttpViolationReporter,
    RuleMatcher, SignStateStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Traffic-sign violation server")]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "SIGNWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides config).
    #[arg(long)]
    addr: Option<String>,

    /// Violation backend URL (overrides config).
    #[arg(long)]
    backend_url: Option<String>,

    /// Vehicle identifier reported with each violation (overrides config).
    #[arg(long)]
    vehicle_id: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let overrides = ConfigOverrides {
        api_addr: args.addr,
        backend_url: args.backend_url,
        vehicle_id: args.vehicle_id,
        ..ConfigOverrides::default()
    };
    let config = SignwatchConfig::load_with(args.config.as_deref(), &overrides)?;

    let store = Arc::new(SignStateStore::new());
    let matcher = RuleMatcher::new(config.rules.clone(), config.vehicle_id.clone(), store.clone());
    let reporter = Arc::new(HttpViolationReporter::new(
        config.backend.url.clone(),
        config.backend.timeout,
    ));
    let controller = Arc::new(Controller::new(store, matcher, reporter));

    let api_handle = ApiServer::new(
        ApiConfig {
            addr: config.api_addr.clone(),
        },
        controller,
    )
    .spawn()?;
    log::info!("violation api listening on {}", api_handle.addr);
    log::info!(
        "vehicle_id={}, rules={} signs, backend={} (timeout {:?})",
        config.vehicle_id,
        config.rules.len(),
        config.backend.url,
        config.backend.timeout
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    log::info!("signwatchd waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}

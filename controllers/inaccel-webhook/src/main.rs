//! InAccel Webhook
//!
//! Attaches accelerators to KubeVirt guests from their cloud-init user data:
//! - Mutating admission webhook for VirtualMachineInstance objects
//! - Optional VirtualMachine controller that corrects instance templates
//!
//! A guest asks for accelerators with an `inaccel` block in its cloud-config
//! and receives one `inaccel<index>` host device per requested unit.

mod backoff;
mod config;
mod controller;
mod defaulter;
mod error;
mod reconciler;
mod tls;
mod watcher;
mod webhook;
#[cfg(test)]
mod test_utils;

use anyhow::Context;
use clap::Parser;
use config::Config;
use controller::Controller;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(&config);

    // Both the webhook listener and the kube client use rustls
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    info!("Starting InAccel Webhook");
    info!("Configuration:");
    info!("  Listen address: {}", config.listen_addr());
    info!("  Certificate: {}", config.cert.display());
    info!("  VirtualMachine controller: {}", config.enable_virtualmachine_controller);
    info!(
        "  Namespace: {}",
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );
    info!("  Max devices per guest: {}", config.max_devices);

    let controller = Controller::new(&config)
        .await
        .context("failed to initialize controller")?;
    controller.run().await?;

    Ok(())
}

/// JSON log lines; `RUST_LOG` overrides the level picked by `--debug`.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_directive()));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .init();
}

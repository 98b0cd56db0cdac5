//! Command-line and environment configuration.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// A self-sufficient runtime for accelerators.
#[derive(Debug, Clone, Parser)]
#[command(name = "inaccel-webhook", version, about)]
pub struct Config {
    /// SSL certification file
    #[arg(long, env = "INACCEL_CERT", default_value = "/etc/inaccel/certs/ssl.pem")]
    pub cert: PathBuf,

    /// SSL key file
    #[arg(long, env = "INACCEL_KEY", default_value = "/etc/inaccel/private/ssl.key")]
    pub key: PathBuf,

    /// Address the webhook server binds to
    #[arg(long, env = "INACCEL_BIND_ADDRESS", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_address: IpAddr,

    /// Port the webhook server listens on
    #[arg(long, env = "INACCEL_PORT", default_value_t = 443)]
    pub port: u16,

    /// Enable debug output
    #[arg(short, long, env = "INACCEL_DEBUG")]
    pub debug: bool,

    /// Enables the Virtual Machine controller
    #[arg(long, env = "INACCEL_ENABLE_VIRTUALMACHINE_CONTROLLER")]
    pub enable_virtualmachine_controller: bool,

    /// Only watch VirtualMachines in this namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Upper bound on the accelerators a single guest may declare
    #[arg(long, env = "INACCEL_MAX_DEVICES", default_value_t = 256)]
    pub max_devices: u64,
}

impl Config {
    /// Socket address of the webhook server
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn default_log_directive(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

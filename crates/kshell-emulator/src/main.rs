//! Standalone emulator daemon.
//!
//! Serves the KSHELL protocol on a TCP port so client code can be developed
//! and tested without a physical unit on the bench.

use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kshell_device::{Device, DeviceHandle};
use kshell_emulator::{AdminCredentials, EmulatorServer};

/// Emulated four-outlet power distribution unit.
#[derive(Debug, Parser)]
#[command(name = "kshell-emulator", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    listen: IpAddr,

    /// TCP port to listen on.
    #[arg(short, long, default_value_t = kshell_protocol::DEFAULT_PORT)]
    port: u16,

    /// Administrator user name.
    #[arg(long, default_value = "admin")]
    user: String,

    /// Administrator password.
    #[arg(long, default_value = "admin")]
    password: String,

    /// Report this alias instead of the factory one.
    #[arg(long)]
    alias: Option<String>,

    /// Increase log verbosity (-v shows the wire traffic).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut device = Device::default();
    if let Some(alias) = args.alias {
        device.set_alias(alias);
    }

    let credentials = AdminCredentials {
        user: args.user,
        password: args.password,
    };

    let addr = SocketAddr::new(args.listen, args.port);
    let server = EmulatorServer::bind(addr, DeviceHandle::new(device), credentials)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    server.run().await.context("emulator stopped unexpectedly")
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

//! Command line front end for KSHELL power distribution units.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kshell_client::{shell, CredentialStore, DeviceClient, StoredConnection};
use kshell_protocol::{PortNumber, DEFAULT_PORT};

#[derive(Debug, Parser)]
#[command(name = "kshell", version, about = "Control networked power distribution units")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionOpts,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Args)]
struct ConnectionOpts {
    /// Device host name or address.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Device TCP port.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Account name.
    #[arg(long, global = true)]
    user: Option<String>,

    /// Account password.
    #[arg(long, global = true)]
    password: Option<String>,

    /// Send the password in the clear instead of the salted digest.
    #[arg(long, global = true)]
    plain: bool,

    /// Save these connection details under a label after a successful login.
    #[arg(long, value_name = "LABEL", global = true)]
    save: Option<String>,

    /// Use a saved connection by label.
    #[arg(long = "connection", value_name = "LABEL", global = true)]
    saved: Option<String>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Interactive session: type protocol lines, see raw reply lines.
    Shell,

    /// Show the firmware version.
    Version,

    /// Show or change the device alias.
    Alias {
        /// New alias; omit to read the current one.
        name: Option<String>,
    },

    /// Show or change discovery-protocol visibility.
    Discover {
        /// New setting; omit to read the current one.
        #[arg(value_parser = ["enable", "disable"])]
        setting: Option<String>,
    },

    /// Show or change the outlet switch delay in seconds.
    Swdelay {
        /// New delay; omit to read the current one.
        #[arg(value_parser = clap::value_parser!(u16).range(0..=999))]
        delay: Option<u16>,
    },

    /// Show every outlet's power state.
    List,

    /// Show one outlet's power state.
    Get {
        /// Outlet number, 1 through 4.
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        outlet: u8,
    },

    /// Switch one outlet on or off.
    Set {
        /// Outlet number, 1 through 4.
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        outlet: u8,
        /// Target state.
        #[arg(value_parser = ["on", "off", "1", "0"])]
        state: String,
    },

    /// Show one outlet's configuration.
    Setup {
        /// Outlet number, 1 through 4.
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        outlet: u8,
    },

    /// List saved connections, or delete one.
    Connections {
        /// Delete the saved connection with this label.
        #[arg(long, value_name = "LABEL")]
        remove: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        // The store commands never touch the network.
        CliCommand::Connections { remove } => handle_connections(remove),
        command => run_device_command(command, &cli.connection).await,
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

/// Connection details after flags and the saved-connection store are merged.
struct ConnectionParams {
    host: String,
    port: u16,
    user: String,
    password: String,
}

async fn run_device_command(command: CliCommand, opts: &ConnectionOpts) -> anyhow::Result<()> {
    let (params, from_store) = resolve_connection(opts)?;

    let mut client = DeviceClient::connect(&params.host, params.port)
        .await
        .with_context(|| format!("cannot reach {}:{}", params.host, params.port))?;

    let auth = if opts.plain {
        client.login(&params.user, &params.password).await
    } else {
        client.clogin(&params.user, &params.password).await
    };
    auth.context("login rejected")?;

    // Remember the connection once it has proven itself.
    if let Some(label) = &opts.save {
        let store = CredentialStore::open_default()?;
        store.update(&StoredConnection {
            label: label.clone(),
            host: params.host.clone(),
            port: params.port,
            user: params.user.clone(),
            password: params.password.clone(),
            last_used: Utc::now(),
        })?;
    } else if let Some(saved) = from_store {
        CredentialStore::open_default()?.update(&saved)?;
    }

    if let CliCommand::Shell = command {
        return Ok(shell::run(client).await?);
    }

    dispatch(command, &mut client).await?;
    client.quit().await?;
    Ok(())
}

async fn dispatch(command: CliCommand, client: &mut DeviceClient) -> anyhow::Result<()> {
    match command {
        CliCommand::Version => println!("{}", client.version().await?),

        CliCommand::Alias { name: None } => println!("{}", client.alias().await?),
        CliCommand::Alias { name: Some(name) } => client.set_alias(&name).await?,

        CliCommand::Discover { setting: None } => {
            let enabled = client.discover().await?;
            println!("{}", if enabled { "enable" } else { "disable" });
        }
        CliCommand::Discover {
            setting: Some(setting),
        } => client.set_discover(setting == "enable").await?,

        CliCommand::Swdelay { delay: None } => println!("{}", client.swdelay().await?),
        CliCommand::Swdelay { delay: Some(delay) } => client.set_swdelay(delay).await?,

        CliCommand::List => {
            let states = client.outlet_states().await?;
            for (port, on) in PortNumber::all().into_iter().zip(states) {
                println!("{port} {}", if on { "on" } else { "off" });
            }
        }
        CliCommand::Get { outlet } => {
            let on = client.outlet_state(outlet_number(outlet)?).await?;
            println!("{}", if on { "on" } else { "off" });
        }
        CliCommand::Set { outlet, state } => {
            let on = matches!(state.as_str(), "on" | "1");
            client.set_outlet(outlet_number(outlet)?, on).await?;
        }
        CliCommand::Setup { outlet } => {
            let info = client.outlet_setup(outlet_number(outlet)?).await?;
            println!("name: {}", info.name);
            println!("mode: {}", if info.timer_mode { "timer" } else { "manual" });
            println!("interrupt delay: {}s", info.interrupt_delay);
            println!(
                "power-on state: {}",
                if info.power_on_state { "on" } else { "off" }
            );
        }

        // Both are dispatched before a connection is made.
        CliCommand::Shell | CliCommand::Connections { .. } => {}
    }
    Ok(())
}

fn outlet_number(outlet: u8) -> anyhow::Result<PortNumber> {
    PortNumber::new(outlet).context("outlet number out of range")
}

fn resolve_connection(
    opts: &ConnectionOpts,
) -> anyhow::Result<(ConnectionParams, Option<StoredConnection>)> {
    let saved = lookup_saved(opts)?;

    let host = opts
        .host
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.host.clone()))
        .context("no device host given (use --host or --connection)")?;
    let port = opts
        .port
        .or_else(|| saved.as_ref().map(|s| s.port))
        .unwrap_or(DEFAULT_PORT);
    let user = opts
        .user
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.user.clone()))
        .unwrap_or_else(|| "admin".to_string());
    let password = opts
        .password
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.password.clone()))
        .unwrap_or_else(|| "admin".to_string());

    Ok((
        ConnectionParams {
            host,
            port,
            user,
            password,
        },
        saved,
    ))
}

fn lookup_saved(opts: &ConnectionOpts) -> anyhow::Result<Option<StoredConnection>> {
    if let Some(label) = &opts.saved {
        let store = CredentialStore::open_default()?;
        let found = store.find_label(label)?;
        return Ok(Some(found.with_context(|| {
            format!("no saved connection labeled {label:?}")
        })?));
    }

    // Without a label, stored credentials for the target host still fill in
    // whatever the flags leave out.
    if let Some(host) = &opts.host {
        if opts.user.is_none() || opts.password.is_none() {
            let store = match CredentialStore::open_default() {
                Ok(store) => store,
                Err(_) => return Ok(None),
            };
            let port = opts.port.unwrap_or(DEFAULT_PORT);
            return Ok(store.find(host, port)?);
        }
    }

    Ok(None)
}

fn handle_connections(remove: Option<String>) -> anyhow::Result<()> {
    let store = CredentialStore::open_default()?;

    if let Some(label) = remove {
        if store.remove(&label)? == 0 {
            bail!("no saved connection labeled {label:?}");
        }
        return Ok(());
    }

    let connections = store.load()?;
    if connections.is_empty() {
        println!("no saved connections");
        return Ok(());
    }
    for connection in connections {
        println!(
            "{:<12} {}:{} as {} (last used {})",
            connection.label,
            connection.host,
            connection.port,
            connection.user,
            connection.last_used.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

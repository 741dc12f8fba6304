//! dyguards binary.
//!
//! # Usage
//!
//! ```bash
//! # NetworkManager dispatcher script
//! dyguards nm wlan0 up
//!
//! # Wicd pre-connect script
//! dyguards -f /etc/dyguards/dyguards.toml wicd wireless home aa:bb:cc:dd:ee:ff
//! ```

use std::{env, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use dyguards::{Role, enter};
use dyguards_core::{
    Config, DeviceLists, Iwconfig, RotationOutcome, Rotator,
    config::DEFAULT_CONFIG_PATH,
    manager::{NetworkManager, NmDispatcher, WicdPreConnect},
    read_pid_file,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Rotate Tor's state file per network attachment
#[derive(Parser, Debug)]
#[command(name = "dyguards")]
#[command(about = "Keep Tor guard state specific to the network access point")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short = 'f', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    hook: Hook,
}

/// Which network manager is calling.
#[derive(Subcommand, Debug)]
enum Hook {
    /// Called by NetworkManager-dispatcher after an interface changes state
    Nm {
        /// Interface name
        interface: String,
        /// Dispatcher action (up, down, ...)
        status: String,
    },
    /// Called by Wicd before connecting
    Wicd {
        /// Connection type (wireless, wired)
        connection_type: String,
        /// Network name
        essid: String,
        /// Access point address
        bssid: String,
    },
}

impl Hook {
    fn adapter(&self) -> Box<dyn NetworkManager> {
        match self {
            Self::Nm { interface, status } => {
                let uuid = env::var("CONNECTION_UUID").ok();
                Box::new(NmDispatcher::new(interface, status, Iwconfig::from_env(), uuid.as_deref()))
            },
            Self::Wicd { connection_type, essid, bssid } => {
                Box::new(WicdPreConnect::new(connection_type, essid, bssid))
            },
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "cannot load configuration");
            return ExitCode::FAILURE;
        },
    };

    let mut privileges = match enter(config.privsep_user()) {
        Ok(Role::Worker(privileges)) => privileges,
        Ok(Role::Supervisor { exit_code }) => {
            return ExitCode::from(u8::try_from(exit_code).unwrap_or(1));
        },
        Err(err) => {
            error!(%err, "privilege separation failed");
            return ExitCode::FAILURE;
        },
    };
    info!(separated = privileges.is_separated(), "starting rotation");

    let layout = config.layout();
    let pid_file = config.tor.pid_file.as_deref().and_then(|path| path.to_str());
    let process = read_pid_file(&mut privileges, pid_file);
    let mut manager = args.hook.adapter();

    let outcome = Rotator::new(&mut privileges, &layout, &config.commands)
        .with_process(process)
        .run(manager.as_mut(), DeviceLists::from_proc);

    match outcome {
        Ok(RotationOutcome::Skipped(reason)) => {
            info!(?reason, "nothing rotated");
            ExitCode::SUCCESS
        },
        Ok(RotationOutcome::Rotated { case, identity }) => {
            info!(case = case.number(), %identity, "rotation complete");
            ExitCode::SUCCESS
        },
        Err(err) => {
            error!(%err, "rotation failed");
            ExitCode::FAILURE
        },
    }
}

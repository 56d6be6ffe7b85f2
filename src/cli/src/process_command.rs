use std::fs::File;

use anyhow::{Context, Result};
use clap::Parser;
use daemonize::{Daemonize, Outcome};
use nshide_common::constants::{PID_FILE, STDERR_FILE, STDOUT_FILE, WORKING_DIR};
use nshide_common::logging::{setup_console_logging, setup_logging};
use nshide_common::{Config, ConfigLoader};
use nshide_daemon::{create_and_run_server, DaemonClient, DaemonServer};

use crate::commands::{Cli, Command};
use crate::process_daemon_command::{process_daemon_command, wait_for_daemon};

pub fn start_daemon() -> Result<Outcome<()>> {
    std::fs::create_dir_all(WORKING_DIR)
        .with_context(|| format!("Failed to create {}", WORKING_DIR))?;

    let daemon = Daemonize::new()
        .pid_file(PID_FILE)
        .working_directory(WORKING_DIR)
        .stdout(File::create(STDOUT_FILE).context("Failed to create stdout file")?)
        .stderr(File::create(STDERR_FILE).context("Failed to create stderr file")?)
        .umask(0o027);

    Ok(daemon.execute())
}

/// Process the command line.
/// Note: this has to be sync due to daemonizing
pub fn process_cli() -> Result<()> {
    let cli = Cli::parse();

    // Use the --config flag, if provided, when loading the configuration
    let config = ConfigLoader::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Daemon { no_daemonize } => run_daemon(config, no_daemonize),
        Command::Cleanup => {
            DaemonServer::cleanup()?;
            println!("Daemon files cleaned up successfully.");
            Ok(())
        }
        command => {
            let api_client = DaemonClient::new(config.server_url())?;
            process_daemon_command(command, &api_client)
        }
    }
}

fn run_daemon(config: Config, no_daemonize: bool) -> Result<()> {
    if no_daemonize {
        setup_console_logging(&config.log_level);
        return tokio::runtime::Runtime::new()?.block_on(create_and_run_server(config));
    }

    println!("Starting daemon...");
    match start_daemon()? {
        Outcome::Parent(Ok(_)) => {
            let api_client = DaemonClient::new(config.server_url())?;
            tokio::runtime::Runtime::new()?.block_on(wait_for_daemon(&api_client))?;
            println!("Daemon started successfully.");
            Ok(())
        }
        Outcome::Parent(Err(e)) => {
            println!("Failed to start daemon. Maybe the daemon is already running? If it's not, run `nshide cleanup` to clean up the previous daemon files.");
            println!("{}", e);
            Ok(())
        }
        Outcome::Child(Err(e)) => anyhow::bail!(e),
        Outcome::Child(Ok(_)) => {
            setup_logging(&config.log_dir, &config.log_level)?;
            let result = tokio::runtime::Runtime::new()?.block_on(create_and_run_server(config));
            DaemonServer::cleanup()?;
            result
        }
    }
}

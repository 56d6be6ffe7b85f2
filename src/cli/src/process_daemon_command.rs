use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use nshide_common::{AddOutcome, RemoveOutcome};
use nshide_daemon::client::{DaemonClient, Result as DaemonResult};
use nshide_daemon::EnableOutcome;
use reqwest::StatusCode;
use tokio::runtime::Runtime;

use crate::commands::Command;
use crate::handlers::info;

const MAX_ATTEMPTS: usize = 3;

pub fn process_daemon_command(command: Command, api_client: &DaemonClient) -> Result<()> {
    let runtime = Runtime::new()?;
    let mut attempt = 0;
    let e = loop {
        match runtime.block_on(send_command(&command, api_client)) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_timeout() && attempt < MAX_ATTEMPTS => {
                tracing::debug!("timeout talking to the daemon, retrying");
                attempt += 1;
            }
            Err(e) => break e,
        }
    };

    if e.is_connect() {
        println!("Could not connect to the daemon. Please run `nshide daemon` to start it.");
    } else if e.status() == Some(StatusCode::CONFLICT) {
        println!("Hiding is disabled. Run `nshide enable` first.");
    } else if e.status() == Some(StatusCode::BAD_REQUEST) {
        println!("Process names must be non-empty, without leading or trailing spaces.");
    } else {
        println!("Failed to send command to the daemon: {}", e);
    }
    Err(anyhow::anyhow!(e))
}

async fn send_command(command: &Command, api_client: &DaemonClient) -> DaemonResult<()> {
    match command {
        Command::Enable => match api_client.send_enable_request().await? {
            EnableOutcome::Enabled { entries } => {
                println!("{} ({} watched name(s))", "Hiding enabled".green(), entries)
            }
            EnableOutcome::AlreadyEnabled => println!("Hiding is already enabled"),
        },
        Command::Disable => match api_client.send_disable_request().await?.stopped {
            Some(_) => println!("{}", "Hiding disabled".yellow()),
            None => println!("Hiding was not enabled"),
        },
        Command::Add { name } => match api_client.send_add_request(name).await? {
            AddOutcome::Added => println!("Added {}", name.bold()),
            AddOutcome::AlreadyPresent => println!("{} is already watched", name.bold()),
        },
        Command::Rm { name } => match api_client.send_remove_request(name).await? {
            RemoveOutcome::Removed => println!("Removed {}", name.bold()),
            RemoveOutcome::NotPresent => println!("{} was not watched", name.bold()),
        },
        Command::Ls => {
            for name in api_client.send_list_request().await?.names {
                println!("{}", name);
            }
        }
        Command::Info { json } => info(api_client, *json).await,
        Command::Terminate => {
            api_client.send_terminate_request().await?;
            println!("Daemon terminating");
        }
        Command::Daemon { .. } | Command::Cleanup => {}
    }
    Ok(())
}

/// Polls `/info` until the freshly started daemon answers.
pub async fn wait_for_daemon(api_client: &DaemonClient) -> Result<()> {
    const ATTEMPTS: usize = 25;
    for _ in 0..ATTEMPTS {
        if api_client.send_info_request().await.is_ok() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    anyhow::bail!("Daemon did not answer after startup")
}

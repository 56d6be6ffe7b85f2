use clap::{Parser, Subcommand};
use nshide_common::constants::{LOG_FILE_NAME, STDERR_FILE, STDOUT_FILE, WORKING_DIR};

fn footer_message() -> String {
    format!(
        "Working Directory: {}\nDaemon stdout: {}\nDaemon stderr: {}\nDaemon log: {}{}\n",
        WORKING_DIR, STDOUT_FILE, STDERR_FILE, WORKING_DIR, LOG_FILE_NAME
    )
}

#[derive(Parser, Clone, Debug)]
#[clap(
    name = "nshide",
    about = "Hides mount namespace changes from selected apps as they start",
    version,
    after_help = footer_message()
)]
pub struct Cli {
    #[clap(long, global = true)]
    pub config: Option<String>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the daemon
    Daemon {
        /// Stay in the foreground and log to the console
        #[clap(long)]
        no_daemonize: bool,
    },

    /// Start intercepting watched apps
    Enable,

    /// Stop intercepting and release every paused app
    Disable,

    /// Add a process name to the watch list
    Add { name: String },

    /// Remove a process name from the watch list
    #[clap(alias = "remove")]
    Rm { name: String },

    /// Print the watch list
    #[clap(alias = "list")]
    Ls,

    /// Shows the daemon status
    Info {
        /// Output information in JSON format
        #[clap(long)]
        json: bool,
    },

    /// Stop the daemon
    Terminate,

    /// Remove the files left behind by a daemon that did not exit cleanly
    Cleanup,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::daemon(&["nshide", "daemon"], Command::Daemon { no_daemonize: false })]
    #[case::foreground(&["nshide", "daemon", "--no-daemonize"], Command::Daemon { no_daemonize: true })]
    #[case::enable(&["nshide", "enable"], Command::Enable)]
    #[case::add(&["nshide", "add", "com.example.app"], Command::Add { name: "com.example.app".into() })]
    #[case::rm(&["nshide", "rm", "com.example.app"], Command::Rm { name: "com.example.app".into() })]
    #[case::remove_alias(&["nshide", "remove", "com.example.app"], Command::Rm { name: "com.example.app".into() })]
    #[case::ls(&["nshide", "ls"], Command::Ls)]
    #[case::info_json(&["nshide", "info", "--json"], Command::Info { json: true })]
    #[case::terminate(&["nshide", "terminate"], Command::Terminate)]
    fn test_parse(#[case] args: &[&str], #[case] expected: Command) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.command, expected);
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["nshide", "ls", "--config", "/tmp/nshide.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/nshide.toml"));
    }

    #[test]
    fn test_add_requires_name() {
        assert!(Cli::try_parse_from(["nshide", "add"]).is_err());
    }
}

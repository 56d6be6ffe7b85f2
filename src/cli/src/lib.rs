pub mod commands;
pub mod handlers;
pub mod process_command;
pub mod process_daemon_command;

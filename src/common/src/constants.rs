pub const WORKING_DIR: &str = "/data/adb/nshide/";
pub const PID_FILE: &str = "/data/adb/nshide/nshided.pid";
pub const STDOUT_FILE: &str = "/data/adb/nshide/nshided.out";
pub const STDERR_FILE: &str = "/data/adb/nshide/nshided.err";
pub const LOG_FILE_NAME: &str = "daemon.log";
pub const DEFAULT_CONFIG_FILE: &str = "/data/adb/nshide/nshide.toml";
pub const DEFAULT_WATCH_LIST_FILE: &str = "/data/adb/nshide/hidelist";

pub const DEFAULT_DAEMON_PORT: u16 = 8733;

pub const SPAWNER_PROCESS_NAME: &str = "zygote";
pub const MAX_SPAWNER_INSTANCES: usize = 2;
pub const SPAWNER_POLL_INTERVAL_MS: u64 = 2000;
pub const SPAWNER_BACKOFF_US: u64 = 500;
pub const DIVERGENCE_BACKOFF_US: u64 = 50;
pub const DIVERGENCE_TIMEOUT_MS: u64 = 3000;
pub const HANDOFF_TIMEOUT_MS: u64 = 10_000;

/// A link target longer than this is truncated, mirroring a bounded readlink.
pub const NAMESPACE_ID_MAX_LEN: usize = 32;

pub const INIT_PID: i32 = 1;

/// Handoff request asking the hide daemon to exit.
pub const HANDOFF_TERMINATE: i32 = -1;
pub const HANDOFF_OK: i32 = 0;
pub const HANDOFF_DAEMON_EXITING: i32 = 1;

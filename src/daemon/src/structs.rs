use nshide_monitor::ExitReason;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ListResponse {
    pub names: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DisableResponse {
    pub stopped: Option<ExitReason>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InfoResponse {
    pub enabled: bool,
    pub spawner_count: usize,
    pub watched: usize,
    pub watch_list_file: String,
    /// How the previous monitor run ended.
    pub last_exit: Option<ExitReason>,
}

impl InfoResponse {
    pub fn status_line(&self) -> String {
        if self.enabled {
            format!(
                "enabled, {} spawner namespace(s), {} watched name(s)",
                self.spawner_count, self.watched
            )
        } else {
            "disabled".to_string()
        }
    }

    pub fn last_exit_line(&self) -> Option<String> {
        self.last_exit.as_ref().map(|reason| match reason {
            ExitReason::Cancelled => "stopped on request".to_string(),
            ExitReason::EventSourceClosed => "event source closed".to_string(),
            ExitReason::HideDaemonTerminated => "hide daemon exited".to_string(),
            ExitReason::Fatal(msg) => format!("failed: {}", msg),
        })
    }
}

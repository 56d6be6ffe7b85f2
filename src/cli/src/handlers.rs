use colored::Colorize;
use nshide_daemon::client::DaemonClient;
use nshide_daemon::structs::InfoResponse;

pub async fn info(api_client: &DaemonClient, json: bool) {
    match api_client.send_info_request().await {
        Ok(response) => InfoDisplay::new(json).print(&response),
        Err(_) => InfoDisplay::new(json).print_daemon_error(),
    }
}

pub struct InfoDisplay {
    json: bool,
}

impl InfoDisplay {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn print(&self, response: &InfoResponse) {
        println!("{}", self.render(response));
    }

    pub fn render(&self, response: &InfoResponse) -> String {
        if self.json {
            return serde_json::json!({
                "daemon": "running",
                "enabled": response.enabled,
                "spawner_namespaces": response.spawner_count,
                "watched": response.watched,
                "watch_list_file": &response.watch_list_file,
                "last_exit": &response.last_exit,
            })
            .to_string();
        }

        let status = if response.enabled {
            response.status_line().green()
        } else {
            response.status_line().yellow()
        };
        let mut lines = vec![
            format!("Daemon:      {}", "running".green()),
            format!("Hiding:      {}", status),
            format!("Watch list:  {}", response.watch_list_file),
        ];
        if let Some(last_exit) = response.last_exit_line() {
            lines.push(format!("Last stop:   {}", last_exit));
        }
        lines.join("\n")
    }

    pub fn print_daemon_error(&self) {
        if self.json {
            println!("{}", serde_json::json!({ "daemon": "not running" }));
        } else {
            println!(
                "Daemon:      {}\nRun `nshide daemon` to start it.",
                "not running".red()
            );
        }
    }
}

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nshide_common::namespace::DiscoveryOptions;
use nshide_common::{AddOutcome, RemoveOutcome, RunState, WatchList};
use nshide_daemon::{
    DaemonClient, DaemonServer, EnableOutcome, HideService, MonitorLauncher, ServiceError,
};
use nshide_monitor::testing::ScriptedProcessControl;
use nshide_monitor::{
    launch, ChannelEventSourceLauncher, ExitReason, MonitorHandle, MonitorSettings, NoopHideAction,
};
use tempfile::NamedTempFile;
use tokio::sync::mpsc::UnboundedSender;

const INIT_NS: &str = "mnt:[4026531840]";
const ZYGOTE_NS: &str = "mnt:[4026532001]";
const APP_NS: &str = "mnt:[4026532500]";

type Senders = Arc<Mutex<Vec<UnboundedSender<String>>>>;

/// Launches monitors on a scripted platform whose event lines come from the test.
struct ScriptedLauncher {
    control: Arc<ScriptedProcessControl>,
    senders: Senders,
}

impl MonitorLauncher for ScriptedLauncher {
    fn launch(
        &self,
        watch_list: Arc<WatchList>,
        run_state: Arc<RunState>,
    ) -> io::Result<MonitorHandle> {
        let (tx, events) = ChannelEventSourceLauncher::channel();
        self.senders.lock().unwrap().push(tx);
        launch(
            Arc::clone(&self.control),
            events,
            NoopHideAction,
            watch_list,
            run_state,
            settings(),
        )
    }
}

fn settings() -> MonitorSettings {
    MonitorSettings {
        discovery: DiscoveryOptions {
            spawner_name: "zygote".to_string(),
            max_instances: 2,
            poll_interval: Duration::from_millis(10),
            candidate_backoff: Duration::from_micros(100),
        },
        divergence_backoff: Duration::from_micros(100),
        divergence_timeout: Some(Duration::from_millis(200)),
        handoff_timeout: Duration::from_secs(2),
    }
}

fn watch_list_file(contents: &str) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), contents).unwrap();
    file
}

fn service(file: &NamedTempFile) -> (HideService, Arc<ScriptedProcessControl>, Senders) {
    let control = Arc::new(
        ScriptedProcessControl::new()
            .with_namespaces(1, &[INIT_NS])
            .with_spawner(100, ZYGOTE_NS)
            .with_namespaces(5555, &[ZYGOTE_NS, APP_NS]),
    );
    let senders: Senders = Arc::default();
    let launcher = ScriptedLauncher {
        control: Arc::clone(&control),
        senders: Arc::clone(&senders),
    };
    (
        HideService::new(Box::new(launcher), file.path()),
        control,
        senders,
    )
}

fn last_sender(senders: &Senders) -> UnboundedSender<String> {
    senders.lock().unwrap().last().cloned().unwrap()
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_enable_edit_disable_cycle() {
    let file = watch_list_file("# apps to hide\ncom.example.bank\n\ncom.example.game\n");
    let (service, _, _) = service(&file);

    assert!(matches!(service.add("x").await, Err(ServiceError::NotEnabled)));

    assert_eq!(
        service.enable().await.unwrap(),
        EnableOutcome::Enabled { entries: 2 }
    );
    assert_eq!(
        service.enable().await.unwrap(),
        EnableOutcome::AlreadyEnabled
    );

    assert_eq!(service.add("com.example.app").await.unwrap(), AddOutcome::Added);
    assert_eq!(
        service.add("com.example.app").await.unwrap(),
        AddOutcome::AlreadyPresent
    );
    assert_eq!(
        service.remove("com.example.game").await.unwrap(),
        RemoveOutcome::Removed
    );
    assert_eq!(
        service.list().await.unwrap(),
        vec!["com.example.app", "com.example.bank"]
    );
    assert!(matches!(service.add("  ").await, Err(ServiceError::InvalidName)));

    assert_eq!(service.disable().await, Some(ExitReason::Cancelled));
    assert_eq!(service.disable().await, None);
    assert!(matches!(
        service.list().await,
        Err(ServiceError::NotEnabled)
    ));

    let info = service.info().await;
    assert!(!info.enabled);
    assert_eq!(info.last_exit, Some(ExitReason::Cancelled));
}

#[tokio::test]
async fn test_reenable_starts_from_the_file_again() {
    let file = watch_list_file("com.example.bank\n");
    let (service, _, _) = service(&file);

    service.enable().await.unwrap();
    service.add("com.example.extra").await.unwrap();
    service.disable().await;

    service.enable().await.unwrap();
    assert_eq!(service.list().await.unwrap(), vec!["com.example.bank"]);
    service.disable().await;
}

#[tokio::test]
async fn test_monitor_stopping_on_its_own_is_reaped() {
    let file = watch_list_file("");
    let (service, _, senders) = service(&file);

    service.enable().await.unwrap();
    wait_for(|| service.run_state().spawner_count() == 1).await;

    senders.lock().unwrap().clear();
    wait_for(|| !service.run_state().is_enabled()).await;

    assert_eq!(service.reap().await, Some(ExitReason::EventSourceClosed));
    assert!(matches!(
        service.add("com.example.app").await,
        Err(ServiceError::NotEnabled)
    ));
    assert_eq!(
        service.info().await.last_exit,
        Some(ExitReason::EventSourceClosed)
    );

    // a stopped monitor does not block enabling again
    assert!(matches!(
        service.enable().await.unwrap(),
        EnableOutcome::Enabled { .. }
    ));
    service.disable().await;
}

#[tokio::test]
async fn test_http_control_plane() {
    let file = watch_list_file("com.example.bank\n");
    let (service, control, senders) = service(&file);

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let server = DaemonServer::bind(service, addr).await.unwrap();
    let base = format!("http://{}", server.local_addr().unwrap());
    let running = tokio::spawn(server.run(false));

    let client = DaemonClient::new(base).unwrap();

    let err = client.send_add_request("com.example.app").await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::CONFLICT));

    assert_eq!(
        client.send_enable_request().await.unwrap(),
        EnableOutcome::Enabled { entries: 1 }
    );
    assert_eq!(
        client.send_add_request("com.example.app").await.unwrap(),
        AddOutcome::Added
    );
    assert_eq!(
        client.send_remove_request("com.example.none").await.unwrap(),
        RemoveOutcome::NotPresent
    );
    assert_eq!(
        client.send_list_request().await.unwrap().names,
        vec!["com.example.app", "com.example.bank"]
    );

    let err = client.send_add_request("").await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::BAD_REQUEST));

    // a watched launch is paused and handed off
    for _ in 0..200 {
        if client.send_info_request().await.unwrap().spawner_count == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    last_sender(&senders)
        .send("[0 5555 10123 com.example.app]".to_string())
        .unwrap();
    wait_for(|| control.resumed() == vec![5555]).await;
    assert_eq!(control.paused(), vec![5555]);

    let info = client.send_info_request().await.unwrap();
    assert!(info.enabled);
    assert_eq!(info.watched, 2);

    let disabled = client.send_disable_request().await.unwrap();
    assert_eq!(disabled.stopped, Some(ExitReason::Cancelled));
    assert!(!client.send_info_request().await.unwrap().enabled);

    client.send_terminate_request().await.unwrap();
    running.await.unwrap().unwrap();
}

//! Mount namespace identities of init, the spawner ("zygote") processes and their children.
//!
//! A spawner starts inside init's namespace and only later unshares into its own, and every
//! app it forks begins life in the spawner's namespace before unsharing again. Comparing the
//! link targets of `/proc/<pid>/ns/mnt` is therefore enough to tell how far a process is
//! through its own startup.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::constants::{INIT_PID, NAMESPACE_ID_MAX_LEN};

#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("failed to read mount namespace of pid {pid}: {source}")]
    Read { pid: i32, source: io::Error },
    #[error("init mount namespace has not been resolved")]
    InitUnknown,
    #[error("pid {pid} did not leave the spawner namespace within {timeout:?}")]
    DivergenceTimeout { pid: i32, timeout: Duration },
    #[error("namespace polling cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct NamespaceIdentity(String);

impl NamespaceIdentity {
    pub fn new(raw: impl Into<String>) -> Self {
        let mut raw = raw.into();
        if raw.len() > NAMESPACE_ID_MAX_LEN {
            let mut end = NAMESPACE_ID_MAX_LEN;
            while !raw.is_char_boundary(end) {
                end -= 1;
            }
            raw.truncate(end);
        }
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait NamespaceReader: Send + Sync {
    fn read_namespace(&self, pid: i32) -> io::Result<NamespaceIdentity>;
}

impl<T: NamespaceReader + ?Sized> NamespaceReader for Arc<T> {
    fn read_namespace(&self, pid: i32) -> io::Result<NamespaceIdentity> {
        (**self).read_namespace(pid)
    }
}

pub trait SpawnerLister: Send + Sync {
    /// Live pids whose process name is `name` or its 64-bit variant `<name>64`.
    fn list_spawners(&self, name: &str) -> Vec<i32>;
}

impl<T: SpawnerLister + ?Sized> SpawnerLister for Arc<T> {
    fn list_spawners(&self, name: &str) -> Vec<i32> {
        (**self).list_spawners(name)
    }
}

/// Reads `/proc/<pid>/ns/mnt`.
#[derive(Clone, Debug, Default)]
pub struct ProcfsNamespaceReader;

impl NamespaceReader for ProcfsNamespaceReader {
    fn read_namespace(&self, pid: i32) -> io::Result<NamespaceIdentity> {
        let target = std::fs::read_link(format!("/proc/{}/ns/mnt", pid))?;
        Ok(NamespaceIdentity::new(target.to_string_lossy()))
    }
}

#[derive(Clone, Debug)]
pub struct DiscoveryOptions {
    pub spawner_name: String,
    pub max_instances: usize,
    pub poll_interval: Duration,
    pub candidate_backoff: Duration,
}

pub async fn sleep_or_cancel(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), NamespaceError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(NamespaceError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

pub struct NamespaceTracker<R> {
    reader: R,
    init: Option<NamespaceIdentity>,
    spawners: Vec<NamespaceIdentity>,
}

impl<R: NamespaceReader> NamespaceTracker<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            init: None,
            spawners: Vec::new(),
        }
    }

    pub fn resolve(&self, pid: i32) -> Result<NamespaceIdentity, NamespaceError> {
        self.reader
            .read_namespace(pid)
            .map_err(|source| NamespaceError::Read { pid, source })
    }

    pub fn discover_init(&mut self) -> Result<NamespaceIdentity, NamespaceError> {
        let ns = self.resolve(INIT_PID)?;
        info!("init ns={}", ns);
        self.init = Some(ns.clone());
        Ok(ns)
    }

    /// Polls until at least one spawner namespace distinct from init's is known, collecting
    /// up to `max_instances` of them. Waits forever unless cancelled.
    pub async fn discover_spawners<L: SpawnerLister + ?Sized>(
        &mut self,
        lister: &L,
        options: &DiscoveryOptions,
        cancel: &CancellationToken,
    ) -> Result<&[NamespaceIdentity], NamespaceError> {
        let init = self.init.clone().ok_or(NamespaceError::InitUnknown)?;

        loop {
            for pid in lister.list_spawners(&options.spawner_name) {
                if self.spawners.len() >= options.max_instances {
                    break;
                }
                match self
                    .await_own_namespace(pid, &init, options.candidate_backoff, cancel)
                    .await
                {
                    Ok(ns) if !self.spawners.contains(&ns) => {
                        debug!("spawner pid={} ns={}", pid, ns);
                        self.spawners.push(ns);
                    }
                    Ok(_) => {}
                    Err(NamespaceError::Cancelled) => return Err(NamespaceError::Cancelled),
                    Err(e) => debug!("skipping spawner candidate: {}", e),
                }
            }

            if !self.spawners.is_empty() {
                return Ok(self.spawners.as_slice());
            }

            sleep_or_cancel(options.poll_interval, cancel).await?;
        }
    }

    /// A freshly forked spawner still reports init's namespace; keep re-reading until it
    /// has unshared.
    async fn await_own_namespace(
        &self,
        pid: i32,
        init: &NamespaceIdentity,
        backoff: Duration,
        cancel: &CancellationToken,
    ) -> Result<NamespaceIdentity, NamespaceError> {
        loop {
            let ns = self.resolve(pid)?;
            if &ns != init {
                return Ok(ns);
            }
            sleep_or_cancel(backoff, cancel).await?;
        }
    }

    /// Polls until `pid` is in a namespace that belongs to no spawner. `timeout` of `None`
    /// waits without bound.
    pub async fn await_divergence(
        &self,
        pid: i32,
        backoff: Duration,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<NamespaceIdentity, NamespaceError> {
        let started = Instant::now();
        loop {
            let ns = self.resolve(pid)?;
            if !self.spawners.contains(&ns) {
                return Ok(ns);
            }
            if let Some(timeout) = timeout {
                if started.elapsed() >= timeout {
                    return Err(NamespaceError::DivergenceTimeout { pid, timeout });
                }
            }
            sleep_or_cancel(backoff, cancel).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replays a scripted sequence of reads per pid; the last value repeats forever.
    #[derive(Default)]
    struct ScriptedReader {
        reads: Mutex<HashMap<i32, VecDeque<&'static str>>>,
        calls: Mutex<Vec<i32>>,
    }

    impl ScriptedReader {
        fn with(script: &[(i32, &[&'static str])]) -> Self {
            let reader = Self::default();
            {
                let mut reads = reader.reads.lock().unwrap();
                for (pid, values) in script {
                    reads.insert(*pid, values.iter().copied().collect());
                }
            }
            reader
        }

        fn calls_for(&self, pid: i32) -> usize {
            self.calls.lock().unwrap().iter().filter(|p| **p == pid).count()
        }
    }

    impl NamespaceReader for ScriptedReader {
        fn read_namespace(&self, pid: i32) -> io::Result<NamespaceIdentity> {
            self.calls.lock().unwrap().push(pid);
            let mut reads = self.reads.lock().unwrap();
            let queue = reads
                .get_mut(&pid)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            let value = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                *queue.front().unwrap()
            };
            Ok(NamespaceIdentity::new(value))
        }
    }

    struct FixedLister(Vec<i32>);

    impl SpawnerLister for FixedLister {
        fn list_spawners(&self, _name: &str) -> Vec<i32> {
            self.0.clone()
        }
    }

    fn options() -> DiscoveryOptions {
        DiscoveryOptions {
            spawner_name: "zygote".into(),
            max_instances: 2,
            poll_interval: Duration::from_millis(1),
            candidate_backoff: Duration::from_micros(10),
        }
    }

    #[test]
    fn test_identity_is_bounded() {
        let ns = NamespaceIdentity::new("mnt:[40265318400000000000000000000000000]");
        assert_eq!(ns.as_str().len(), NAMESPACE_ID_MAX_LEN);
    }

    #[test]
    fn test_discover_init_failure_is_reported() {
        let mut tracker = NamespaceTracker::new(ScriptedReader::default());
        assert!(matches!(
            tracker.discover_init(),
            Err(NamespaceError::Read { pid: 1, .. })
        ));
        assert!(tracker.init.is_none());
    }

    #[tokio::test]
    async fn test_spawner_accepted_only_after_leaving_init_namespace() {
        let reader = Arc::new(ScriptedReader::with(&[
            (1, &["mnt:[init]"]),
            (300, &["mnt:[init]", "mnt:[init]", "mnt:[zygote]"]),
        ]));
        let mut tracker = NamespaceTracker::new(Arc::clone(&reader));
        tracker.discover_init().unwrap();

        let found = tracker
            .discover_spawners(&FixedLister(vec![300]), &options(), &CancellationToken::new())
            .await
            .unwrap()
            .to_vec();

        assert_eq!(found, vec![NamespaceIdentity::new("mnt:[zygote]")]);
        assert_eq!(reader.calls_for(300), 3);
    }

    #[tokio::test]
    async fn test_two_spawners_deduplicated_and_capped() {
        let reader = ScriptedReader::with(&[
            (1, &["mnt:[init]"]),
            (300, &["mnt:[zygote64]"]),
            (301, &["mnt:[zygote64]"]),
            (302, &["mnt:[zygote]"]),
            (303, &["mnt:[other]"]),
        ]);
        let mut tracker = NamespaceTracker::new(reader);
        tracker.discover_init().unwrap();

        let found = tracker
            .discover_spawners(
                &FixedLister(vec![300, 301, 302, 303]),
                &options(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            found,
            &[
                NamespaceIdentity::new("mnt:[zygote64]"),
                NamespaceIdentity::new("mnt:[zygote]")
            ]
        );
    }

    #[tokio::test]
    async fn test_vanished_candidate_is_skipped() {
        let reader = ScriptedReader::with(&[(1, &["mnt:[init]"]), (301, &["mnt:[zygote]"])]);
        let mut tracker = NamespaceTracker::new(reader);
        tracker.discover_init().unwrap();

        let found = tracker
            .discover_spawners(
                &FixedLister(vec![300, 301]),
                &options(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_stops_when_cancelled() {
        let reader = ScriptedReader::with(&[(1, &["mnt:[init]"])]);
        let mut tracker = NamespaceTracker::new(reader);
        tracker.discover_init().unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = tracker
            .discover_spawners(&FixedLister(vec![]), &options(), &cancel)
            .await;

        assert!(matches!(result, Err(NamespaceError::Cancelled)));
    }

    #[tokio::test]
    async fn test_await_divergence() {
        let reader = ScriptedReader::with(&[
            (1, &["mnt:[init]"]),
            (300, &["mnt:[zygote]"]),
            (5555, &["mnt:[zygote]", "mnt:[zygote]", "mnt:[app]"]),
        ]);
        let mut tracker = NamespaceTracker::new(reader);
        tracker.discover_init().unwrap();
        tracker
            .discover_spawners(&FixedLister(vec![300]), &options(), &CancellationToken::new())
            .await
            .unwrap();

        let ns = tracker
            .await_divergence(
                5555,
                Duration::from_micros(10),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(ns, NamespaceIdentity::new("mnt:[app]"));
    }

    #[tokio::test]
    async fn test_await_divergence_times_out() {
        let reader = ScriptedReader::with(&[
            (1, &["mnt:[init]"]),
            (300, &["mnt:[zygote]"]),
            (5555, &["mnt:[zygote]"]),
        ]);
        let mut tracker = NamespaceTracker::new(reader);
        tracker.discover_init().unwrap();
        tracker
            .discover_spawners(&FixedLister(vec![300]), &options(), &CancellationToken::new())
            .await
            .unwrap();

        let result = tracker
            .await_divergence(
                5555,
                Duration::from_micros(10),
                Some(Duration::from_millis(20)),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(
            result,
            Err(NamespaceError::DivergenceTimeout { pid: 5555, .. })
        ));
    }
}

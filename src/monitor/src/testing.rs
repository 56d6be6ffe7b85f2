//! In-memory [`ProcessControl`] for exercising the monitor without real processes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Mutex, PoisonError};

use nix::errno::Errno;
use nshide_common::{NamespaceIdentity, NamespaceReader, SpawnerLister};

use crate::platform::ProcessControl;

/// Each pid answers namespace reads from a script; the last entry repeats forever. Pids
/// without a script read as vanished.
#[derive(Default)]
pub struct ScriptedProcessControl {
    namespaces: Mutex<HashMap<i32, VecDeque<String>>>,
    spawners: Vec<i32>,
    unpausable: HashSet<i32>,
    paused: Mutex<Vec<i32>>,
    resumed: Mutex<Vec<i32>>,
}

impl ScriptedProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespaces(mut self, pid: i32, script: &[&str]) -> Self {
        self.namespaces
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pid, script.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_spawner(mut self, pid: i32, namespace: &str) -> Self {
        self.spawners.push(pid);
        self.with_namespaces(pid, &[namespace])
    }

    /// Pausing `pid` fails as if it had already exited.
    pub fn with_unpausable(mut self, pid: i32) -> Self {
        self.unpausable.insert(pid);
        self
    }

    pub fn paused(&self) -> Vec<i32> {
        self.paused.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn resumed(&self) -> Vec<i32> {
        self.resumed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl NamespaceReader for ScriptedProcessControl {
    fn read_namespace(&self, pid: i32) -> io::Result<NamespaceIdentity> {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        let script = namespaces
            .get_mut(&pid)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next.map(NamespaceIdentity::new)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

impl SpawnerLister for ScriptedProcessControl {
    fn list_spawners(&self, _name: &str) -> Vec<i32> {
        self.spawners.clone()
    }
}

impl ProcessControl for ScriptedProcessControl {
    fn pause(&self, pid: i32) -> nix::Result<()> {
        if self.unpausable.contains(&pid) {
            return Err(Errno::ESRCH);
        }
        self.paused.lock().unwrap_or_else(PoisonError::into_inner).push(pid);
        Ok(())
    }

    fn resume(&self, pid: i32) -> nix::Result<()> {
        self.resumed.lock().unwrap_or_else(PoisonError::into_inner).push(pid);
        Ok(())
    }
}

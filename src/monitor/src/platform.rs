use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use nshide_common::namespace::ProcfsNamespaceReader;
use nshide_common::{NamespaceIdentity, NamespaceReader, SpawnerLister};
use sysinfo::System;

/// Everything the monitor and the hide daemon need from the operating system.
pub trait ProcessControl: NamespaceReader + SpawnerLister {
    /// Freezes `pid` (SIGSTOP).
    fn pause(&self, pid: i32) -> nix::Result<()>;
    /// Lets a frozen `pid` continue (SIGCONT).
    fn resume(&self, pid: i32) -> nix::Result<()>;
}

impl<T: ProcessControl + ?Sized> ProcessControl for Arc<T> {
    fn pause(&self, pid: i32) -> nix::Result<()> {
        (**self).pause(pid)
    }

    fn resume(&self, pid: i32) -> nix::Result<()> {
        (**self).resume(pid)
    }
}

/// procfs for namespaces, the sysinfo process table for spawners, signals through nix.
pub struct LinuxProcessControl {
    namespaces: ProcfsNamespaceReader,
    system: Mutex<System>,
}

impl Default for LinuxProcessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxProcessControl {
    pub fn new() -> Self {
        Self {
            namespaces: ProcfsNamespaceReader,
            system: Mutex::new(System::new()),
        }
    }
}

impl NamespaceReader for LinuxProcessControl {
    fn read_namespace(&self, pid: i32) -> io::Result<NamespaceIdentity> {
        self.namespaces.read_namespace(pid)
    }
}

/// `zygote` matches both `zygote` and `zygote64`, but not `webview_zygote` or app zygotes.
fn is_spawner_name(process_name: &str, spawner: &str) -> bool {
    process_name
        .strip_prefix(spawner)
        .is_some_and(|rest| rest.is_empty() || rest == "64")
}

impl SpawnerLister for LinuxProcessControl {
    fn list_spawners(&self, name: &str) -> Vec<i32> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_processes();

        let mut pids: Vec<i32> = system
            .processes()
            .iter()
            .filter(|(_, process)| is_spawner_name(process.name(), name))
            .map(|(pid, _)| pid.as_u32() as i32)
            .collect();
        pids.sort_unstable();
        pids
    }
}

impl ProcessControl for LinuxProcessControl {
    fn pause(&self, pid: i32) -> nix::Result<()> {
        kill(Pid::from_raw(pid), Signal::SIGSTOP)
    }

    fn resume(&self, pid: i32) -> nix::Result<()> {
        kill(Pid::from_raw(pid), Signal::SIGCONT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("zygote", true)]
    #[case("zygote64", true)]
    #[case("webview_zygote", false)]
    #[case("zygote32", false)]
    #[case("com.example.app", false)]
    fn test_spawner_name_filter(#[case] process_name: &str, #[case] expected: bool) {
        assert_eq!(is_spawner_name(process_name, "zygote"), expected);
    }

    #[test]
    fn test_reads_own_namespace() {
        let control = LinuxProcessControl::new();
        let ns = control.read_namespace(std::process::id() as i32).unwrap();
        assert!(ns.as_str().starts_with("mnt:["));
    }

    #[test]
    fn test_pause_of_missing_process_fails() {
        let control = LinuxProcessControl::new();
        // pid_max never reaches i32::MAX
        assert!(control.pause(i32::MAX).is_err());
    }
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Process-wide lifecycle flag shared by the service, the monitor and the control plane.
#[derive(Debug, Default)]
pub struct RunState {
    enabled: AtomicBool,
    spawner_count: AtomicUsize,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Number of distinct spawner namespaces the running monitor found; 0 while discovering.
    pub fn spawner_count(&self) -> usize {
        self.spawner_count.load(Ordering::SeqCst)
    }

    pub fn set_spawner_count(&self, count: usize) {
        self.spawner_count.store(count, Ordering::SeqCst);
    }
}

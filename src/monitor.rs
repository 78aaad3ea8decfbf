//! Per-probe outcome accounting

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Success/failure counts for one probe module
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProbeStats {
    pub successes: u64,
    pub failures: u64,
}

/// Collects per-probe outcomes across all workers. Shared behind an `Arc`;
/// updates happen off the connection path, once per probe execution.
#[derive(Debug, Default)]
pub struct Monitor {
    stats: Mutex<HashMap<String, ProbeStats>>,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, probe: &str) {
        self.entry(probe, |s| s.successes += 1);
    }

    pub fn record_failure(&self, probe: &str) {
        self.entry(probe, |s| s.failures += 1);
    }

    fn entry(&self, probe: &str, update: impl FnOnce(&mut ProbeStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        update(stats.entry(probe.to_string()).or_default());
    }

    /// Snapshot of all per-probe counts
    pub fn summary(&self) -> HashMap<String, ProbeStats> {
        self.stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_probe() {
        let monitor = Monitor::new();
        monitor.record_success("banner");
        monitor.record_success("banner");
        monitor.record_failure("banner");
        monitor.record_failure("tls");

        let summary = monitor.summary();
        assert_eq!(summary["banner"].successes, 2);
        assert_eq!(summary["banner"].failures, 1);
        assert_eq!(summary["tls"].failures, 1);
    }
}

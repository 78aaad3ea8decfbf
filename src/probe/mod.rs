//! Probe modules and their ordered execution
//!
//! A probe is an opaque protocol check against one open connection. The
//! sequence runs probes strictly in configured order and folds their
//! outcomes into one [`Grab`] per connection-run.

pub mod banner;

pub use banner::BannerProbe;

use crate::config::PipelineConfig;
use crate::connection::TimedConnection;
use crate::monitor::Monitor;
use crate::output::{Grab, ProbeResult};
use crate::target::ScanTarget;
use async_trait::async_trait;
use std::sync::Arc;

/// One protocol probe module
#[async_trait]
pub trait Probe: Send + Sync {
    /// Name keying this probe's entry in the output record
    fn name(&self) -> &str;

    /// Called exactly once per worker before that worker processes any
    /// target; worker-scoped setup goes here. Default is a no-op.
    fn init_per_worker(&self, _worker: usize) {}

    /// Run the check against an open connection
    async fn run(
        &self,
        conn: &mut TimedConnection,
        target: &ScanTarget,
    ) -> crate::Result<serde_json::Value>;
}

/// The configured, ordered list of probes plus the continue-on-error
/// policy for one pipeline. Probe handles are supplied by the constructor;
/// there is no ambient registry.
pub struct ProbeSequence {
    probes: Vec<Arc<dyn Probe>>,
    config: PipelineConfig,
    monitor: Arc<Monitor>,
}

impl ProbeSequence {
    pub fn new(probes: Vec<Arc<dyn Probe>>, config: PipelineConfig, monitor: Arc<Monitor>) -> Self {
        Self {
            probes,
            config,
            monitor,
        }
    }

    /// Give every probe its one-time setup call for this worker
    pub fn init_worker(&self, worker: usize) {
        for probe in &self.probes {
            probe.init_per_worker(worker);
        }
    }

    /// Run the full sequence for one connection-run and build the Grab.
    ///
    /// Each probe gets a fresh deadline-wrapped connection; a dial failure
    /// is recorded as that probe's result error. After any error result the
    /// remaining probes are skipped unless continue-on-error is set, and a
    /// skipped probe has no entry in the record.
    pub async fn execute(&self, target: &ScanTarget) -> Grab {
        let mut data = Vec::with_capacity(self.probes.len());

        for probe in &self.probes {
            let result = match TimedConnection::open(target, &self.config).await {
                Ok(mut conn) => ProbeResult::from(probe.run(&mut conn, target).await),
                Err(e) => ProbeResult::Error(e.to_string()),
            };

            let failed = result.is_error();
            if failed {
                self.monitor.record_failure(probe.name());
            } else {
                self.monitor.record_success(probe.name());
            }

            data.push((probe.name().to_string(), result));

            if failed && !self.config.continue_on_error {
                break;
            }
        }

        Grab::new(target, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;

    struct StaticProbe {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Probe for StaticProbe {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(
            &self,
            _conn: &mut TimedConnection,
            _target: &ScanTarget,
        ) -> crate::Result<serde_json::Value> {
            if self.fail {
                Err(crate::ScanError::Probe("synthetic failure".to_string()))
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    async fn accepting_listener() -> (tokio::task::JoinHandle<()>, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            loop {
                let _ = listener.accept().await;
            }
        });
        (handle, port)
    }

    fn sequence(probes: Vec<Arc<dyn Probe>>, port: u16, continue_on_error: bool) -> ProbeSequence {
        let config = PipelineConfig::new(port)
            .with_workers(1)
            .with_idle_timeout_secs(2)
            .with_continue_on_error(continue_on_error);
        ProbeSequence::new(probes, config, Arc::new(Monitor::new()))
    }

    fn failing_then_second() -> Vec<Arc<dyn Probe>> {
        vec![
            Arc::new(StaticProbe {
                name: "first",
                fail: true,
            }),
            Arc::new(StaticProbe {
                name: "second",
                fail: false,
            }),
        ]
    }

    #[tokio::test]
    async fn error_stops_sequence_by_default() {
        let (server, port) = accepting_listener().await;
        let seq = sequence(failing_then_second(), port, false);

        let target = ScanTarget::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let grab = seq.execute(&target).await;

        assert_eq!(grab.data.len(), 1);
        assert_eq!(grab.data[0].0, "first");
        assert!(grab.data[0].1.is_error());
        server.abort();
    }

    #[tokio::test]
    async fn continue_on_error_runs_remaining_probes() {
        let (server, port) = accepting_listener().await;
        let seq = sequence(failing_then_second(), port, true);

        let target = ScanTarget::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let grab = seq.execute(&target).await;

        assert_eq!(grab.data.len(), 2);
        assert!(grab.data[0].1.is_error());
        assert_eq!(grab.data[1].0, "second");
        assert!(!grab.data[1].1.is_error());
        server.abort();
    }

    #[tokio::test]
    async fn dial_failure_lands_in_the_active_probes_entry() {
        // Nothing listening on this port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let seq = sequence(failing_then_second(), port, true);
        let target = ScanTarget::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let grab = seq.execute(&target).await;

        // Both probes dial independently, so both carry a dial error
        assert_eq!(grab.data.len(), 2);
        assert!(grab.data.iter().all(|(_, r)| r.is_error()));
    }
}

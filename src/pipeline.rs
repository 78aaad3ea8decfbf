//! Producer / worker-pool / sink pipeline
//!
//! One producer (the calling task) expands input lines into targets and
//! feeds a bounded queue. A fixed pool of workers pulls targets, runs the
//! probe sequence per connection-run and pushes encoded records onto a
//! bounded result queue. A single sink task writes newline-delimited
//! records and flushes on shutdown.
//!
//! Shutdown ordering guarantees zero record loss: the target queue closes
//! when the producer drops its sender, and the result queue closes only
//! once the last worker has exited and dropped its sender clone, so the
//! sink always drains everything the workers produced.

use crate::config::PipelineConfig;
use crate::monitor::Monitor;
use crate::probe::{Probe, ProbeSequence};
use crate::target::{expand_target, ScanTarget};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, Mutex};

/// Counts reported after a completed run
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PipelineSummary {
    /// Targets queued after expansion
    pub targets: u64,
    /// Records written to the sink
    pub records: u64,
    /// Input lines skipped as malformed
    pub skipped_lines: u64,
}

/// The concurrency engine tying expansion, workers and the sink together
pub struct Pipeline {
    sequence: Arc<ProbeSequence>,
    config: PipelineConfig,
    monitor: Arc<Monitor>,
}

impl Pipeline {
    /// Build a pipeline from an explicit, ordered probe list
    pub fn new(probes: Vec<Arc<dyn Probe>>, config: PipelineConfig) -> crate::Result<Self> {
        config.validate()?;
        let monitor = Arc::new(Monitor::new());
        let sequence = Arc::new(ProbeSequence::new(
            probes,
            config.clone(),
            Arc::clone(&monitor),
        ));
        Ok(Self {
            sequence,
            config,
            monitor,
        })
    }

    /// Outcome counters shared with the probe sequence
    pub fn monitor(&self) -> Arc<Monitor> {
        Arc::clone(&self.monitor)
    }

    /// Drive the whole pipeline to completion: read every input line,
    /// scan every expanded target, and return once the sink has flushed
    /// the last record.
    pub async fn run<R, W>(&self, input: R, output: W) -> crate::Result<PipelineSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let capacity = self.config.queue_capacity();
        let (target_tx, target_rx) = mpsc::channel::<ScanTarget>(capacity);
        let (result_tx, mut result_rx) = mpsc::channel::<Vec<u8>>(capacity);
        let target_rx = Arc::new(Mutex::new(target_rx));

        // Single sink: drains encoded records until every worker is gone,
        // then flushes. Write failures are structural, so fail fast.
        let sink = tokio::spawn(async move {
            let mut out = BufWriter::new(output);
            let mut records: u64 = 0;
            while let Some(record) = result_rx.recv().await {
                if let Err(e) = out.write_all(&record).await {
                    log::error!("unable to write result: {}", e);
                    std::process::exit(2);
                }
                if let Err(e) = out.write_all(b"\n").await {
                    log::error!("unable to write record separator: {}", e);
                    std::process::exit(2);
                }
                records += 1;
            }
            if let Err(e) = out.flush().await {
                log::error!("unable to flush output: {}", e);
                std::process::exit(2);
            }
            records
        });

        // Fixed worker pool; each worker's result sender clone keeps the
        // result queue open until that worker exits.
        let mut workers = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let rx = Arc::clone(&target_rx);
            let tx = result_tx.clone();
            let sequence = Arc::clone(&self.sequence);
            let connections = self.config.connections_per_host;

            workers.push(tokio::spawn(async move {
                sequence.init_worker(worker_id);
                loop {
                    // Hold the lock only for the pull, not the scan
                    let target = { rx.lock().await.recv().await };
                    let Some(target) = target else {
                        break;
                    };

                    for _ in 0..connections {
                        let grab = sequence.execute(&target).await;
                        let record = match grab.encode() {
                            Ok(record) => record,
                            Err(e) => {
                                log::error!(
                                    "unable to encode result for {}: {}",
                                    target.label(),
                                    e
                                );
                                std::process::exit(2);
                            }
                        };
                        if tx.send(record).await.is_err() {
                            // Sink is gone; nothing left to report to
                            return;
                        }
                    }
                }
            }));
        }
        drop(result_tx);
        drop(target_rx);

        // Producer runs here. Malformed lines are recoverable; a mid-stream
        // read error ends the loop like EOF.
        let mut summary = PipelineSummary::default();
        let mut lines = input.lines();
        'producer: loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::error!("input read error, stopping producer: {}", e);
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match expand_target(line) {
                Ok(expansion) => {
                    for target in expansion {
                        summary.targets += 1;
                        if target_tx.send(target).await.is_err() {
                            break 'producer;
                        }
                    }
                }
                Err(e) => {
                    log::error!("skipping input line: {}", e);
                    summary.skipped_lines += 1;
                }
            }
        }

        // Close the target queue, wait out the workers, then the sink.
        drop(target_tx);
        for handle in workers {
            if let Err(e) = handle.await {
                log::error!("worker task failed: {}", e);
            }
        }
        summary.records = sink
            .await
            .map_err(|e| crate::ScanError::Output(format!("sink task failed: {}", e)))?;

        Ok(summary)
    }
}

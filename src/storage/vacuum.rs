use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;

use super::chain_table::ChainTable;
use crate::txn::{Timestamp, TxnRegistry};

/// Outcome of one vacuum pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VacuumReport {
    pub watermark: Timestamp,
    pub chains_scanned: usize,
    pub chains_pruned: usize,
    pub versions_removed: usize,
    /// Empty chains dropped from the key table.
    pub chains_removed: usize,
}

/// Prune every chain against the current low watermark.
///
/// Chains are locked one at a time, exclusively, so a reader never sees a
/// partially pruned chain and unrelated keys stay available. The watermark is
/// read once up front: transactions that begin later start above it and
/// cannot need anything pruned here. Chains a conflicting commit created but
/// never filled are dropped afterwards.
pub fn run_vacuum(registry: &TxnRegistry, chains: &ChainTable) -> VacuumReport {
    let watermark = registry.low_watermark();
    let mut report = VacuumReport {
        watermark,
        ..VacuumReport::default()
    };

    for chain in chains.handles() {
        report.chains_scanned += 1;
        let (mut guard, _hold) = chains.write_chain(&chain);
        let removed = guard.prune_shadowed(watermark);
        if removed > 0 {
            report.chains_pruned += 1;
            report.versions_removed += removed;
        }
    }
    report.chains_removed = chains.remove_empty();

    tracing::debug!(
        watermark = report.watermark,
        chains_scanned = report.chains_scanned,
        chains_pruned = report.chains_pruned,
        versions_removed = report.versions_removed,
        chains_removed = report.chains_removed,
        "vacuum pass finished"
    );
    report
}

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Background thread that runs a vacuum task on a fixed interval until dropped.
#[derive(Debug)]
pub struct VacuumWorker {
    signal: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl VacuumWorker {
    /// Start the worker. Returns `None` if the OS refuses to spawn a thread;
    /// vacuum is then only run on demand.
    pub fn spawn<F>(interval: Duration, task: F) -> Option<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let signal = Arc::new(StopSignal::default());
        let thread_signal = signal.clone();
        let spawned = thread::Builder::new()
            .name("snapkv-vacuum".to_string())
            .spawn(move || run_worker(&thread_signal, interval, task));

        match spawned {
            Ok(handle) => {
                tracing::info!(interval_ms = interval.as_millis() as u64, "vacuum worker started");
                Some(Self {
                    signal,
                    handle: Some(handle),
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to start vacuum worker");
                None
            }
        }
    }
}

fn run_worker<F>(signal: &StopSignal, interval: Duration, mut task: F)
where
    F: FnMut(),
{
    let mut stopped = signal.stopped.lock();
    while !*stopped {
        let timed_out = signal.wake.wait_for(&mut stopped, interval).timed_out();
        if *stopped {
            break;
        }
        if timed_out {
            MutexGuard::unlocked(&mut stopped, &mut task);
        }
    }
}

impl Drop for VacuumWorker {
    fn drop(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("vacuum worker panicked");
            } else {
                tracing::info!("vacuum worker stopped");
            }
        }
    }
}

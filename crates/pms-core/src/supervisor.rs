use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::tick::TickEngine;

/// Owns one [`TickEngine`] per configured network, starting each on the
/// same cadence and propagating cancellation (§4.5). `Start` is
/// non-blocking; `Shutdown` cancels every per-network context and returns
/// without waiting for the in-flight ticks to drain.
pub struct NetworkSupervisor {
    poll_interval: Duration,
    handles:       Vec<NetworkHandle>
}

struct NetworkHandle {
    network_name: String,
    cancellation: CancellationToken,
    join:         JoinHandle<()>
}

impl NetworkSupervisor {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval, handles: Vec::new() }
    }

    /// Spawns one ticker task per engine. Ticks of the same network never
    /// overlap: each task awaits the previous `tick()` before scheduling
    /// the next.
    pub fn start(&mut self, engines: Vec<TickEngine>) {
        for engine in engines {
            let cancellation = CancellationToken::new();
            let task_cancellation = cancellation.clone();
            let network_name = engine.network_name().to_string();
            let poll_interval = self.poll_interval;

            let join = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(poll_interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = task_cancellation.cancelled() => break,
                        _ = ticker.tick() => {
                            engine.tick(&task_cancellation).await;
                        }
                    }
                }
            });

            self.handles.push(NetworkHandle { network_name, cancellation, join });
        }
    }

    /// Cancels every per-network context. Does not wait for the spawned
    /// tasks to observe cancellation and return; re-entry after `shutdown`
    /// is undefined, matching §4.5's contract.
    pub fn shutdown(&self) {
        for handle in &self.handles {
            tracing::info!(network = %handle.network_name, "cancelling network ticker");
            handle.cancellation.cancel();
        }
    }

    /// Test/shutdown helper: waits for every ticker task to finish after
    /// cancellation has been requested.
    pub async fn join_all(self) {
        for handle in self.handles {
            let _ = handle.join.await;
        }
    }
}

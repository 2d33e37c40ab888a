//! The metric events emitted by a tick, wrapped behind a handle so the core
//! crates never touch the `metrics` recorder directly. Mirrors the
//! `*MetricsWrapper` newtype pattern used elsewhere in this workspace for
//! per-subsystem metrics handles.

use std::{collections::HashMap, sync::Arc, time::Duration};

use metrics::{counter, gauge};
use pms_types::Connectedness;

/// Whether an observed peer's `PeerID` resolves to a declared member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Knownness {
    Known,
    Unknown
}

impl Knownness {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Known => "known",
            Self::Unknown => "unknown"
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::Known, Self::Unknown]
    }
}

/// A metrics handle scoped to one network. Cheap to clone; emits directly to
/// the globally installed `metrics` recorder.
#[derive(Debug, Clone)]
pub struct NetworkMetrics {
    network: Arc<str>
}

impl NetworkMetrics {
    pub fn new(network: impl Into<Arc<str>>) -> Self {
        Self { network: network.into() }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// `rpc_latency` gauge, ms, tagged (network, node, method).
    pub fn record_latency(&self, node: &str, method: &str, latency: Duration) {
        gauge!(
            "rpc_latency",
            "network" => self.network.to_string(),
            "node" => node.to_string(),
            "method" => method.to_string()
        )
        .set(latency.as_secs_f64() * 1000.0);
    }

    /// `errors_total` counter, tagged (network, node, method, error-class).
    pub fn record_error(&self, node: &str, method: &str, error_class: &str) {
        counter!(
            "errors_total",
            "network" => self.network.to_string(),
            "node" => node.to_string(),
            "method" => method.to_string(),
            "error_class" => error_class.to_string()
        )
        .increment(1);
    }

    /// `network_member_count` gauge, tagged (network).
    pub fn set_member_count(&self, count: usize) {
        gauge!("network_member_count", "network" => self.network.to_string()).set(count as f64);
    }

    /// `network_peer_healthness` gauge in [0,1], tagged (network).
    pub fn set_healthness(&self, healthness: f64) {
        gauge!("network_peer_healthness", "network" => self.network.to_string()).set(healthness);
    }

    /// `known_peer_state_latency` gauge ms, emitted only for healthy
    /// directed edges, tagged (network, node, node-peer-id, peer,
    /// peer-peer-id).
    pub fn record_known_peer_latency(
        &self,
        node: &str,
        node_peer_id: &str,
        peer: &str,
        peer_peer_id: &str,
        latency: Duration
    ) {
        gauge!(
            "known_peer_state_latency",
            "network" => self.network.to_string(),
            "node" => node.to_string(),
            "node_peer_id" => node_peer_id.to_string(),
            "peer" => peer.to_string(),
            "peer_peer_id" => peer_peer_id.to_string()
        )
        .set(latency.as_secs_f64() * 1000.0);
    }

    /// `peer_state_connectedness` gauge, tagged (network, node,
    /// node-peer-id, knownness, connectedness). Resets every
    /// (knownness, connectedness) combination to 0 before setting the
    /// observed counts, so stale combinations from a prior tick never
    /// linger.
    pub fn report_connectedness_histogram(
        &self,
        node: &str,
        node_peer_id: &str,
        counts: &HashMap<(Knownness, Connectedness), usize>
    ) {
        for knownness in Knownness::all() {
            for connectedness in Connectedness::all() {
                let count = counts.get(&(knownness, connectedness)).copied().unwrap_or(0);
                gauge!(
                    "peer_state_connectedness",
                    "network" => self.network.to_string(),
                    "node" => node.to_string(),
                    "node_peer_id" => node_peer_id.to_string(),
                    "knownness" => knownness.as_label(),
                    "connectedness" => connectedness.as_label()
                )
                .set(count as f64);
            }
        }
    }

    /// `resolved_state` counter, incremented once per reconciliation
    /// attempt, tagged (network, node, node-peer-id, peer, peer-peer-id).
    pub fn record_resolved_state(&self, node: &str, node_peer_id: &str, peer: &str, peer_peer_id: &str) {
        counter!(
            "resolved_state",
            "network" => self.network.to_string(),
            "node" => node.to_string(),
            "node_peer_id" => node_peer_id.to_string(),
            "peer" => peer.to_string(),
            "peer_peer_id" => peer_peer_id.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    use super::*;

    #[test]
    fn connectedness_histogram_resets_every_combination() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(&recorder, || {
            let metrics = NetworkMetrics::new("mainnet");
            let mut counts = HashMap::new();
            counts.insert((Knownness::Known, Connectedness::Connected), 1usize);
            metrics.report_connectedness_histogram("p1", "QmP1", &counts);
        });

        let snapshot = snapshotter.snapshot().into_vec();
        // 2 knownness values * 4 connectedness values = 8 combinations emitted.
        let gauges: Vec<_> = snapshot
            .iter()
            .filter(|(key, ..)| key.key().name() == "peer_state_connectedness")
            .collect();
        assert_eq!(gauges.len(), 8);

        let connected_known = gauges
            .iter()
            .find(|(key, ..)| {
                key.key()
                    .labels()
                    .any(|l| l.key() == "connectedness" && l.value() == "connected")
                    && key.key().labels().any(|l| l.key() == "knownness" && l.value() == "known")
            })
            .unwrap();
        assert!(matches!(connected_known.3, DebugValue::Gauge(v) if v.into_inner() == 1.0));
    }
}

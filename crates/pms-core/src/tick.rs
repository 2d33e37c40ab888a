use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant}
};

use pms_metrics::NetworkMetrics;
use pms_net::PeerAdapter;
use pms_state::NetworkState;
use pms_types::NetworkConfig;
use tokio_util::sync::CancellationToken;

use crate::{reconcile::Reconciler, report::compute_report};

/// Drives one pass of the control loop for a network (§4.3). Phases run in
/// the order Expire → Poll → Project → Report → Reconcile; every tick of
/// the same network runs to completion before the next is scheduled.
pub struct TickEngine {
    network_name:          String,
    network_config:        NetworkConfig,
    adapters:              HashMap<String, Arc<dyn PeerAdapter>>,
    state:                 Arc<NetworkState>,
    metrics:               NetworkMetrics,
    node_state_expiration: Duration,
    dry_run:               bool
}

impl TickEngine {
    pub fn new(
        network_name: impl Into<String>,
        network_config: NetworkConfig,
        adapters: HashMap<String, Arc<dyn PeerAdapter>>,
        state: Arc<NetworkState>,
        metrics: NetworkMetrics,
        node_state_expiration: Duration,
        dry_run: bool
    ) -> Self {
        Self { network_name: network_name.into(), network_config, adapters, state, metrics, node_state_expiration, dry_run }
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn state(&self) -> &NetworkState {
        &self.state
    }

    /// Runs one tick to completion or to the first point `cancellation`
    /// observes as cancelled.
    pub async fn tick(&self, cancellation: &CancellationToken) {
        self.expire();
        if cancellation.is_cancelled() {
            return;
        }
        self.poll(cancellation).await;
        if cancellation.is_cancelled() {
            return;
        }
        let projections = self.project();
        self.report(&projections);
        if cancellation.is_cancelled() {
            return;
        }
        if !self.dry_run {
            self.reconcile(cancellation).await;
        }
    }

    fn expire(&self) {
        let now = Instant::now();
        for expired in self.state.expire(now, self.node_state_expiration) {
            tracing::warn!(
                network = %self.network_name,
                node = %expired.name,
                last_peer_id = %expired.last_peer_id,
                "node expired: no successful poll within NodeStateExpiration"
            );
        }
    }

    async fn poll(&self, cancellation: &CancellationToken) {
        let polls = self.network_config.members.iter().map(|name| self.poll_one(name, cancellation));
        futures::future::join_all(polls).await;
    }

    async fn poll_one(&self, name: &str, cancellation: &CancellationToken) {
        let Some(adapter) = self.adapters.get(name) else { return };

        let self_info = tokio::select! {
            _ = cancellation.cancelled() => return,
            res = adapter.self_info() => res,
        };
        let self_info = match self_info {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(network = %self.network_name, node = %name, err = %err, "poll self failed, node state left untouched");
                return;
            }
        };

        let peers = tokio::select! {
            _ = cancellation.cancelled() => return,
            res = adapter.peers(false) => res,
        };
        let peers = match peers {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(network = %self.network_name, node = %name, err = %err, "poll peers failed, node state left untouched");
                return;
            }
        };

        self.state.upsert(name, self_info, peers, Instant::now());
    }

    fn project(&self) -> Vec<(String, Vec<String>)> {
        let projections = self.state.project_all();
        for (name, known) in &projections {
            tracing::info!(network = %self.network_name, node = %name, known_peers = ?known, "known-peer projection");
        }
        projections
    }

    fn report(&self, _projections: &[(String, Vec<String>)]) {
        let snapshot = self.state.snapshot();
        let summary = compute_report(&self.network_config.members, &snapshot);

        self.metrics.set_member_count(summary.member_count);
        self.metrics.set_healthness(summary.healthness);

        for node in &summary.nodes {
            self.metrics.report_connectedness_histogram(&node.name, &node.node_peer_id, &node.connectedness_counts);
            for latency in &node.known_peer_latencies {
                self.metrics.record_known_peer_latency(
                    &node.name,
                    &node.node_peer_id,
                    &latency.peer_name,
                    &latency.peer_peer_id,
                    latency.latency
                );
            }
        }
    }

    async fn reconcile(&self, cancellation: &CancellationToken) {
        let reconciler = Reconciler {
            network_name:   &self.network_name,
            network_config: &self.network_config,
            state:          &self.state,
            adapters:       &self.adapters,
            metrics:        &self.metrics
        };
        reconciler.run(cancellation).await;
    }
}

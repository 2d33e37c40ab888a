use std::{collections::HashMap, sync::Arc};

use pms_metrics::NetworkMetrics;
use pms_net::PeerAdapter;
use pms_state::{NetworkState, NodeState};
use pms_types::{Connectedness, NetworkConfig, NodeConfig, PeerId};
use tokio_util::sync::CancellationToken;

use crate::error::ReconcileError;

const PLACEHOLDER_SUFFIX: &str = "/p2p/{peer_id}";
const DNS4_PREFIX: &str = "/dns4/";

/// Per-node planner (§4.4): makes each declared node's observed peer set
/// cover the full declared membership, minus itself, using the minimum
/// necessary P2P RPC actions.
pub struct Reconciler<'a> {
    pub network_name:   &'a str,
    pub network_config: &'a NetworkConfig,
    pub state:          &'a NetworkState,
    pub adapters:       &'a HashMap<String, Arc<dyn PeerAdapter>>,
    pub metrics:        &'a NetworkMetrics
}

impl<'a> Reconciler<'a> {
    pub async fn run(&self, cancellation: &CancellationToken) {
        for n_name in &self.network_config.members {
            if cancellation.is_cancelled() {
                return;
            }
            self.reconcile_node(n_name).await;
        }
    }

    async fn reconcile_node(&self, n_name: &str) {
        let Some(n_state) = self.state.get(n_name) else {
            tracing::warn!(network = self.network_name, node = n_name, "skipping reconcile: no observed NodeState");
            return;
        };

        let expected: Vec<String> =
            self.network_config.members.iter().filter(|m| m.as_str() != n_name).cloned().collect();
        let mut healthy: HashMap<String, bool> = expected.iter().map(|m| (m.clone(), false)).collect();

        for peer_info in n_state.peers.values() {
            let Some(peer_name) = self.state.name_for_peer_id(&peer_info.peer_id) else { continue };
            if let Some(entry) = healthy.get_mut(&peer_name) {
                if peer_info.connectedness == Connectedness::Connected {
                    *entry = true;
                }
            }
        }

        for peer_name in expected {
            if !healthy[&peer_name] {
                self.connect_peer_between(n_name, &peer_name).await;
            }
        }
    }

    /// Executes the ordered fix-up sequence for one missing edge
    /// (n, peer_name). Any failed step logs and aborts the rest of the
    /// sequence for this edge; the next tick retries idempotently.
    async fn connect_peer_between(&self, n_name: &str, peer_name: &str) {
        let (Some(n_config), Some(p_config)) =
            (self.network_config.node(n_name), self.network_config.node(peer_name))
        else {
            return;
        };

        let Some(n_state) = self.state.get(n_name) else {
            tracing::warn!(network = self.network_name, node = n_name, peer = peer_name, "skipping edge: no NodeState for node");
            return;
        };
        let Some(p_state) = self.state.get(peer_name) else {
            tracing::warn!(network = self.network_name, node = n_name, peer = peer_name, "skipping edge: no NodeState for peer");
            return;
        };

        if n_config.prevent_outbound || p_config.prevent_inbound {
            tracing::debug!(network = self.network_name, node = n_name, peer = peer_name, "skipping edge: policy blocked");
            return;
        }

        let n_peer_id = resolve_peer_id(n_config, &n_state);
        let p_peer_id = resolve_peer_id(p_config, &p_state);

        let resolved_address = match resolve_address(n_config, p_config, &p_state, &p_peer_id) {
            Ok(addr) => addr,
            Err(err) => {
                tracing::error!(network = self.network_name, node = n_name, peer = peer_name, err = %err, "skipping edge: address unresolvable");
                return;
            }
        };

        let (Some(n_adapter), Some(p_adapter)) = (self.adapters.get(n_name), self.adapters.get(peer_name)) else {
            return;
        };

        macro_rules! step {
            ($fut:expr, $label:literal) => {
                if let Err(err) = $fut.await {
                    tracing::warn!(
                        network = self.network_name,
                        node = n_name,
                        peer = peer_name,
                        peer_addr = %resolved_address,
                        step = $label,
                        err = %err,
                        "reconcile step failed, aborting this edge"
                    );
                    return;
                }
            };
        }

        step!(n_adapter.unprotect_peer(&p_peer_id), "unprotect_n");
        step!(p_adapter.unprotect_peer(&n_peer_id), "unprotect_p");
        step!(n_adapter.unblock_peer(&p_peer_id), "unblock_n");
        step!(p_adapter.unblock_peer(&n_peer_id), "unblock_p");
        step!(n_adapter.disconnect_peer(&p_peer_id), "disconnect_n");
        step!(p_adapter.disconnect_peer(&n_peer_id), "disconnect_p");
        step!(n_adapter.connect_peer(&resolved_address), "connect");
        step!(n_adapter.protect_peer(&p_peer_id), "protect");

        self.metrics.record_resolved_state(
            n_name,
            &n_peer_id.to_string(),
            peer_name,
            &p_peer_id.to_string()
        );
    }
}

fn resolve_peer_id(config: &NodeConfig, state: &NodeState) -> PeerId {
    config.peer_id.clone().unwrap_or_else(|| state.self_info.peer_id.clone())
}

/// Resolves the address for connecting `n` to `p`, following the §4.4(b)
/// precedence: declared `PeerAddress`, then `PeerAddressLocal` when both
/// nodes carry a non-empty, equal cluster tag, then the first observed
/// address from `p`'s last poll.
fn resolve_address(
    n_config: &NodeConfig,
    p_config: &NodeConfig,
    p_state: &NodeState,
    resolved_peer_id: &PeerId
) -> Result<String, ReconcileError> {
    let candidate = if let Some(addr) = p_config.peer_address.as_ref().filter(|a| !a.is_empty()) {
        addr.clone()
    } else if let Some(local) = p_config.peer_address_local.as_ref().filter(|a| !a.is_empty()) {
        match (&n_config.cluster, &p_config.cluster) {
            (Some(n_cluster), Some(p_cluster)) if !n_cluster.is_empty() && n_cluster == p_cluster => local.clone(),
            _ => first_observed_address(p_state)?
        }
    } else {
        first_observed_address(p_state)?
    };

    Ok(substitute_placeholder(&candidate, resolved_peer_id))
}

fn first_observed_address(p_state: &NodeState) -> Result<String, ReconcileError> {
    p_state.self_info.addresses.first().cloned().ok_or(ReconcileError::AddressUnresolvable)
}

/// Bit-exact placeholder substitution (§6): only `/dns4/<host>/p2p/{peer_id}`
/// is recognized; the literal suffix is swapped for the resolved `PeerID`.
pub fn substitute_placeholder(addr: &str, peer_id: &PeerId) -> String {
    if addr.starts_with(DNS4_PREFIX) && addr.ends_with(PLACEHOLDER_SUFFIX) {
        let host_part = &addr[..addr.len() - PLACEHOLDER_SUFFIX.len()];
        format!("{host_part}/p2p/{peer_id}")
    } else {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use pms_types::PeerInfo;

    use super::*;

    fn node_state(peer_id: &str, addresses: Vec<&str>) -> NodeState {
        NodeState {
            self_info:   PeerInfo::new(
                PeerId::from(peer_id),
                addresses.into_iter().map(String::from).collect(),
                Connectedness::Connected
            ),
            peers:       Default::default(),
            known_peers: Vec::new(),
            updated_at:  Instant::now()
        }
    }

    #[test]
    fn substitutes_the_literal_placeholder_suffix() {
        let addr = substitute_placeholder("/dns4/node2.example/p2p/{peer_id}", &PeerId::from("Qm123"));
        assert_eq!(addr, "/dns4/node2.example/p2p/Qm123");
    }

    #[test]
    fn leaves_non_matching_addresses_untouched() {
        let addr = substitute_placeholder("/ip4/10.0.0.1/tcp/30303", &PeerId::from("Qm123"));
        assert_eq!(addr, "/ip4/10.0.0.1/tcp/30303");
    }

    fn node_config(peer_address: Option<&str>, peer_address_local: Option<&str>, cluster: Option<&str>) -> NodeConfig {
        NodeConfig {
            rpc_address: "http://localhost:1".into(),
            cluster: cluster.map(String::from),
            peer_id: None,
            peer_address: peer_address.map(String::from),
            peer_address_local: peer_address_local.map(String::from),
            prevent_inbound: false,
            prevent_outbound: false
        }
    }

    #[test]
    fn declared_address_wins_over_everything() {
        let n = node_config(None, None, Some("us-east"));
        let p = node_config(Some("/dns4/p.example/p2p/{peer_id}"), Some("/ip4/10.0.0.2/tcp/1"), Some("us-east"));
        let p_state = node_state("QmP", vec!["/ip4/10.0.0.9/tcp/1"]);
        let resolved = resolve_address(&n, &p, &p_state, &PeerId::from("QmP")).unwrap();
        assert_eq!(resolved, "/dns4/p.example/p2p/QmP");
    }

    #[test]
    fn cluster_local_only_applies_when_tags_match() {
        let n = node_config(None, None, Some("us-east"));
        let p = node_config(None, Some("/ip4/10.0.0.2/tcp/1"), Some("us-west"));
        let p_state = node_state("QmP", vec!["/ip4/10.0.0.9/tcp/1"]);
        let resolved = resolve_address(&n, &p, &p_state, &PeerId::from("QmP")).unwrap();
        assert_eq!(resolved, "/ip4/10.0.0.9/tcp/1", "mismatched cluster tags must fall through to observed address");
    }

    #[test]
    fn falls_back_to_first_observed_address() {
        let n = node_config(None, None, None);
        let p = node_config(None, None, None);
        let p_state = node_state("QmP", vec!["/ip4/10.0.0.9/tcp/1", "/ip4/10.0.0.10/tcp/1"]);
        let resolved = resolve_address(&n, &p, &p_state, &PeerId::from("QmP")).unwrap();
        assert_eq!(resolved, "/ip4/10.0.0.9/tcp/1");
    }

    #[test]
    fn errors_when_nothing_is_resolvable() {
        let n = node_config(None, None, None);
        let p = node_config(None, None, None);
        let p_state = node_state("QmP", vec![]);
        let result = resolve_address(&n, &p, &p_state, &PeerId::from("QmP"));
        assert_eq!(result, Err(ReconcileError::AddressUnresolvable));
    }
}

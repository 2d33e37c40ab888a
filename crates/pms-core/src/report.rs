use std::{collections::HashMap, time::Duration};

use pms_metrics::Knownness;
use pms_state::NetworkStateSnapshot;
use pms_types::Connectedness;

/// Pure computation of everything the Report phase (§4.3 step 4) needs to
/// emit, kept free of the `metrics` crate so it can be unit tested directly
/// against a [`NetworkStateSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub member_count: usize,
    /// `network_peer_healthness`: healthy directed edges over `|M|*(|M|-1)`.
    pub healthness:   f64,
    pub nodes:        Vec<NodeReport>
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub name:                  String,
    pub node_peer_id:          String,
    pub connectedness_counts:  HashMap<(Knownness, Connectedness), usize>,
    pub known_peer_latencies:  Vec<KnownPeerLatency>
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnownPeerLatency {
    pub peer_name:     String,
    pub peer_peer_id:  String,
    pub latency:       Duration
}

pub fn compute_report(members: &[String], snapshot: &NetworkStateSnapshot) -> ReportSummary {
    let denominator = members.len().saturating_mul(members.len().saturating_sub(1));
    let mut healthy_edges = 0usize;
    let mut nodes = Vec::with_capacity(members.len());

    for name in members {
        let Some(node) = snapshot.nodes.get(name) else { continue };
        let node_peer_id = node.self_info.peer_id.to_string();
        let mut connectedness_counts: HashMap<(Knownness, Connectedness), usize> = HashMap::new();
        let mut known_peer_latencies = Vec::new();

        for peer_info in node.peers.values() {
            if peer_info.peer_id == node.self_info.peer_id {
                continue; // a node is never its own peer.
            }

            let known_name = snapshot.nodes_by_peer_id.get(&peer_info.peer_id).cloned();
            let knownness = if known_name.is_some() { Knownness::Known } else { Knownness::Unknown };
            *connectedness_counts.entry((knownness, peer_info.connectedness)).or_insert(0) += 1;

            if let Some(peer_name) = known_name {
                if peer_info.connectedness == Connectedness::Connected {
                    healthy_edges += 1;
                    known_peer_latencies.push(KnownPeerLatency {
                        peer_name,
                        peer_peer_id: peer_info.peer_id.to_string(),
                        latency: peer_info.latency
                    });
                }
            }
        }

        nodes.push(NodeReport { name: name.clone(), node_peer_id, connectedness_counts, known_peer_latencies });
    }

    let healthness = if denominator > 0 { healthy_edges as f64 / denominator as f64 } else { 0.0 };
    ReportSummary { member_count: members.len(), healthness, nodes }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use pms_state::NodeState;
    use pms_types::{PeerId, PeerInfo};

    use super::*;

    fn snapshot_with(nodes: Vec<(&str, NodeState)>) -> NetworkStateSnapshot {
        let mut snap = NetworkStateSnapshot::default();
        for (name, state) in nodes {
            snap.nodes_by_peer_id.insert(state.self_info.peer_id.clone(), name.to_string());
            snap.nodes.insert(name.to_string(), state);
        }
        snap
    }

    fn node_state(peer_id: &str, peers: Vec<PeerInfo>) -> NodeState {
        NodeState {
            self_info:   PeerInfo::new(PeerId::from(peer_id), vec![], Connectedness::Connected),
            peers:       peers.into_iter().map(|p| (p.peer_id.clone(), p)).collect(),
            known_peers: Vec::new(),
            updated_at:  Instant::now()
        }
    }

    #[test]
    fn cold_start_with_no_observed_peers_is_zero_healthness() {
        let members = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];
        let snapshot = snapshot_with(vec![
            ("p1", node_state("Qp1", vec![])),
            ("p2", node_state("Qp2", vec![])),
            ("p3", node_state("Qp3", vec![])),
        ]);
        let report = compute_report(&members, &snapshot);
        assert_eq!(report.healthness, 0.0);
        assert_eq!(report.member_count, 3);
    }

    #[test]
    fn full_mesh_connected_is_perfectly_healthy() {
        let members = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];
        let connected = |id: &str| PeerInfo::new(PeerId::from(id), vec![], Connectedness::Connected);
        let snapshot = snapshot_with(vec![
            ("p1", node_state("Qp1", vec![connected("Qp2"), connected("Qp3")])),
            ("p2", node_state("Qp2", vec![connected("Qp1"), connected("Qp3")])),
            ("p3", node_state("Qp3", vec![connected("Qp1"), connected("Qp2")])),
        ]);
        let report = compute_report(&members, &snapshot);
        assert_eq!(report.healthness, 1.0);
    }

    #[test]
    fn known_and_unknown_peers_are_counted_separately() {
        let members = vec!["p1".to_string(), "p2".to_string()];
        let known_connected = PeerInfo::new(PeerId::from("Qp2"), vec![], Connectedness::Connected);
        let unknown_connected = PeerInfo::new(PeerId::from("Qghost"), vec![], Connectedness::Connected);
        let snapshot = snapshot_with(vec![
            ("p1", node_state("Qp1", vec![known_connected, unknown_connected])),
            ("p2", node_state("Qp2", vec![])),
        ]);
        let report = compute_report(&members, &snapshot);
        let p1 = report.nodes.iter().find(|n| n.name == "p1").unwrap();
        assert_eq!(*p1.connectedness_counts.get(&(Knownness::Known, Connectedness::Connected)).unwrap(), 1);
        assert_eq!(*p1.connectedness_counts.get(&(Knownness::Unknown, Connectedness::Connected)).unwrap(), 1);

        // Metric law: total observed-excluding-self == sum across all (knownness, connectedness).
        let total: usize = p1.connectedness_counts.values().sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn self_peer_entries_never_count() {
        let members = vec!["p1".to_string()];
        let self_entry = PeerInfo::new(PeerId::from("Qp1"), vec![], Connectedness::Connected);
        let snapshot = snapshot_with(vec![("p1", node_state("Qp1", vec![self_entry]))]);
        let report = compute_report(&members, &snapshot);
        let p1 = &report.nodes[0];
        assert!(p1.connectedness_counts.is_empty());
    }
}

//! Network State (§4.2): an atomic, dual-indexed store of the last
//! observation per node for one network. One [`NetworkState`] is owned per
//! network by the Network Supervisor.

use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant}
};

use parking_lot::Mutex;
use pms_types::{PeerId, PeerInfo};

/// The last observation of one declared node.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub self_info:   PeerInfo,
    pub peers:       HashMap<PeerId, PeerInfo>,
    /// Derived projection, written only by [`NetworkState::project_all`].
    pub known_peers: Vec<String>,
    pub updated_at:  Instant
}

/// A node removed by [`NetworkState::expire`], carried for the warning log
/// §4.3 requires naming the node and its last `PeerID`.
#[derive(Debug, Clone)]
pub struct ExpiredNode {
    pub name:         String,
    pub last_peer_id: PeerId
}

/// A deep-enough copy of one network's state that metric emission can run
/// without holding the state mutex.
#[derive(Debug, Clone, Default)]
pub struct NetworkStateSnapshot {
    pub nodes:            HashMap<String, NodeState>,
    pub nodes_by_peer_id: HashMap<PeerId, String>
}

#[derive(Default)]
struct Inner {
    nodes:            HashMap<String, NodeState>,
    nodes_by_peer_id: HashMap<PeerId, String>
}

/// Dual-indexed store for one network: `nodes` keyed by node name,
/// `nodes_by_peer_id` keyed by the opaque `PeerID` each node last reported
/// as its own. A single mutex guards both maps so every compound
/// read/write (read old PeerID, drop old mapping, install new mapping) is
/// atomic with respect to readers.
pub struct NetworkState {
    inner: Mutex<Inner>
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkState {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    /// Records a successful poll of `name`. Preserves I1 (index coherence)
    /// and I2 (identity change): if `name` previously reported a different
    /// `PeerID`, the old mapping is dropped before the new one is
    /// installed, and the prior peer-set observation is replaced outright,
    /// never merged.
    pub fn upsert(&self, name: &str, self_info: PeerInfo, peers: HashMap<PeerId, PeerInfo>, now: Instant) {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.nodes.get(name) {
            if existing.self_info.peer_id != self_info.peer_id {
                inner.nodes_by_peer_id.remove(&existing.self_info.peer_id);
            }
        }
        inner.nodes_by_peer_id.insert(self_info.peer_id.clone(), name.to_string());
        inner
            .nodes
            .insert(name.to_string(), NodeState { self_info, peers, known_peers: Vec::new(), updated_at: now });
    }

    /// Removes every `NodeState` whose `updated_at` is older than `ttl`
    /// relative to `now`. Preserves I5: both indices are updated in the
    /// same lock acquisition.
    pub fn expire(&self, now: Instant, ttl: Duration) -> Vec<ExpiredNode> {
        let mut inner = self.inner.lock();
        let stale: Vec<String> = inner
            .nodes
            .iter()
            .filter(|(_, state)| now.saturating_duration_since(state.updated_at) > ttl)
            .map(|(name, _)| name.clone())
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for name in stale {
            if let Some(state) = inner.nodes.remove(&name) {
                inner.nodes_by_peer_id.remove(&state.self_info.peer_id);
                expired.push(ExpiredNode { name, last_peer_id: state.self_info.peer_id });
            }
        }
        expired
    }

    /// Rebuilds the `known_peers` projection for every node currently in
    /// the store, under a single lock acquisition. Preserves I3 (a node
    /// never knows itself) and I4 (the known set is exactly the projection
    /// of `peers` through `nodes_by_peer_id`). Returns `(name,
    /// known_peers)` pairs for logging the full name-to-PeerID mapping.
    pub fn project_all(&self) -> Vec<(String, Vec<String>)> {
        let mut inner = self.inner.lock();
        let names: Vec<String> = inner.nodes.keys().cloned().collect();
        let mut results = Vec::with_capacity(names.len());

        for name in names {
            let Some(state) = inner.nodes.get(&name) else { continue };
            let self_peer_id = state.self_info.peer_id.clone();
            let known: Vec<String> = state
                .peers
                .keys()
                .filter(|peer_id| **peer_id != self_peer_id)
                .filter_map(|peer_id| inner.nodes_by_peer_id.get(peer_id).cloned())
                .collect();

            if let Some(state) = inner.nodes.get_mut(&name) {
                state.known_peers = known.clone();
            }
            results.push((name, known));
        }
        results
    }

    /// A deep-enough copy for metric emission outside the lock.
    pub fn snapshot(&self) -> NetworkStateSnapshot {
        let inner = self.inner.lock();
        NetworkStateSnapshot { nodes: inner.nodes.clone(), nodes_by_peer_id: inner.nodes_by_peer_id.clone() }
    }

    pub fn get(&self, name: &str) -> Option<NodeState> {
        self.inner.lock().nodes.get(name).cloned()
    }

    pub fn name_for_peer_id(&self, peer_id: &PeerId) -> Option<String> {
        self.inner.lock().nodes_by_peer_id.get(peer_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checks invariants I1, I3, I4 against a snapshot. Used by tests; panics
/// are avoided in favor of a descriptive `Err` so property tests can report
/// which invariant broke.
pub fn check_invariants(snapshot: &NetworkStateSnapshot) -> Result<(), String> {
    for (name, state) in &snapshot.nodes {
        match snapshot.nodes_by_peer_id.get(&state.self_info.peer_id) {
            Some(mapped) if mapped == name => {}
            Some(mapped) => {
                return Err(format!(
                    "I1 violated: {name}'s peer_id {:?} maps to {mapped}, not {name}",
                    state.self_info.peer_id
                ))
            }
            None => {
                return Err(format!("I1 violated: {name}'s peer_id {:?} missing from index", state.self_info.peer_id))
            }
        }

        if state.known_peers.iter().any(|p| p == name) {
            return Err(format!("I3 violated: {name} lists itself as a known peer"));
        }

        let expected: HashSet<&String> = state
            .peers
            .keys()
            .filter(|peer_id| **peer_id != state.self_info.peer_id)
            .filter_map(|peer_id| snapshot.nodes_by_peer_id.get(peer_id))
            .collect();
        let actual: HashSet<&String> = state.known_peers.iter().collect();
        if expected != actual {
            return Err(format!(
                "I4 violated for {name}: expected known peers {expected:?}, got {actual:?}"
            ));
        }
    }
    Ok(())
}

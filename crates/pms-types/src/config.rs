use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::peer::PeerId;

/// Top-level configuration recognized by the peer mesh manager. Every field
/// here is enumerated in the operator-facing configuration surface; nothing
/// else is read from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub rpc_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub node_state_expiration: Duration,
    #[serde(default)]
    pub dry_run: bool,
    pub networks: HashMap<String, NetworkConfig>
}

/// One network's declared membership and per-node settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Declared membership, in the order the operator listed it. Order is
    /// preserved for deterministic reconciliation and logging, never for
    /// correctness of the mesh itself.
    pub members: Vec<String>,
    pub nodes:   HashMap<String, NodeConfig>
}

impl NetworkConfig {
    pub fn node(&self, name: &str) -> Option<&NodeConfig> {
        self.nodes.get(name)
    }
}

/// Settings for a single node within a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub rpc_address: String,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub peer_id: Option<PeerId>,
    #[serde(default)]
    pub peer_address: Option<String>,
    #[serde(default)]
    pub peer_address_local: Option<String>,
    #[serde(default)]
    pub prevent_inbound: bool,
    #[serde(default)]
    pub prevent_outbound: bool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_minimal_toml_document() {
        let raw = r#"
            poll_interval = "30s"
            rpc_timeout = "5s"
            node_state_expiration = "2m"

            [networks.mainnet]
            members = ["p1", "p2"]

            [networks.mainnet.nodes.p1]
            rpc_address = "http://p1:9000"

            [networks.mainnet.nodes.p2]
            rpc_address = "http://p2:9000"
            cluster = "us-east"
            prevent_inbound = true
        "#;

        let cfg: Config = toml::from_str(raw).expect("valid config");
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert!(!cfg.dry_run);
        let net = cfg.networks.get("mainnet").expect("mainnet present");
        assert_eq!(net.members, vec!["p1".to_string(), "p2".to_string()]);
        assert!(net.node("p2").unwrap().prevent_inbound);
        assert!(!net.node("p1").unwrap().prevent_inbound);
    }
}

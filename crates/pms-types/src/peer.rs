use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Opaque peer identifier as returned by a node's RPC. We never interpret its
/// bytes, only compare and hash it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The connection state of an observed peer, matched case-insensitively
/// against whatever casing a node's RPC returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connectedness {
    NotConnected,
    Connected,
    CanConnect,
    CannotConnect
}

impl Connectedness {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::NotConnected => "notconnected",
            Self::Connected => "connected",
            Self::CanConnect => "canconnect",
            Self::CannotConnect => "cannotconnect"
        }
    }

    pub fn parse_case_insensitive(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "notconnected" => Some(Self::NotConnected),
            "connected" => Some(Self::Connected),
            "canconnect" => Some(Self::CanConnect),
            "cannotconnect" => Some(Self::CannotConnect),
            _ => None
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::NotConnected, Self::Connected, Self::CanConnect, Self::CannotConnect]
    }
}

/// One observation of a peer as reported by a node's `Self`/`Peers` RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_id:       PeerId,
    /// Ordered multiaddr-like strings, as reported by the node.
    pub addresses:     Vec<String>,
    pub connectedness: Connectedness,
    #[serde(with = "duration_millis")]
    pub latency:       Duration
}

impl PeerInfo {
    pub fn new(peer_id: PeerId, addresses: Vec<String>, connectedness: Connectedness) -> Self {
        Self { peer_id, addresses, connectedness, latency: Duration::ZERO }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

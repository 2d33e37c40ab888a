use std::collections::HashMap;

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use pms_types::{PeerId, PeerInfo};

/// The JSON-RPC surface a consensus-layer node's peer-admin API exposes.
/// This is the wire-level counterpart of the capability set in §4.1; any
/// transport satisfying it is acceptable, this is simply the one this
/// workspace ships.
#[rpc(client, namespace = "p2p")]
pub trait P2pRpc {
    #[method(name = "self")]
    async fn self_info(&self) -> RpcResult<PeerInfo>;

    #[method(name = "peers")]
    async fn peers(&self, connected_only: bool) -> RpcResult<HashMap<PeerId, PeerInfo>>;

    #[method(name = "connectPeer")]
    async fn connect_peer(&self, addr: String) -> RpcResult<()>;

    #[method(name = "disconnectPeer")]
    async fn disconnect_peer(&self, peer_id: PeerId) -> RpcResult<()>;

    #[method(name = "blockPeer")]
    async fn block_peer(&self, peer_id: PeerId) -> RpcResult<()>;

    #[method(name = "unblockPeer")]
    async fn unblock_peer(&self, peer_id: PeerId) -> RpcResult<()>;

    #[method(name = "protectPeer")]
    async fn protect_peer(&self, peer_id: PeerId) -> RpcResult<()>;

    #[method(name = "unprotectPeer")]
    async fn unprotect_peer(&self, peer_id: PeerId) -> RpcResult<()>;
}

//! A scripted [`PeerAdapter`] double that records every mutating call it
//! receives and returns canned responses for `self_info`/`peers`. Used by
//! `pms-core`'s tests to exercise the Tick Engine and Reconciler without any
//! network, the same role `testing-tools/src/network/strom_peer.rs` plays
//! for the order-pool tests this workspace was cut from.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use pms_net::{AdapterError, PeerAdapter};
use pms_types::{PeerId, PeerInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ConnectPeer(String),
    DisconnectPeer(PeerId),
    BlockPeer(PeerId),
    UnblockPeer(PeerId),
    ProtectPeer(PeerId),
    UnprotectPeer(PeerId)
}

struct MockInner {
    self_info: Result<PeerInfo, AdapterError>,
    peers:     Result<HashMap<PeerId, PeerInfo>, AdapterError>,
    calls:     Vec<RecordedCall>
}

/// A scripted peer. Configure `self_info`/`peers` with [`MockAdapter::set_self_info`]
/// / [`MockAdapter::set_peers`] before a tick, then inspect [`MockAdapter::calls`]
/// afterward to assert which reconciliation actions were issued.
#[derive(Clone)]
pub struct MockAdapter {
    inner: std::sync::Arc<Mutex<MockInner>>
}

impl MockAdapter {
    pub fn new(self_info: PeerInfo) -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(MockInner {
                self_info: Ok(self_info),
                peers:     Ok(HashMap::new()),
                calls:     Vec::new()
            }))
        }
    }

    pub fn set_self_info(&self, info: PeerInfo) {
        self.inner.lock().self_info = Ok(info);
    }

    pub fn set_peers(&self, peers: HashMap<PeerId, PeerInfo>) {
        self.inner.lock().peers = Ok(peers);
    }

    pub fn fail_self_info(&self, err: AdapterError) {
        self.inner.lock().self_info = Err(err);
    }

    pub fn fail_peers(&self, err: AdapterError) {
        self.inner.lock().peers = Err(err);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    fn record(&self, call: RecordedCall) {
        self.inner.lock().calls.push(call);
    }
}

#[async_trait]
impl PeerAdapter for MockAdapter {
    async fn self_info(&self) -> Result<PeerInfo, AdapterError> {
        self.inner.lock().self_info.clone()
    }

    async fn peers(&self, _connected_only: bool) -> Result<HashMap<PeerId, PeerInfo>, AdapterError> {
        self.inner.lock().peers.clone()
    }

    async fn connect_peer(&self, addr: &str) -> Result<(), AdapterError> {
        self.record(RecordedCall::ConnectPeer(addr.to_string()));
        Ok(())
    }

    async fn disconnect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.record(RecordedCall::DisconnectPeer(peer_id.clone()));
        Ok(())
    }

    async fn block_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.record(RecordedCall::BlockPeer(peer_id.clone()));
        Ok(())
    }

    async fn unblock_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.record(RecordedCall::UnblockPeer(peer_id.clone()));
        Ok(())
    }

    async fn protect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.record(RecordedCall::ProtectPeer(peer_id.clone()));
        Ok(())
    }

    async fn unprotect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.record(RecordedCall::UnprotectPeer(peer_id.clone()));
        Ok(())
    }
}

use std::{collections::HashMap, future::Future, time::Duration, time::Instant};

use async_trait::async_trait;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use pms_metrics::NetworkMetrics;
use pms_types::{PeerId, PeerInfo};

use crate::{error::AdapterError, rpc::P2pRpcClient};

/// The capability set a node's RPC endpoint must satisfy, as consumed by
/// the Tick Engine and Reconciler. `block_peer` is reserved: the Reconciler
/// never calls it (§4.4's sequence only unblocks), but operators may still
/// invoke it directly, so it stays part of the contract.
#[async_trait]
pub trait PeerAdapter: Send + Sync {
    async fn self_info(&self) -> Result<PeerInfo, AdapterError>;
    async fn peers(&self, connected_only: bool) -> Result<HashMap<PeerId, PeerInfo>, AdapterError>;
    async fn connect_peer(&self, addr: &str) -> Result<(), AdapterError>;
    async fn disconnect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError>;
    #[allow(dead_code)]
    async fn block_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError>;
    async fn unblock_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError>;
    async fn protect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError>;
    async fn unprotect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError>;
}

/// A per-(network, node) instrumented JSON-RPC client. Every call is
/// wrapped with `timeout`; on success it records a latency sample, on
/// failure a classified-error counter. Never retries: retries are a policy
/// decision left to the caller (the Tick Engine / Reconciler).
pub struct RpcP2pClientAdapter {
    node:    String,
    client:  HttpClient,
    timeout: Duration,
    metrics: NetworkMetrics
}

impl RpcP2pClientAdapter {
    pub fn connect(
        node: impl Into<String>,
        rpc_address: &str,
        timeout: Duration,
        metrics: NetworkMetrics
    ) -> Result<Self, AdapterError> {
        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(rpc_address)
            .map_err(|e| AdapterError::TransportError(e.to_string()))?;
        Ok(Self { node: node.into(), client, timeout, metrics })
    }

    async fn instrumented<T, F>(&self, method: &'static str, fut: F) -> Result<T, AdapterError>
    where
        F: Future<Output = Result<T, jsonrpsee_core::ClientError>>
    {
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => {
                self.metrics.record_latency(&self.node, method, start.elapsed());
                Ok(value)
            }
            Ok(Err(err)) => {
                let err = AdapterError::from(err);
                self.metrics.record_error(&self.node, method, &err.error_class());
                tracing::warn!(
                    network = self.metrics.network(),
                    node = %self.node,
                    method,
                    err = %err,
                    "p2p rpc call failed"
                );
                Err(err)
            }
            Err(_elapsed) => {
                let err = AdapterError::Timeout(self.timeout);
                self.metrics.record_error(&self.node, method, &err.error_class());
                tracing::warn!(network = self.metrics.network(), node = %self.node, method, "p2p rpc call timed out");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl PeerAdapter for RpcP2pClientAdapter {
    async fn self_info(&self) -> Result<PeerInfo, AdapterError> {
        self.instrumented("self", self.client.self_info()).await
    }

    async fn peers(&self, connected_only: bool) -> Result<HashMap<PeerId, PeerInfo>, AdapterError> {
        self.instrumented("peers", self.client.peers(connected_only)).await
    }

    async fn connect_peer(&self, addr: &str) -> Result<(), AdapterError> {
        self.instrumented("connect_peer", self.client.connect_peer(addr.to_string())).await
    }

    async fn disconnect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.instrumented("disconnect_peer", self.client.disconnect_peer(peer_id.clone())).await
    }

    async fn block_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.instrumented("block_peer", self.client.block_peer(peer_id.clone())).await
    }

    async fn unblock_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.instrumented("unblock_peer", self.client.unblock_peer(peer_id.clone())).await
    }

    async fn protect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.instrumented("protect_peer", self.client.protect_peer(peer_id.clone())).await
    }

    async fn unprotect_peer(&self, peer_id: &PeerId) -> Result<(), AdapterError> {
        self.instrumented("unprotect_peer", self.client.unprotect_peer(peer_id.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use metrics_util::debugging::DebuggingRecorder;

    use super::*;

    fn test_adapter(timeout: Duration) -> RpcP2pClientAdapter {
        RpcP2pClientAdapter::connect("p1", "http://127.0.0.1:1", timeout, NetworkMetrics::new("mainnet"))
            .expect("building an HttpClient never connects eagerly")
    }

    #[test]
    fn successful_call_records_a_latency_sample() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let adapter = test_adapter(Duration::from_millis(50));

        metrics::with_local_recorder(&recorder, || {
            let rt = tokio::runtime::Runtime::new().expect("runtime");
            let result: Result<u8, AdapterError> =
                rt.block_on(adapter.instrumented("self", async { Ok::<u8, jsonrpsee_core::ClientError>(7) }));
            assert_eq!(result.unwrap(), 7);
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert!(snapshot.iter().any(|(key, ..)| key.key().name() == "rpc_latency"));
    }

    #[test]
    fn a_call_that_never_resolves_times_out_and_is_classified() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let adapter = test_adapter(Duration::from_millis(5));

        metrics::with_local_recorder(&recorder, || {
            let rt = tokio::runtime::Runtime::new().expect("runtime");
            let result: Result<(), AdapterError> =
                rt.block_on(adapter.instrumented("self", std::future::pending()));
            assert!(matches!(result, Err(AdapterError::Timeout(_))));
        });

        let snapshot = snapshotter.snapshot().into_vec();
        let recorded_class = snapshot.iter().find_map(|(key, ..)| {
            (key.key().name() == "errors_total")
                .then(|| key.key().labels().find(|l| l.key() == "error_class").map(|l| l.value().to_string()))
                .flatten()
        });
        assert_eq!(recorded_class.as_deref(), Some("timeout"));
    }
}

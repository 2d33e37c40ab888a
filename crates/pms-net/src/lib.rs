//! The P2P Client Adapter (§4.1): a stable, instrumented capability set per
//! (network, node) RPC endpoint.

mod adapter;
mod error;
mod rpc;

pub use adapter::{PeerAdapter, RpcP2pClientAdapter};
pub use error::AdapterError;
pub use rpc::P2pRpcClient;

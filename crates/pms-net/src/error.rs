use pms_types::normalize_error_class;
use thiserror::Error;

/// Errors returned by the P2P Client Adapter. Every variant is returned to
/// the caller, never retried here; the Tick Engine decides whether a failed
/// observation leaves a node's state untouched for the current tick.
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("transport error: {0}")]
    TransportError(String)
}

impl AdapterError {
    /// Bounded-cardinality metric label for this error, per §4.1's
    /// normalization rule.
    pub fn error_class(&self) -> String {
        match self {
            Self::Timeout(_) => "timeout".to_string(),
            Self::TransportError(msg) => normalize_error_class(msg)
        }
    }
}

impl From<jsonrpsee_core::ClientError> for AdapterError {
    fn from(err: jsonrpsee_core::ClientError) -> Self {
        Self::TransportError(err.to_string())
    }
}

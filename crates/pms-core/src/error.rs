use thiserror::Error;

/// Errors arising while resolving one edge's connect address. Logged and
/// causes the edge to be skipped for the current tick; never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("neither a declared nor an observed address is available")]
    AddressUnresolvable
}

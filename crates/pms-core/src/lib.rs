//! The control loop: Tick Engine (§4.3), Reconciler (§4.4), and Network
//! Supervisor (§4.5).

mod error;
mod reconcile;
mod report;
mod supervisor;
mod tick;

pub use error::ReconcileError;
pub use reconcile::{substitute_placeholder, Reconciler};
pub use report::{compute_report, KnownPeerLatency, NodeReport, ReportSummary};
pub use supervisor::NetworkSupervisor;
pub use tick::TickEngine;

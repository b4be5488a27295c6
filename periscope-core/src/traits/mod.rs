//! Collaborator traits
//!
//! These traits define the interface between the acquisition engine and
//! everything outside it: the converter hardware, the deferred-job queue,
//! the transport, resource arbitration and the unit registry.

pub mod hardware;
pub mod queue;
pub mod resources;
pub mod transport;
pub mod unit;

pub use hardware::{AdcHardware, DmaStatus};
pub use queue::{JobQueue, QueueFull};
pub use resources::{ClaimError, Port, Resource, ResourceClaim};
pub use transport::ReportSink;
pub use unit::Unit;

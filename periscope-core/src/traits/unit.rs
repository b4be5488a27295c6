//! Unit lifecycle contract
//!
//! Every peripheral unit goes through the same lifecycle:
//! - pre-init: construction, allocating state and defaults
//! - init: claim resources and program hardware
//! - tick: periodic housekeeping from the system tick
//! - deinit: reverse init
//!
//! Requests are dispatched by command code with the raw payload.

use periscope_protocol::Response;

use super::resources::ResourceClaim;
use crate::error::UnitError;

/// A pluggable peripheral unit
pub trait Unit {
    /// Type name used by the unit registry
    const TYPE_NAME: &'static str;

    /// Claim resources and bring the hardware up
    fn init(&mut self, resources: &mut dyn ResourceClaim) -> Result<(), UnitError>;

    /// Shut the hardware down and release resources
    fn deinit(&mut self, resources: &mut dyn ResourceClaim);

    /// Periodic tick, `elapsed_ms` since the previous one
    fn tick(&mut self, elapsed_ms: u32);

    /// Handle a host request on transaction `id`
    fn handle_request(&mut self, id: u16, code: u8, payload: &[u8]) -> Result<Response, UnitError>;
}

//! Board-agnostic core logic of the Periscope firmware
//!
//! This crate contains the analog acquisition unit and everything it needs
//! that does not depend on a specific chip:
//!
//! - Collaborator traits (converter hardware, job queue, report sink,
//!   resource claims, unit lifecycle)
//! - Acquisition configuration and its persisted form
//! - Sample-rate solver, circular buffer geometry, live sample cache
//! - Trigger detection with hold-off
//! - Capture session bookkeeping and report jobs
//! - The mode state machine driving all of the above

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod acquisition;
pub mod config;
pub mod error;
pub mod resources;
pub mod traits;

pub use acquisition::{AdcUnit, OpMode, ReportJob};
pub use config::AcquisitionConfig;
pub use error::UnitError;

//! Analog acquisition unit
//!
//! Free-runs the converter at a timer-paced rate into a circular DMA buffer,
//! keeps a live per-channel cache, detects trigger edges and turns buffer
//! segments into report jobs for the host.

pub mod buffer;
pub mod cache;
pub mod channels;
pub mod countdown;
pub mod engine;
pub mod mode;
pub mod rate;
pub mod report;
mod requests;
pub mod session;
pub mod trigger;

#[cfg(test)]
mod sim;

pub use buffer::{Boundary, BufferLayout};
pub use channels::ChannelTable;
pub use engine::{AdcUnit, AVERAGING_CEILING_HZ, RECOVERY_MS, SAFE_RATE_HZ};
pub use mode::{ModeEvent, OpMode};
pub use rate::RateSolution;
pub use report::ReportJob;
pub use session::{CaptureSession, SessionKind};
pub use trigger::TriggerConfig;

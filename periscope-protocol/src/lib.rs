//! Host link protocol
//!
//! This crate defines the framed request/response link between the host and
//! the Periscope firmware, and the command/response codec of the analog
//! acquisition unit.
//!
//! # Protocol Overview
//!
//! All messages use one binary frame format:
//! ```text
//! ┌───────┬────────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ ID     │ LENGTH │ TYPE │ PAYLOAD     │ CHECKSUM │
//! │ 1B    │ 2B LE  │ 2B LE  │ 1B   │ 0–65535B    │ 1B       │
//! └───────┴────────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! Requests carry the command code in TYPE. Replies reuse the request ID, so
//! a host listener keyed on the ID receives the reply and any chunks streamed
//! for that transaction. Large payloads are written in pieces with
//! [`MultipartEncoder`] so the sender never has to hold a whole frame.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod events;
pub mod frame;
pub mod messages;

pub use events::TriggerEdge;
pub use frame::{Frame, FrameError, FrameParser, MultipartEncoder, FRAME_START, MAX_PAYLOAD_SIZE};
pub use messages::{AdcCommand, ParseError, Response, TriggerSetup, MAX_CHANNELS};

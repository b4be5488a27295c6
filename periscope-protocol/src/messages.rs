//! Command and response codec of the analog acquisition unit
//!
//! Message types are divided into two categories:
//! - Host → Unit: requests, TYPE = command code
//! - Unit → Host: replies (success / error) and capture stream messages
//!
//! All multi-byte fields are little-endian.

use crate::events::TriggerEdge;
use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use heapless::Vec;

// Message type IDs: Unit → Host
pub const MSG_SUCCESS: u8 = 0x00;
pub const MSG_ERROR: u8 = 0x01;
pub const MSG_CAPTURE_START: u8 = 0x50;
pub const MSG_CAPTURE_MORE: u8 = 0x51;
pub const MSG_CAPTURE_DONE: u8 = 0x52;

// Command codes: Host → Unit
pub const CMD_GET_CHANNELS: u8 = 0x00;
pub const CMD_SET_SAMPLE_RATE: u8 = 0x01;
pub const CMD_GET_SAMPLE_RATE: u8 = 0x02;
pub const CMD_SET_SMOOTHING_FACTOR: u8 = 0x03;
pub const CMD_READ_RAW: u8 = 0x04;
pub const CMD_READ_SMOOTHED: u8 = 0x05;
pub const CMD_SETUP_TRIGGER: u8 = 0x10;
pub const CMD_ARM: u8 = 0x11;
pub const CMD_DISARM: u8 = 0x12;
pub const CMD_ABORT: u8 = 0x13;
pub const CMD_FORCE_TRIGGER: u8 = 0x14;
pub const CMD_GET_TRIGGER: u8 = 0x15;
pub const CMD_BLOCK_CAPTURE: u8 = 0x20;
pub const CMD_STREAM_START: u8 = 0x21;
pub const CMD_STREAM_STOP: u8 = 0x22;
pub const CMD_GET_STATUS: u8 = 0x30;
pub const CMD_SET_SMOOTHING_ENABLED: u8 = 0x31;

/// Largest channel set the wire format carries
pub const MAX_CHANNELS: usize = 18;

/// `arm` argument that leaves the auto-rearm flag untouched
pub const STICKY_UNCHANGED: u8 = 255;

/// Encoded size of [`TriggerSetup`]
pub const TRIGGER_SETUP_LEN: usize = 13;

/// Errors raised while decoding a request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// TYPE byte is not a known command
    UnknownCommand(u8),
    /// Payload ended before all fields were read
    Truncated,
    /// Payload carries bytes after the last field
    TrailingData,
}

/// Trigger parameters as they travel on the wire
///
/// Values are not range-checked here; the unit validates them against its
/// channel set and buffer capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerSetup {
    /// Source channel index
    pub source: u8,
    /// Level in raw converter counts
    pub level: u16,
    /// Edge selector byte (see [`TriggerEdge`])
    pub edge: u8,
    /// Samples per channel kept from before the trigger
    pub pretrigger: u16,
    /// Samples per channel captured after the trigger
    pub posttrigger: u32,
    /// Minimum time between two triggers (ms)
    pub holdoff_ms: u16,
    /// Re-arm automatically once a capture completes
    pub auto_rearm: bool,
}

impl TriggerSetup {
    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            source: reader.u8()?,
            level: reader.u16()?,
            edge: reader.u8()?,
            pretrigger: reader.u16()?,
            posttrigger: reader.u32()?,
            holdoff_ms: reader.u16()?,
            auto_rearm: reader.u8()? != 0,
        })
    }

    fn write(&self, writer: &mut PayloadWriter) -> Result<(), FrameError> {
        writer.u8(self.source)?;
        writer.u16(self.level)?;
        writer.u8(self.edge)?;
        writer.u16(self.pretrigger)?;
        writer.u32(self.posttrigger)?;
        writer.u16(self.holdoff_ms)?;
        writer.u8(self.auto_rearm as u8)
    }

    /// Decoded edge selector, if the byte is a known code
    pub fn edge(&self) -> Option<TriggerEdge> {
        TriggerEdge::from_byte(self.edge)
    }
}

/// Requests understood by the acquisition unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcCommand {
    /// List the enabled channel indices
    GetChannels,
    /// Reprogram the sample timer
    SetSampleRate { hz: u32 },
    /// Report the achieved sample rate
    GetSampleRate,
    /// Set the smoothing factor (permille)
    SetSmoothingFactor { permille: u16 },
    /// Latest raw sample per channel
    ReadRaw,
    /// Smoothed value per channel
    ReadSmoothed,
    /// Configure the trigger
    SetupTrigger(TriggerSetup),
    /// Arm the trigger; `sticky` sets auto-rearm unless it is 255
    Arm { sticky: u8 },
    /// Disarm and clear auto-rearm
    Disarm,
    /// Stop whatever is running and return to idle
    Abort,
    /// Fire the trigger manually
    ForceTrigger,
    /// Read back the trigger configuration
    GetTrigger,
    /// Capture a fixed number of samples per channel
    BlockCapture { count: u32 },
    /// Start unbounded streaming
    StreamStart,
    /// Stop streaming
    StreamStop,
    /// Report mode and buffer geometry
    GetStatus,
    /// Toggle smoothing
    SetSmoothingEnabled { enabled: bool },
}

impl AdcCommand {
    /// Parse a command from its code and payload
    pub fn parse(code: u8, payload: &[u8]) -> Result<Self, ParseError> {
        let mut reader = PayloadReader::new(payload);

        let command = match code {
            CMD_GET_CHANNELS => AdcCommand::GetChannels,
            CMD_SET_SAMPLE_RATE => AdcCommand::SetSampleRate { hz: reader.u32()? },
            CMD_GET_SAMPLE_RATE => AdcCommand::GetSampleRate,
            CMD_SET_SMOOTHING_FACTOR => AdcCommand::SetSmoothingFactor {
                permille: reader.u16()?,
            },
            CMD_READ_RAW => AdcCommand::ReadRaw,
            CMD_READ_SMOOTHED => AdcCommand::ReadSmoothed,
            CMD_SETUP_TRIGGER => AdcCommand::SetupTrigger(TriggerSetup::read(&mut reader)?),
            CMD_ARM => AdcCommand::Arm {
                sticky: reader.u8()?,
            },
            CMD_DISARM => AdcCommand::Disarm,
            CMD_ABORT => AdcCommand::Abort,
            CMD_FORCE_TRIGGER => AdcCommand::ForceTrigger,
            CMD_GET_TRIGGER => AdcCommand::GetTrigger,
            CMD_BLOCK_CAPTURE => AdcCommand::BlockCapture {
                count: reader.u32()?,
            },
            CMD_STREAM_START => AdcCommand::StreamStart,
            CMD_STREAM_STOP => AdcCommand::StreamStop,
            CMD_GET_STATUS => AdcCommand::GetStatus,
            CMD_SET_SMOOTHING_ENABLED => AdcCommand::SetSmoothingEnabled {
                enabled: reader.u8()? != 0,
            },
            other => return Err(ParseError::UnknownCommand(other)),
        };

        reader.finish()?;
        Ok(command)
    }

    /// Parse a command from a request frame
    pub fn from_frame(frame: &Frame) -> Result<Self, ParseError> {
        Self::parse(frame.msg_type, &frame.payload)
    }

    /// Wire code of this command
    pub fn code(&self) -> u8 {
        match self {
            AdcCommand::GetChannels => CMD_GET_CHANNELS,
            AdcCommand::SetSampleRate { .. } => CMD_SET_SAMPLE_RATE,
            AdcCommand::GetSampleRate => CMD_GET_SAMPLE_RATE,
            AdcCommand::SetSmoothingFactor { .. } => CMD_SET_SMOOTHING_FACTOR,
            AdcCommand::ReadRaw => CMD_READ_RAW,
            AdcCommand::ReadSmoothed => CMD_READ_SMOOTHED,
            AdcCommand::SetupTrigger(_) => CMD_SETUP_TRIGGER,
            AdcCommand::Arm { .. } => CMD_ARM,
            AdcCommand::Disarm => CMD_DISARM,
            AdcCommand::Abort => CMD_ABORT,
            AdcCommand::ForceTrigger => CMD_FORCE_TRIGGER,
            AdcCommand::GetTrigger => CMD_GET_TRIGGER,
            AdcCommand::BlockCapture { .. } => CMD_BLOCK_CAPTURE,
            AdcCommand::StreamStart => CMD_STREAM_START,
            AdcCommand::StreamStop => CMD_STREAM_STOP,
            AdcCommand::GetStatus => CMD_GET_STATUS,
            AdcCommand::SetSmoothingEnabled { .. } => CMD_SET_SMOOTHING_ENABLED,
        }
    }

    /// Encode this command into a request frame (host side and tests)
    pub fn to_frame(&self, id: u16) -> Result<Frame, FrameError> {
        let mut writer = PayloadWriter::new();
        match self {
            AdcCommand::SetSampleRate { hz } => writer.u32(*hz)?,
            AdcCommand::SetSmoothingFactor { permille } => writer.u16(*permille)?,
            AdcCommand::SetupTrigger(setup) => setup.write(&mut writer)?,
            AdcCommand::Arm { sticky } => writer.u8(*sticky)?,
            AdcCommand::BlockCapture { count } => writer.u32(*count)?,
            AdcCommand::SetSmoothingEnabled { enabled } => writer.u8(*enabled as u8)?,
            _ => {}
        }
        Frame::new(id, self.code(), writer.as_slice())
    }
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Empty success
    Ack,
    /// Enabled channel indices, ascending
    Channels(Vec<u8, MAX_CHANNELS>),
    /// Achieved sample rate
    SampleRate { hz: u32, hz_f: f32 },
    /// Raw samples in channel order
    Raw(Vec<u16, MAX_CHANNELS>),
    /// Smoothed values in channel order
    Smoothed(Vec<f32, MAX_CHANNELS>),
    /// Current trigger configuration
    Trigger(TriggerSetup),
    /// Mode and buffer geometry
    Status {
        opmode: u8,
        buffer_items: u32,
        pretrigger_capacity: u16,
        channel_count: u8,
    },
    /// The transaction continues as a capture stream; no reply now
    Streaming,
}

impl Response {
    /// Encode into a success frame for transaction `id`
    ///
    /// Returns `None` for [`Response::Streaming`], whose data arrives as
    /// capture messages on the same id.
    pub fn to_frame(&self, id: u16) -> Result<Option<Frame>, FrameError> {
        let mut writer = PayloadWriter::new();
        match self {
            Response::Ack => {}
            Response::Channels(channels) => writer.bytes(channels)?,
            Response::SampleRate { hz, hz_f } => {
                writer.u32(*hz)?;
                writer.f32(*hz_f)?;
            }
            Response::Raw(samples) => {
                for &sample in samples {
                    writer.u16(sample)?;
                }
            }
            Response::Smoothed(values) => {
                for &value in values {
                    writer.f32(value)?;
                }
            }
            Response::Trigger(setup) => setup.write(&mut writer)?,
            Response::Status {
                opmode,
                buffer_items,
                pretrigger_capacity,
                channel_count,
            } => {
                writer.u8(*opmode)?;
                writer.u32(*buffer_items)?;
                writer.u16(*pretrigger_capacity)?;
                writer.u8(*channel_count)?;
            }
            Response::Streaming => return Ok(None),
        }
        Frame::new(id, MSG_SUCCESS, writer.as_slice()).map(Some)
    }
}

/// Error reply carrying a single error code byte
pub fn error_frame(id: u16, code: u8) -> Frame {
    let mut frame = Frame::empty(id, MSG_ERROR);
    // One byte always fits
    let _ = frame.payload.push(code);
    frame
}

/// Little-endian field reader over a request payload
#[derive(Debug)]
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Create a reader at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let end = self.pos + N;
        let bytes = self.data.get(self.pos..end).ok_or(ParseError::Truncated)?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ParseError> {
        self.take().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, ParseError> {
        self.take().map(u32::from_le_bytes)
    }

    pub fn f32(&mut self) -> Result<f32, ParseError> {
        self.take().map(f32::from_le_bytes)
    }

    /// Fail if unread bytes remain
    pub fn finish(&self) -> Result<(), ParseError> {
        if self.pos == self.data.len() {
            Ok(())
        } else {
            Err(ParseError::TrailingData)
        }
    }
}

/// Little-endian field writer into a bounded payload
#[derive(Debug, Default)]
pub struct PayloadWriter {
    data: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.data
            .extend_from_slice(bytes)
            .map_err(|_| FrameError::PayloadTooLarge)
    }

    pub fn u8(&mut self, value: u8) -> Result<(), FrameError> {
        self.bytes(&[value])
    }

    pub fn u16(&mut self, value: u16) -> Result<(), FrameError> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u32(&mut self, value: u32) -> Result<(), FrameError> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn f32(&mut self, value: f32) -> Result<(), FrameError> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

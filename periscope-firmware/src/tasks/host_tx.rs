//! Host link transmit task
//!
//! The only writer of the host UART. Sends request replies and executes
//! report jobs queued by the converter interrupt.
//!
//! A report job is staged into RAM inside the engine's critical section, so
//! the samples it reads cannot be overwritten halfway through, and the
//! boundary it covers is released as soon as the copy is done. The UART
//! write then happens with interrupts enabled.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_stm32::usart::BufferedUartTx;
use embedded_io_async::Write;
use heapless::Vec;

use periscope_core::traits::ReportSink;
use periscope_core::ReportJob;
use periscope_hal_stm32f0::UartBusError;
use periscope_protocol::{Frame, FrameError, MultipartEncoder};

use crate::channels::{with_engine, REPLY_CHANNEL, REPORT_QUEUE};

/// Largest report message: a full-buffer pre-trigger window plus framing
pub const STAGING_SIZE: usize = 2 * 512 + 16;

/// Report message assembled in RAM
pub struct StagingSink {
    bytes: Vec<u8, STAGING_SIZE>,
    encoder: Option<MultipartEncoder>,
}

impl StagingSink {
    /// Create an empty staging area
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            encoder: None,
        }
    }

    /// Drop any staged message
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.encoder = None;
    }

    /// The staged frame
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn push(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.bytes
            .extend_from_slice(bytes)
            .map_err(|_| FrameError::BufferTooSmall)
    }
}

impl ReportSink for StagingSink {
    type Error = FrameError;

    fn begin(&mut self, id: u16, msg_type: u8, len: usize) -> Result<(), Self::Error> {
        self.clear();
        let (encoder, header) = MultipartEncoder::begin(id, msg_type, len)?;
        self.encoder = Some(encoder);
        self.push(&header)
    }

    fn payload(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.encoder
            .as_mut()
            .ok_or(FrameError::InvalidFrame)?
            .payload(bytes)?;
        self.push(bytes)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        let checksum = self
            .encoder
            .take()
            .ok_or(FrameError::InvalidFrame)?
            .close()?;
        self.push(&[checksum])
    }
}

/// Host TX task - sends replies and report messages
#[embassy_executor::task]
pub async fn host_tx_task(mut tx: BufferedUartTx<'static>) {
    info!("Host TX task started");

    let mut staging = StagingSink::new();

    loop {
        match select(REPLY_CHANNEL.receive(), REPORT_QUEUE.receive()).await {
            Either::First(frame) => send_reply(&mut tx, &frame).await,
            Either::Second(job) => {
                if stage(&mut staging, &job) {
                    if let Err(e) = tx.write_all(staging.as_slice()).await {
                        warn!("Failed to send report on {}: {:?}", job.session(), UartBusError::from(e));
                    }
                }
            }
        }
    }
}

/// Copy a job's message out of the capture buffer and release its boundary
fn stage(staging: &mut StagingSink, job: &ReportJob) -> bool {
    let staged = with_engine(|engine| {
        let result = match engine.layout().copied() {
            Some(layout) => job.execute(engine.samples(), &layout, staging),
            None => Err(FrameError::InvalidFrame),
        };
        engine.report_delivered(job);
        result
    });

    match staged {
        Some(Ok(())) => true,
        Some(Err(e)) => {
            warn!("Report on {} dropped: {:?}", job.session(), e);
            false
        }
        None => false,
    }
}

/// Send a request reply
async fn send_reply(tx: &mut BufferedUartTx<'static>, frame: &Frame) {
    match frame.encode_to_vec() {
        Ok(bytes) => {
            if let Err(e) = tx.write_all(&bytes).await {
                warn!("Failed to send reply {}: {:?}", frame.id, UartBusError::from(e));
            } else {
                trace!("Reply {} sent", frame.id);
            }
        }
        Err(e) => warn!("Failed to encode reply {}: {:?}", frame.id, e),
    }
}

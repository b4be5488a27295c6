//! Host link receive task
//!
//! Parses request frames from the host, dispatches them to the acquisition
//! unit and queues the reply for the transmitter.

use defmt::*;
use embassy_stm32::usart::BufferedUartRx;
use embedded_io_async::Read;

use periscope_core::traits::Unit;
use periscope_core::UnitError;
use periscope_hal_stm32f0::UartBusError;
use periscope_protocol::messages::error_frame;
use periscope_protocol::{Frame, FrameParser};

use crate::channels::{with_engine, REPLY_CHANNEL};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Host RX task - receives and dispatches request frames
#[embassy_executor::task]
pub async fn host_rx_task(mut rx: BufferedUartRx<'static>) {
    info!("Host RX task started");

    let mut parser = FrameParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                for &byte in &buf[..n] {
                    match parser.feed(byte) {
                        Ok(Some(frame)) => {
                            if let Some(reply) = dispatch(&frame) {
                                REPLY_CHANNEL.send(reply).await;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Frame parse error: {:?}", e);
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                let err = UartBusError::from(e);
                warn!("UART read error: {:?}", err);
                // A frame in progress is corrupt once bytes go missing
                if err.lost_bytes() {
                    parser.reset();
                }
            }
        }
    }
}

/// Run one request through the unit, returning the reply frame if any
fn dispatch(frame: &Frame) -> Option<Frame> {
    let outcome = with_engine(|engine| engine.handle_request(frame.id, frame.msg_type, &frame.payload))
        .unwrap_or(Err(UnitError::Busy));

    match outcome {
        Ok(response) => match response.to_frame(frame.id) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Reply for {} does not fit: {:?}", frame.id, e);
                Some(error_frame(frame.id, UnitError::Malformed.to_byte()))
            }
        },
        Err(e) => {
            debug!("Request {:#x} on {} failed: {:?}", frame.msg_type, frame.id, e);
            Some(error_frame(frame.id, e.to_byte()))
        }
    }
}

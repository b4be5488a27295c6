//! Report jobs
//!
//! Interrupt handlers describe what to send as small `Copy` values carrying
//! buffer offsets and lengths; the job consumer executes them against the
//! buffer and a [`ReportSink`]. Message payloads (little-endian):
//!
//! | Job | Type | Payload |
//! |---|---|---|
//! | trigger header | capture-start | `u32 serial, u8 edge, u16 pretrigger groups, u16 samples...` |
//! | chunk | capture-more, or capture-done when closing | `u32 serial, u16 samples...` |
//! | end of stream | capture-done | none |
//!
//! A closing chunk goes out as capture-done even when it carries samples.

use periscope_protocol::messages::{MSG_CAPTURE_DONE, MSG_CAPTURE_MORE, MSG_CAPTURE_START};
use periscope_protocol::TriggerEdge;

use super::buffer::{Boundary, BufferLayout};
use crate::traits::ReportSink;

/// Samples converted per sink write
const BATCH_SAMPLES: usize = 32;

/// A deferred report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportJob {
    /// First message of a triggered session, with the pre-trigger window
    TriggerHeader {
        /// Transaction id of the session
        session: u16,
        /// Always the session's first serial
        serial: u32,
        /// Edge that fired
        edge: TriggerEdge,
        /// Pre-trigger length in groups, triggering group included
        pretrigger: u16,
        /// Pre-trigger length in samples
        count: usize,
        /// Buffer position just past the triggering group (1..=items)
        end: usize,
    },
    /// Samples collected up to a half/full boundary
    Chunk {
        /// Transaction id of the session
        session: u16,
        /// Chunk serial
        serial: u32,
        /// First sample position
        start: usize,
        /// Number of samples, possibly zero on a closing chunk
        count: usize,
        /// Last chunk of the session
        close: bool,
        /// Boundary that produced the chunk
        boundary: Boundary,
    },
    /// Session ended without a closing chunk (stop, abort, emergency)
    StreamEnd {
        /// Transaction id of the session
        session: u16,
    },
}

impl ReportJob {
    /// Transaction id the job's message goes out on
    pub fn session(&self) -> u16 {
        match *self {
            ReportJob::TriggerHeader { session, .. }
            | ReportJob::Chunk { session, .. }
            | ReportJob::StreamEnd { session } => session,
        }
    }

    /// Boundary whose pending mark this job clears once delivered
    pub fn boundary(&self) -> Option<Boundary> {
        match *self {
            ReportJob::Chunk { boundary, .. } => Some(boundary),
            _ => None,
        }
    }

    /// Transport message type of the job
    pub fn msg_type(&self) -> u8 {
        match *self {
            ReportJob::TriggerHeader { .. } => MSG_CAPTURE_START,
            ReportJob::Chunk { close: false, .. } => MSG_CAPTURE_MORE,
            ReportJob::Chunk { close: true, .. } => MSG_CAPTURE_DONE,
            ReportJob::StreamEnd { .. } => MSG_CAPTURE_DONE,
        }
    }

    /// Send the job's message through `sink`, reading `samples`
    pub fn execute<S: ReportSink>(
        &self,
        samples: &[u16],
        layout: &BufferLayout,
        sink: &mut S,
    ) -> Result<(), S::Error> {
        match *self {
            ReportJob::TriggerHeader {
                session,
                serial,
                edge,
                pretrigger,
                count,
                end,
            } => {
                let start = (end + layout.items() - count) % layout.items();
                let [tail, head] = layout.split(start, count);

                sink.begin(session, self.msg_type(), 4 + 1 + 2 + 2 * count)?;
                sink.payload(&serial.to_le_bytes())?;
                sink.payload(&[edge.to_byte()])?;
                sink.payload(&pretrigger.to_le_bytes())?;
                send_samples(sink, &samples[tail])?;
                send_samples(sink, &samples[head])?;
                sink.close()
            }
            ReportJob::Chunk {
                session,
                serial,
                start,
                count,
                ..
            } => {
                let [first, second] = layout.split(start, count);

                sink.begin(session, self.msg_type(), 4 + 2 * count)?;
                sink.payload(&serial.to_le_bytes())?;
                send_samples(sink, &samples[first])?;
                send_samples(sink, &samples[second])?;
                sink.close()
            }
            ReportJob::StreamEnd { session } => {
                sink.begin(session, self.msg_type(), 0)?;
                sink.close()
            }
        }
    }
}

fn send_samples<S: ReportSink>(sink: &mut S, samples: &[u16]) -> Result<(), S::Error> {
    let mut batch = [0u8; 2 * BATCH_SAMPLES];
    for chunk in samples.chunks(BATCH_SAMPLES) {
        for (out, sample) in batch.chunks_exact_mut(2).zip(chunk) {
            out.copy_from_slice(&sample.to_le_bytes());
        }
        sink.payload(&batch[..2 * chunk.len()])?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use std::vec::Vec;

    fn ramp(items: usize) -> Vec<u16> {
        (0..items as u16).collect()
    }

    #[test]
    fn test_header_without_wrap() {
        let layout = BufferLayout::new(256, 2).unwrap();
        let samples = ramp(256);
        let mut sink = RecordingSink::default();

        let job = ReportJob::TriggerHeader {
            session: 9,
            serial: 0,
            edge: TriggerEdge::Rising,
            pretrigger: 3,
            count: 6,
            end: 40,
        };
        job.execute(&samples, &layout, &mut sink).unwrap();

        let message = &sink.messages[0];
        assert_eq!(message.id, 9);
        assert_eq!(message.msg_type, MSG_CAPTURE_START);
        assert_eq!(message.serial(), 0);
        assert_eq!(message.payload[4], TriggerEdge::Rising.to_byte());
        assert_eq!(&message.payload[5..7], &3u16.to_le_bytes());
        assert_eq!(message.samples(7), [34, 35, 36, 37, 38, 39]);
    }

    #[test]
    fn test_header_wraps_tail_first() {
        let layout = BufferLayout::new(256, 2).unwrap();
        let samples = ramp(256);
        let mut sink = RecordingSink::default();

        let job = ReportJob::TriggerHeader {
            session: 1,
            serial: 0,
            edge: TriggerEdge::Manual,
            pretrigger: 3,
            count: 6,
            end: 2,
        };
        job.execute(&samples, &layout, &mut sink).unwrap();
        assert_eq!(sink.messages[0].samples(7), [252, 253, 254, 255, 0, 1]);
    }

    #[test]
    fn test_chunk_types() {
        let layout = BufferLayout::new(256, 2).unwrap();
        let samples = ramp(256);
        let mut sink = RecordingSink::default();

        let more = ReportJob::Chunk {
            session: 2,
            serial: 1,
            start: 128,
            count: 100,
            close: false,
            boundary: Boundary::Full,
        };
        let done = ReportJob::Chunk {
            session: 2,
            serial: 2,
            start: 0,
            count: 4,
            close: true,
            boundary: Boundary::Half,
        };
        more.execute(&samples, &layout, &mut sink).unwrap();
        done.execute(&samples, &layout, &mut sink).unwrap();

        assert_eq!(sink.messages[0].msg_type, MSG_CAPTURE_MORE);
        assert_eq!(sink.messages[0].samples(4).len(), 100);
        assert_eq!(sink.messages[0].samples(4)[99], 227);
        // Data-carrying final chunk still reports done
        assert_eq!(sink.messages[1].msg_type, MSG_CAPTURE_DONE);
        assert_eq!(sink.messages[1].serial(), 2);
        assert_eq!(sink.messages[1].samples(4), [0, 1, 2, 3]);
    }

    #[test]
    fn test_stream_end_is_empty_done() {
        let layout = BufferLayout::new(256, 2).unwrap();
        let mut sink = RecordingSink::default();

        let job = ReportJob::StreamEnd { session: 5 };
        job.execute(&ramp(256), &layout, &mut sink).unwrap();

        assert_eq!(sink.messages[0].msg_type, MSG_CAPTURE_DONE);
        assert!(sink.messages[0].payload.is_empty());
        assert_eq!(job.boundary(), None);
    }
}

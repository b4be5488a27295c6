//! Capture session bookkeeping
//!
//! A session exists from the moment a capture opens until its closing chunk
//! has been queued. It numbers the chunks it produces and tracks where in the
//! buffer the next chunk starts.

/// What opened the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionKind {
    /// Trigger fire, closes after the post-trigger count
    Triggered,
    /// Block capture request, closes after the requested count
    Block,
    /// Stream request, runs until stopped
    Stream,
}

/// The live capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureSession {
    /// Transaction id the capture messages go out on
    pub id: u16,
    /// Session kind
    pub kind: SessionKind,
    /// Buffer position where the next chunk starts
    pub cursor: usize,
    next_serial: u32,
    remaining: u64,
}

impl CaptureSession {
    /// Open a session collecting `samples` samples from `cursor`
    ///
    /// `samples` is ignored for streams.
    pub fn open(id: u16, kind: SessionKind, cursor: usize, samples: u64) -> Self {
        Self {
            id,
            kind,
            cursor,
            next_serial: 0,
            remaining: samples,
        }
    }

    /// Hand out the next chunk serial
    pub fn next_serial(&mut self) -> u32 {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        serial
    }

    /// Claim up to `available` samples for the next chunk
    pub fn take(&mut self, available: usize) -> usize {
        if self.kind == SessionKind::Stream {
            return available;
        }
        let taken = (available as u64).min(self.remaining);
        self.remaining -= taken;
        taken as usize
    }

    /// Returns true once a bounded session has collected everything
    pub fn is_finished(&self) -> bool {
        self.kind != SessionKind::Stream && self.remaining == 0
    }
}

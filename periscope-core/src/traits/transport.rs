//! Multipart transport send
//!
//! Only the job consumer talks to the transport. A message is opened with
//! its total payload length, fed in any number of pieces and closed.

/// Sink for host-bound report messages
pub trait ReportSink {
    /// Error type for send operations
    type Error;

    /// Open a message of `len` payload bytes on transaction `id`
    fn begin(&mut self, id: u16, msg_type: u8, len: usize) -> Result<(), Self::Error>;

    /// Send the next piece of payload
    fn payload(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Finish the message
    fn close(&mut self) -> Result<(), Self::Error>;
}

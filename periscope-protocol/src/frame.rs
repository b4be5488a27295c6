//! Frame encoding and decoding for the host link.
//!
//! Frame format:
//! - START (1 byte): 0xA5 synchronization byte
//! - ID (2 bytes, LE): transaction identifier, echoed by replies
//! - LENGTH (2 bytes, LE): payload length
//! - TYPE (1 byte): command code or message type
//! - PAYLOAD (LENGTH bytes): type-specific data
//! - CHECKSUM (1 byte): XOR of ID, LENGTH, TYPE and all PAYLOAD bytes

use heapless::Vec;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xA5;

/// Bytes preceding the payload (START + ID + LENGTH + TYPE)
pub const HEADER_SIZE: usize = 1 + 2 + 2 + 1;

/// Maximum payload size of a buffered [`Frame`]
///
/// Requests and plain replies are small. Capture data never goes through
/// [`Frame`]; it is written with [`MultipartEncoder`].
pub const MAX_PAYLOAD_SIZE: usize = 256;

/// Maximum complete size of a buffered frame
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + 1;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    InvalidChecksum,
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Invalid frame structure
    InvalidFrame,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Transaction identifier
    pub id: u16,
    /// Message type identifier
    pub msg_type: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given id, message type and payload
    pub fn new(id: u16, msg_type: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            id,
            msg_type,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(id: u16, msg_type: u8) -> Self {
        Self {
            id,
            msg_type,
            payload: Vec::new(),
        }
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = HEADER_SIZE + self.payload.len() + 1;
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let (mut encoder, header) = MultipartEncoder::begin(self.id, self.msg_type, self.payload.len())?;
        encoder.payload(&self.payload)?;
        let checksum = encoder.close()?;

        buffer[..HEADER_SIZE].copy_from_slice(&header);
        buffer[HEADER_SIZE..HEADER_SIZE + self.payload.len()].copy_from_slice(&self.payload);
        buffer[frame_len - 1] = checksum;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Incremental frame writer for payloads that are produced in pieces
///
/// The total length is fixed by [`MultipartEncoder::begin`]; every piece
/// passed to [`MultipartEncoder::payload`] is folded into the checksum, and
/// [`MultipartEncoder::close`] refuses to finish a frame whose declared
/// length was not delivered exactly.
#[derive(Debug, Clone)]
pub struct MultipartEncoder {
    checksum: u8,
    remaining: usize,
}

impl MultipartEncoder {
    /// Start a frame, returning the encoder and the header bytes to send
    pub fn begin(id: u16, msg_type: u8, len: usize) -> Result<(Self, [u8; HEADER_SIZE]), FrameError> {
        if len > u16::MAX as usize {
            return Err(FrameError::PayloadTooLarge);
        }

        let id_bytes = id.to_le_bytes();
        let len_bytes = (len as u16).to_le_bytes();
        let header = [
            FRAME_START,
            id_bytes[0],
            id_bytes[1],
            len_bytes[0],
            len_bytes[1],
            msg_type,
        ];
        let checksum = header[1..].iter().fold(0u8, |acc, b| acc ^ b);

        Ok((
            Self {
                checksum,
                remaining: len,
            },
            header,
        ))
    }

    /// Account for a piece of payload about to be sent
    pub fn payload(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        if bytes.len() > self.remaining {
            return Err(FrameError::PayloadTooLarge);
        }
        self.remaining -= bytes.len();
        for &byte in bytes {
            self.checksum ^= byte;
        }
        Ok(())
    }

    /// Payload bytes still owed before the frame can be closed
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Finish the frame, returning the trailing checksum byte
    pub fn close(self) -> Result<u8, FrameError> {
        if self.remaining != 0 {
            return Err(FrameError::Incomplete);
        }
        Ok(self.checksum)
    }
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    id: u16,
    expected_length: u16,
    msg_type: u8,
    checksum: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for START byte
    WaitingForStart,
    /// Got START, waiting for ID low byte
    WaitingForIdLow,
    /// Waiting for ID high byte
    WaitingForIdHigh,
    /// Waiting for LENGTH low byte
    WaitingForLengthLow,
    /// Waiting for LENGTH high byte
    WaitingForLengthHigh,
    /// Got LENGTH, waiting for TYPE
    WaitingForType,
    /// Reading payload bytes
    ReadingPayload,
    /// Waiting for CHECKSUM
    WaitingForChecksum,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForStart,
            buffer: Vec::new(),
            id: 0,
            expected_length: 0,
            msg_type: 0,
            checksum: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForStart;
        self.buffer.clear();
        self.id = 0;
        self.expected_length = 0;
        self.msg_type = 0;
        self.checksum = 0;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on parse error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        if !matches!(
            self.state,
            ParseState::WaitingForStart | ParseState::WaitingForChecksum
        ) {
            self.checksum ^= byte;
        }

        match self.state {
            ParseState::WaitingForStart => {
                if byte == FRAME_START {
                    self.state = ParseState::WaitingForIdLow;
                }
                // Silently ignore non-START bytes while waiting
                Ok(None)
            }
            ParseState::WaitingForIdLow => {
                self.id = byte as u16;
                self.state = ParseState::WaitingForIdHigh;
                Ok(None)
            }
            ParseState::WaitingForIdHigh => {
                self.id |= (byte as u16) << 8;
                self.state = ParseState::WaitingForLengthLow;
                Ok(None)
            }
            ParseState::WaitingForLengthLow => {
                self.expected_length = byte as u16;
                self.state = ParseState::WaitingForLengthHigh;
                Ok(None)
            }
            ParseState::WaitingForLengthHigh => {
                self.expected_length |= (byte as u16) << 8;
                if self.expected_length as usize > MAX_PAYLOAD_SIZE {
                    self.reset();
                    return Err(FrameError::InvalidFrame);
                }
                self.state = ParseState::WaitingForType;
                Ok(None)
            }
            ParseState::WaitingForType => {
                self.msg_type = byte;
                self.buffer.clear();
                if self.expected_length == 0 {
                    self.state = ParseState::WaitingForChecksum;
                } else {
                    self.state = ParseState::ReadingPayload;
                }
                Ok(None)
            }
            ParseState::ReadingPayload => {
                // Cannot fail, expected_length was bounded above
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_length as usize {
                    self.state = ParseState::WaitingForChecksum;
                }
                Ok(None)
            }
            ParseState::WaitingForChecksum => {
                if byte != self.checksum {
                    self.reset();
                    return Err(FrameError::InvalidChecksum);
                }

                let frame = Frame {
                    id: self.id,
                    msg_type: self.msg_type,
                    payload: self.buffer.clone(),
                };

                self.reset();
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_frame_encode_empty_payload() {
        let frame = Frame::empty(0x0102, 0x00);
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 7);
        assert_eq!(buffer[0], FRAME_START);
        assert_eq!(&buffer[1..3], &[0x02, 0x01]); // id LE
        assert_eq!(&buffer[3..5], &[0, 0]); // length
        assert_eq!(buffer[5], 0x00); // type
        assert_eq!(buffer[6], 0x02 ^ 0x01); // checksum
    }

    #[test]
    fn test_frame_encode_with_payload() {
        let frame = Frame::new(7, 0x01, &[0x10, 0x20, 0x30]).unwrap();
        let mut buffer = [0u8; 20];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, HEADER_SIZE + 3 + 1);
        assert_eq!(&buffer[3..5], &[3, 0]);
        assert_eq!(&buffer[HEADER_SIZE..HEADER_SIZE + 3], &[0x10, 0x20, 0x30]);
        assert_eq!(buffer[len - 1], 7 ^ 3 ^ 0x01 ^ 0x10 ^ 0x20 ^ 0x30);
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::new(0xBEEF, 0x10, &[1, 2, 3, 4, 5]).unwrap();
        let encoded = original.encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&encoded).unwrap().unwrap();

        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parser_invalid_checksum() {
        let frame = Frame::empty(3, 0x20);
        let mut encoded = frame.encode_to_vec().unwrap();
        // Corrupt the checksum
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0xFF;

        let mut parser = FrameParser::new();
        let result = parser.feed_bytes(&encoded);
        assert_eq!(result, Err(FrameError::InvalidChecksum));
    }

    #[test]
    fn test_parser_rejects_oversized_length() {
        let mut parser = FrameParser::new();
        let len = (MAX_PAYLOAD_SIZE as u16 + 1).to_le_bytes();
        let result = parser.feed_bytes(&[FRAME_START, 0, 0, len[0], len[1]]);
        assert_eq!(result, Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        let frame = Frame::empty(9, 0x24);
        let encoded = frame.encode_to_vec().unwrap();

        // Prepend garbage bytes
        let mut data = Vec::<u8, 20>::new();
        data.extend_from_slice(&[0x00, 0xFF, 0x12, 0x34]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&data).unwrap().unwrap();

        assert_eq!(parsed.msg_type, 0x24);
        assert_eq!(parsed.id, 9);
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let result = Frame::new(0, 0x21, &large_payload);
        assert_eq!(result, Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_multipart_matches_single_frame() {
        let payload = [9u8, 8, 7, 6, 5, 4];
        let single = Frame::new(42, 0x51, &payload).unwrap().encode_to_vec().unwrap();

        let (mut encoder, header) = MultipartEncoder::begin(42, 0x51, payload.len()).unwrap();
        encoder.payload(&payload[..2]).unwrap();
        encoder.payload(&payload[2..]).unwrap();
        let checksum = encoder.close().unwrap();

        assert_eq!(&single[..HEADER_SIZE], &header);
        assert_eq!(single[single.len() - 1], checksum);
    }

    #[test]
    fn test_multipart_rejects_short_and_long_payloads() {
        let (mut encoder, _) = MultipartEncoder::begin(1, 0x51, 4).unwrap();
        encoder.payload(&[1, 2]).unwrap();
        assert_eq!(encoder.remaining(), 2);
        assert_eq!(encoder.payload(&[1, 2, 3]), Err(FrameError::PayloadTooLarge));
        assert_eq!(encoder.close(), Err(FrameError::Incomplete));

        assert!(MultipartEncoder::begin(1, 0x51, u16::MAX as usize + 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_parser_accepts_any_encoded_frame(
            id in any::<u16>(),
            msg_type in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..MAX_PAYLOAD_SIZE),
        ) {
            let frame = Frame::new(id, msg_type, &payload).unwrap();
            let encoded = frame.encode_to_vec().unwrap();
            let mut parser = FrameParser::new();
            let parsed = parser.feed_bytes(&encoded).unwrap();
            prop_assert_eq!(parsed, Some(frame));
        }
    }
}

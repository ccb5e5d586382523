use crate::prelude::*;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Every frame starts its payload with this marker byte.
pub const LEAD: u8 = 0xFF;

/// One MK3 frame as it appears on the wire, minus the length and checksum
/// bookkeeping: `[length] [payload...] [checksum]`, where the payload begins
/// with the 0xFF lead byte and `length` counts the payload bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub length: u8,
    pub payload: Vec<u8>,
    pub checksum: u8,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({}:{})", self.length, hex::encode(&self.payload))
    }
}

impl Frame {
    /// Wraps a command in a full wire frame. The checksum balances the whole
    /// frame to zero mod 256.
    pub fn command(command: &[u8]) -> Vec<u8> {
        let length = command.len() as u8 + 1;

        let mut frame = Vec::with_capacity(command.len() + 3);
        frame.push(length);
        frame.push(LEAD);
        frame.extend_from_slice(command);

        let sum = frame.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        frame.push(0u8.wrapping_sub(sum));

        frame
    }

    /// The converter announces its firmware version unprompted. These frames
    /// arrive interleaved with replies and have to be skipped.
    pub fn is_version_broadcast(&self) -> bool {
        matches!(self.payload.as_slice(), [LEAD, b'V', ..])
    }
}

#[derive(Default)]
pub struct FrameDecoder {}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {}
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // length byte + payload + checksum
        let total = src[0] as usize + 2;
        if src.len() < total {
            return Ok(None);
        }

        let raw = src.split_to(total);

        let sum = raw.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != 0 {
            return Err(Error::Checksum {
                frame: hex::encode(&raw),
            });
        }

        Ok(Some(Frame {
            length: raw[0],
            payload: raw[1..total - 1].to_vec(),
            checksum: raw[total - 1],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_balances_to_zero() {
        let bytes = Frame::command(&[b'A', 0x01, 0x00]);
        assert_eq!(bytes[0], 4);
        assert_eq!(bytes[1], LEAD);

        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, 0);
    }

    #[test]
    fn command_round_trips() {
        let bytes = Frame::command(&[b'W', 0x36, 0x04, 0x00]);

        let mut buffer = BytesMut::from(&bytes[..]);
        let frame = FrameDecoder::new().decode(&mut buffer).unwrap().unwrap();

        assert_eq!(frame.length, 5);
        assert_eq!(frame.payload, vec![LEAD, b'W', 0x36, 0x04, 0x00]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn decode_waits_for_a_full_frame() {
        let bytes = Frame::command(&[b'F', 0x01]);

        let mut decoder = FrameDecoder::new();
        let mut buffer = BytesMut::new();

        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(&bytes[..2]);
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(&bytes[2..]);
        assert!(decoder.decode(&mut buffer).unwrap().is_some());
    }

    #[test]
    fn corrupted_payload_fails_the_checksum() {
        let mut bytes = Frame::command(&[b'W', 0x36, 0x02, 0x00]);
        bytes[3] ^= 0x01;

        let mut buffer = BytesMut::from(&bytes[..]);
        let result = FrameDecoder::new().decode(&mut buffer);

        assert!(matches!(result, Err(Error::Checksum { .. })));
        // the corrupt bytes must be consumed, not left to poison the next read
        assert!(buffer.is_empty());
    }

    #[test]
    fn shortened_length_byte_fails_the_checksum() {
        // a length byte smaller than the real payload makes the checksum
        // land mid-frame
        let mut bytes = Frame::command(&[b'V', 0x93]);
        bytes[0] -= 1;

        let mut buffer = BytesMut::from(&bytes[..]);
        let result = FrameDecoder::new().decode(&mut buffer);

        assert!(matches!(result, Err(Error::Checksum { .. })));
    }

    #[test]
    fn version_broadcasts_are_recognised() {
        let version = Frame {
            length: 7,
            payload: vec![LEAD, b'V', 0x93, 0x41, 0x0E, 0x00, 0x00],
            checksum: 0,
        };
        assert!(version.is_version_broadcast());

        let reply = Frame {
            length: 3,
            payload: vec![LEAD, b'A', 0x00],
            checksum: 0,
        };
        assert!(!reply.is_version_broadcast());
    }
}

//! Length frame sent after the READY handshake.

use byteorder::{BigEndian, ByteOrder};

use super::constants::LENGTH_FRAME_SIZE;

/// Encode the payload length as a 4-byte big-endian frame.
pub fn encode_length(total_bytes: u32) -> [u8; LENGTH_FRAME_SIZE] {
    let mut frame = [0u8; LENGTH_FRAME_SIZE];
    BigEndian::write_u32(&mut frame, total_bytes);
    frame
}

/// Decode a length frame. Returns `None` unless exactly four bytes are given.
pub fn decode_length(frame: &[u8]) -> Option<u32> {
    if frame.len() != LENGTH_FRAME_SIZE {
        return None;
    }
    Some(BigEndian::read_u32(frame))
}

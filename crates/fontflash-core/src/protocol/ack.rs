//! Single-byte acknowledgement parsing.
//!
//! The receiver answers the length frame and every block with exactly one
//! byte. Only `'A'` is positive; anything else, or silence, is a rejection.

use std::fmt;

use super::constants::ACK_BYTE;

/// Acknowledgement read from the device.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Positive acknowledgement (`'A'`).
    Accepted,
    /// Any other byte.
    Rejected(u8),
    /// Nothing arrived before the read timeout.
    Missing,
}

impl Ack {
    /// Classify the bytes returned by a one-byte read.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match bytes.first() {
            Some(&ACK_BYTE) => Ack::Accepted,
            Some(&other) => Ack::Rejected(other),
            None => Ack::Missing,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Ack::Accepted)
    }

    /// The raw response byte, if one arrived.
    pub fn response(&self) -> Option<u8> {
        match self {
            Ack::Accepted => Some(ACK_BYTE),
            Ack::Rejected(b) => Some(*b),
            Ack::Missing => None,
        }
    }
}

impl fmt::Debug for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::Accepted => write!(f, "Ack(0x41 'A')"),
            Ack::Rejected(b) => write!(f, "Ack(0x{:02X} '{}')", b, printable(*b)),
            Ack::Missing => write!(f, "Ack(<timeout>)"),
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::Accepted => write!(f, "A"),
            Ack::Rejected(b) => write!(f, "0x{:02X}", b),
            Ack::Missing => write!(f, "timeout"),
        }
    }
}

fn printable(b: u8) -> char {
    if b.is_ascii_graphic() || b == b' ' {
        b as char
    } else {
        '.'
    }
}

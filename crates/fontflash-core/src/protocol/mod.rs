//! Protocol module - wire-level definitions for the font flashing handshake.

pub mod ack;
pub mod constants;
pub mod frame;

pub use ack::Ack;
pub use constants::*;
pub use frame::{decode_length, encode_length};

//! Protocol constants shared with the receiving firmware.
//!
//! The block size is a deployment contract: it must equal the size of the
//! receiver's staging buffer (`FONT_PROGRAMMER_BUFFER_SIZE` on the device).

// ============================================================================
// Handshake Tokens (Device -> Host, ASCII lines)
// ============================================================================

/// Device is listening and ready to receive the payload length.
pub const TOKEN_READY: &str = "READY";

/// Target flash region has been erased.
pub const TOKEN_ERASE_DONE: &str = "ERASE_DONE";

/// Programming finished. Matched as a substring of the received line.
pub const TOKEN_DONE: &str = "DONE";

// ============================================================================
// Acknowledgement Bytes (Device -> Host)
// ============================================================================

/// Positive acknowledgement, ASCII 'A'.
pub const ACK_BYTE: u8 = b'A';

// ============================================================================
// Size Constants
// ============================================================================

/// Default transfer block size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Size of the big-endian length frame sent after READY.
pub const LENGTH_FRAME_SIZE: usize = 4;

/// Emit a progress event every this many blocks (and on the last one).
pub const PROGRESS_EVERY_BLOCKS: usize = 10;

// ============================================================================
// Timing (milliseconds)
// ============================================================================

pub const READY_TIMEOUT_MS: u64 = 5_000;
pub const ACK_TIMEOUT_MS: u64 = 3_000;
pub const ERASE_TIMEOUT_MS: u64 = 10_000;
pub const COMPLETION_TIMEOUT_MS: u64 = 5_000;

/// Settle time after each block ACK so the receiver can commit the block to flash.
pub const POST_ACK_DELAY_MS: u64 = 2;

// ============================================================================
// Serial Defaults
// ============================================================================

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM7";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

//! Transfer error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::Ack;
use crate::state::FailureReason;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Cannot open serial port {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: TransportError,
    },

    #[error("Input file not found: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("Cannot read input file {}: {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Payload of {0} bytes does not fit the 32-bit length frame")]
    PayloadTooLarge(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No READY signal received within {timeout_ms}ms")]
    NoReadySignal { timeout_ms: u64 },

    #[error("Length not acknowledged (response: {response})")]
    LengthAckRejected { response: Ack },

    #[error("Flash erase not completed within {timeout_ms}ms")]
    EraseTimeout { timeout_ms: u64 },

    #[error("Block {block_index} not acknowledged (response: {response})")]
    BlockAckRejected { block_index: usize, response: Ack },

    #[error("No DONE signal received after {bytes_sent} bytes (data may still be valid)")]
    NoCompletionSignal { bytes_sent: usize },

    #[error("Write failed: {0}")]
    WriteFailure(#[source] TransportError),

    #[error("Read failed: {0}")]
    ReadFailure(#[source] TransportError),
}

impl TransferError {
    /// True when every block was acknowledged and only the final handshake
    /// is missing, so the device may well hold the complete payload.
    pub fn data_possibly_valid(&self) -> bool {
        matches!(self, TransferError::NoCompletionSignal { .. })
    }

    /// The session failure state this error corresponds to, for errors
    /// raised by the protocol itself.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            TransferError::NoReadySignal { .. } => Some(FailureReason::NoReadySignal),
            TransferError::LengthAckRejected { .. } => Some(FailureReason::LengthAckRejected),
            TransferError::EraseTimeout { .. } => Some(FailureReason::EraseTimeout),
            TransferError::BlockAckRejected { block_index, .. } => {
                Some(FailureReason::BlockAckRejected {
                    block_index: *block_index,
                })
            }
            TransferError::NoCompletionSignal { .. } => Some(FailureReason::NoCompletionSignal),
            TransferError::WriteFailure(_) => Some(FailureReason::WriteFailure),
            TransferError::ReadFailure(_) => Some(FailureReason::ReadFailure),
            _ => None,
        }
    }
}

//! Per-invocation transfer state.

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;

/// Why a session ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NoReadySignal,
    WriteFailure,
    ReadFailure,
    LengthAckRejected,
    EraseTimeout,
    BlockAckRejected { block_index: usize },
    /// Every block was acknowledged but the final DONE never came.
    NoCompletionSignal,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoReadySignal => write!(f, "NO_READY_SIGNAL"),
            FailureReason::WriteFailure => write!(f, "WRITE_FAILURE"),
            FailureReason::ReadFailure => write!(f, "READ_FAILURE"),
            FailureReason::LengthAckRejected => write!(f, "LENGTH_ACK_REJECTED"),
            FailureReason::EraseTimeout => write!(f, "ERASE_TIMEOUT"),
            FailureReason::BlockAckRejected { block_index } => {
                write!(f, "BLOCK_ACK_REJECTED({})", block_index)
            }
            FailureReason::NoCompletionSignal => write!(f, "NO_COMPLETION_SIGNAL"),
        }
    }
}

/// Protocol state of a transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingReady,
    LengthSent,
    AwaitingLengthAck,
    AwaitingEraseDone,
    SendingBlocks,
    AwaitingBlockAck {
        block_index: usize,
    },
    AwaitingCompletion,
    Succeeded,
    Failed(FailureReason),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::AwaitingReady => write!(f, "AWAITING_READY"),
            SessionState::LengthSent => write!(f, "LENGTH_SENT"),
            SessionState::AwaitingLengthAck => write!(f, "AWAITING_LENGTH_ACK"),
            SessionState::AwaitingEraseDone => write!(f, "AWAITING_ERASE_DONE"),
            SessionState::SendingBlocks => write!(f, "SENDING_BLOCKS"),
            SessionState::AwaitingBlockAck { block_index } => {
                write!(f, "AWAITING_BLOCK_ACK({})", block_index)
            }
            SessionState::AwaitingCompletion => write!(f, "AWAITING_COMPLETION"),
            SessionState::Succeeded => write!(f, "SUCCEEDED"),
            SessionState::Failed(reason) => write!(f, "FAILED({})", reason),
        }
    }
}

impl SessionState {
    /// `Succeeded` and `Failed` end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed(_))
    }
}

/// One transfer of a payload, created per invocation.
#[derive(Debug)]
pub struct TransferSession<'a> {
    payload: &'a [u8],
    block_size: usize,
    bytes_sent: usize,
    state: SessionState,
}

impl<'a> TransferSession<'a> {
    pub fn new(payload: &'a [u8], block_size: NonZeroUsize) -> Self {
        Self {
            payload,
            block_size: block_size.get(),
            bytes_sent: 0,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn total_bytes(&self) -> usize {
        self.payload.len()
    }

    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// `ceil(total_bytes / block_size)`; zero for an empty payload.
    pub fn total_blocks(&self) -> usize {
        self.total_bytes().div_ceil(self.block_size)
    }

    /// Byte range of block `index` within the payload.
    pub fn block_range(&self, index: usize) -> Range<usize> {
        let start = (index * self.block_size).min(self.total_bytes());
        let end = ((index + 1) * self.block_size).min(self.total_bytes());
        start..end
    }

    pub fn block(&self, index: usize) -> &'a [u8] {
        &self.payload[self.block_range(index)]
    }

    pub fn is_last_block(&self, index: usize) -> bool {
        index + 1 == self.total_blocks()
    }

    /// Transition to a new state.
    pub fn goto_state(&mut self, new_state: SessionState) {
        tracing::info!(from = %self.state, to = %new_state, "State transition");
        self.state = new_state;
    }

    /// Block `index` is on the wire; wait for its acknowledgement.
    ///
    /// Per-block transitions are logged at trace level only.
    pub fn await_block_ack(&mut self, index: usize) {
        tracing::trace!(block = index, "Awaiting block ACK");
        self.state = SessionState::AwaitingBlockAck { block_index: index };
    }

    /// Back to `SendingBlocks` for the next block.
    pub fn resume_sending(&mut self) {
        self.state = SessionState::SendingBlocks;
    }

    pub fn fail(&mut self, reason: FailureReason) {
        self.goto_state(SessionState::Failed(reason));
    }

    /// Account for a positively acknowledged block.
    ///
    /// `bytes_sent` only ever moves forward, to the end of the block.
    pub fn record_block_ack(&mut self, index: usize) {
        let end = self.block_range(index).end;
        debug_assert!(end >= self.bytes_sent, "bytes_sent must not decrease");
        self.bytes_sent = self.bytes_sent.max(end);
    }
}

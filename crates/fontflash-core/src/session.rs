//! Flash Session - drives the READY / length / erase / blocks / DONE sequence.
//!
//! The protocol is strictly lock-step: nothing is sent until the previous
//! unit has been acknowledged, and every wait is bounded by a deadline.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::config::FlashConfig;
use crate::error::TransferError;
use crate::events::{FlashEvent, FlashObserver, LogLevel, PacketDirection, TracingObserver};
use crate::protocol::constants::{PROGRESS_EVERY_BLOCKS, TOKEN_DONE, TOKEN_ERASE_DONE, TOKEN_READY};
use crate::protocol::{Ack, encode_length};
use crate::state::{SessionState, TransferSession};
use crate::transport::{ChannelGuard, SerialChannel, SerialPortChannel, TransportError};

/// Line the host is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// The whole (trimmed) line must equal the token.
    Exact(&'a str),
    /// The line must contain the token.
    Contains(&'a str),
}

impl Token<'_> {
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Token::Exact(token) => line == *token,
            Token::Contains(token) => line.contains(token),
        }
    }
}

/// Read lines until one matches `token` or `timeout` elapses.
///
/// Returns the matching line, or `None` at the deadline. Non-empty lines
/// that do not match are handed to `on_other`.
pub fn await_token<C: SerialChannel + ?Sized>(
    channel: &mut C,
    token: Token<'_>,
    timeout: Duration,
    mut on_other: impl FnMut(&str),
) -> Result<Option<String>, TransferError> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        match channel
            .read_line(remaining)
            .map_err(TransferError::ReadFailure)?
        {
            Some(line) if token.matches(&line) => return Ok(Some(line)),
            Some(line) if !line.is_empty() => on_other(&line),
            _ => {}
        }
    }
}

/// Summary of a confirmed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub total_bytes: usize,
    pub bytes_sent: usize,
    pub blocks_sent: usize,
    pub elapsed: Duration,
}

impl TransferReport {
    pub fn bytes_per_sec(&self) -> u64 {
        let millis = self.elapsed.as_millis().max(1) as u64;
        self.total_bytes as u64 * 1000 / millis
    }
}

/// Flash Session - owns the configuration and the observer, and runs one
/// transfer per call.
pub struct FlashSession<O: FlashObserver> {
    config: FlashConfig,
    observer: Arc<O>,
}

impl FlashSession<TracingObserver> {
    /// Create a new session with default tracing observer.
    pub fn new(config: FlashConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }
}

impl<O: FlashObserver + 'static> FlashSession<O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(config: FlashConfig, observer: Arc<O>) -> Self {
        Self { config, observer }
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Read the font binary from the configured input path.
    fn load_payload(&self) -> Result<Vec<u8>, TransferError> {
        let path: &Path = &self.config.input;
        if !path.exists() {
            return Err(TransferError::InputMissing(path.to_path_buf()));
        }
        info!(path = %path.display(), "Loading font binary");
        std::fs::read(path).map_err(|source| TransferError::InputUnreadable {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the payload, open the serial port and transfer.
    #[instrument(skip(self), fields(port = %self.config.port, baud = self.config.baud_rate))]
    pub fn run(&self) -> Result<TransferReport, TransferError> {
        let payload = self.load_payload()?;
        self.log(LogLevel::Info, format!("File size: {} bytes", payload.len()));

        let channel = SerialPortChannel::open(&self.config.port, self.config.baud_rate)
            .map_err(|source| TransferError::Connection {
                port: self.config.port.clone(),
                source,
            })?;
        self.observer.on_event(&FlashEvent::Connected {
            port: self.config.port.clone(),
            baud_rate: self.config.baud_rate,
        });

        self.transfer(channel, &payload)
    }

    /// Run the protocol over `channel`. The channel is closed before this
    /// returns, whatever the outcome.
    pub fn transfer<C: SerialChannel>(
        &self,
        channel: C,
        payload: &[u8],
    ) -> Result<TransferReport, TransferError> {
        let block_size = NonZeroUsize::new(self.config.block_size)
            .ok_or_else(|| TransferError::InvalidConfig("block size must be non-zero".into()))?;
        let total_bytes =
            u32::try_from(payload.len()).map_err(|_| TransferError::PayloadTooLarge(payload.len()))?;

        let mut channel = ChannelGuard::new(ObservableChannel {
            inner: channel,
            observer: self.observer.as_ref(),
        });
        let mut session = TransferSession::new(payload, block_size);
        let started = Instant::now();

        match self.drive(&mut *channel, &mut session, total_bytes) {
            Ok(()) => {
                self.observer.on_event(&FlashEvent::Complete);
                Ok(TransferReport {
                    total_bytes: session.total_bytes(),
                    bytes_sent: session.bytes_sent(),
                    blocks_sent: session.total_blocks(),
                    elapsed: started.elapsed(),
                })
            }
            Err(e) => {
                if let Some(reason) = e.reason() {
                    self.goto(&mut session, SessionState::Failed(reason));
                }
                if e.data_possibly_valid() {
                    warn!(bytes_sent = session.bytes_sent(), "Transfer unconfirmed: {}", e);
                    self.log(LogLevel::Warn, e.to_string());
                } else {
                    self.observer.on_event(&FlashEvent::Error {
                        message: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }

    fn drive<C: SerialChannel>(
        &self,
        channel: &mut C,
        session: &mut TransferSession<'_>,
        total_bytes: u32,
    ) -> Result<(), TransferError> {
        let timings = self.config.timings;

        // Handshake: wait for the device to announce itself
        self.goto(session, SessionState::AwaitingReady);
        self.log(LogLevel::Info, "Waiting for MCU ready signal...");
        let ready = await_token(
            channel,
            Token::Exact(TOKEN_READY),
            timings.ready_timeout(),
            |line| debug!(line = %line, "Ignoring device line"),
        )?;
        if ready.is_none() {
            return Err(TransferError::NoReadySignal {
                timeout_ms: timings.ready_timeout_ms,
            });
        }
        self.log(LogLevel::Info, "MCU is ready");

        // Length frame
        self.goto(session, SessionState::LengthSent);
        send(channel, &encode_length(total_bytes))?;

        self.goto(session, SessionState::AwaitingLengthAck);
        let ack = read_ack(channel, timings.ack_timeout())?;
        if !ack.is_accepted() {
            return Err(TransferError::LengthAckRejected { response: ack });
        }
        self.log(LogLevel::Info, "Length ACK received");

        // Device erases the target region before accepting data
        self.goto(session, SessionState::AwaitingEraseDone);
        self.log(LogLevel::Info, "Waiting for erase completion...");
        let erased = await_token(
            channel,
            Token::Exact(TOKEN_ERASE_DONE),
            timings.erase_timeout(),
            |line| debug!(line = %line, "Ignoring device line"),
        )?;
        if erased.is_none() {
            return Err(TransferError::EraseTimeout {
                timeout_ms: timings.erase_timeout_ms,
            });
        }
        self.log(LogLevel::Info, "MCU flash erase completed");

        // Blocks
        self.goto(session, SessionState::SendingBlocks);
        let total_blocks = session.total_blocks();
        self.log(
            LogLevel::Info,
            format!("Starting transmission ({} blocks)...", total_blocks),
        );

        for index in 0..total_blocks {
            send(channel, session.block(index))?;

            session.await_block_ack(index);
            let ack = read_ack(channel, timings.ack_timeout())?;
            if !ack.is_accepted() {
                return Err(TransferError::BlockAckRejected {
                    block_index: index,
                    response: ack,
                });
            }
            session.record_block_ack(index);

            if index % PROGRESS_EVERY_BLOCKS == 0 || session.is_last_block(index) {
                self.observer.on_event(&FlashEvent::Progress {
                    block_index: index,
                    total_blocks,
                    bytes_sent: session.bytes_sent(),
                    total_bytes: session.total_bytes(),
                });
            }

            // Give the receiver time to commit the block to flash
            thread::sleep(timings.post_ack_delay());

            if !session.is_last_block(index) {
                session.resume_sending();
            }
        }

        // Completion
        self.goto(session, SessionState::AwaitingCompletion);
        self.log(LogLevel::Info, "Waiting for completion signal...");
        let observer = self.observer.as_ref();
        let done = await_token(
            channel,
            Token::Contains(TOKEN_DONE),
            timings.completion_timeout(),
            |line| {
                observer.on_event(&FlashEvent::DeviceMessage {
                    line: line.to_string(),
                })
            },
        )?;
        if done.is_none() {
            return Err(TransferError::NoCompletionSignal {
                bytes_sent: session.bytes_sent(),
            });
        }

        self.goto(session, SessionState::Succeeded);
        Ok(())
    }

    fn goto(&self, session: &mut TransferSession<'_>, to: SessionState) {
        let from = session.state();
        session.goto_state(to);
        self.observer.on_event(&FlashEvent::PhaseChanged { from, to });
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.observer.on_event(&FlashEvent::Log {
            level,
            message: message.into(),
        });
    }
}

/// Write `data` and flush it to the wire.
fn send<C: SerialChannel + ?Sized>(channel: &mut C, data: &[u8]) -> Result<(), TransferError> {
    channel
        .write_bytes(data)
        .map_err(TransferError::WriteFailure)?;
    channel.flush().map_err(TransferError::WriteFailure)
}

fn read_ack<C: SerialChannel + ?Sized>(
    channel: &mut C,
    timeout: Duration,
) -> Result<Ack, TransferError> {
    let bytes = channel
        .read_bytes(1, timeout)
        .map_err(TransferError::ReadFailure)?;
    let ack = Ack::from_bytes(&bytes);
    debug!(ack = ?ack, "ACK received");
    Ok(ack)
}

/// Channel wrapper that emits packet events.
struct ObservableChannel<'a, C: SerialChannel, O: FlashObserver> {
    inner: C,
    observer: &'a O,
}

impl<C: SerialChannel, O: FlashObserver> ObservableChannel<'_, C, O> {
    fn packet(&self, direction: PacketDirection, length: usize) {
        self.observer
            .on_event(&FlashEvent::Packet { direction, length });
    }
}

impl<C: SerialChannel, O: FlashObserver> SerialChannel for ObservableChannel<'_, C, O> {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let res = self.inner.read_line(timeout);
        if let Ok(Some(line)) = &res
            && !line.is_empty()
        {
            self.packet(PacketDirection::Rx, line.len());
        }
        res
    }

    fn read_bytes(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let res = self.inner.read_bytes(count, timeout);
        if let Ok(data) = &res
            && !data.is_empty()
        {
            self.packet(PacketDirection::Rx, data.len());
        }
        res
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let res = self.inner.write_bytes(data);
        if res.is_ok() {
            self.packet(PacketDirection::Tx, data.len());
        }
        res
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.inner.flush()
    }

    fn close(&mut self) {
        self.inner.close()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolTimings;
    use crate::events::RecordingObserver;
    use crate::state::FailureReason;
    use crate::transport::{MockChannel, MockOp};

    fn fast_config(block_size: usize) -> FlashConfig {
        FlashConfig {
            block_size,
            timings: ProtocolTimings {
                ready_timeout_ms: 40,
                ack_timeout_ms: 20,
                erase_timeout_ms: 40,
                completion_timeout_ms: 40,
                post_ack_delay_ms: 0,
            },
            ..Default::default()
        }
    }

    fn session(block_size: usize) -> (FlashSession<RecordingObserver>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        (
            FlashSession::with_observer(fast_config(block_size), observer.clone()),
            observer,
        )
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn progress_events(observer: &RecordingObserver) -> Vec<(usize, usize)> {
        observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                FlashEvent::Progress {
                    bytes_sent,
                    total_bytes,
                    ..
                } => Some((bytes_sent, total_bytes)),
                _ => None,
            })
            .collect()
    }

    fn final_state(observer: &RecordingObserver) -> Option<SessionState> {
        observer.events().into_iter().rev().find_map(|e| match e {
            FlashEvent::PhaseChanged { to, .. } => Some(to),
            _ => None,
        })
    }

    #[test]
    fn test_token_matching() {
        assert!(Token::Exact("READY").matches("READY"));
        assert!(!Token::Exact("READY").matches("READY!"));
        assert!(Token::Contains("DONE").matches("Font DONE, 513 bytes"));
        assert!(!Token::Contains("DONE").matches("done"));
    }

    #[test]
    fn test_await_token_forwards_other_lines() {
        let mut mock = MockChannel::new();
        mock.queue_line("booting").queue_line("").queue_line("READY");

        let mut others = Vec::new();
        let found = await_token(
            &mut mock,
            Token::Exact("READY"),
            Duration::from_millis(50),
            |l| others.push(l.to_string()),
        )
        .unwrap();
        assert_eq!(found.as_deref(), Some("READY"));
        assert_eq!(others, vec!["booting".to_string()]);
    }

    #[test]
    fn test_await_token_deadline() {
        let mut mock = MockChannel::new();
        mock.queue_line("noise");

        let started = Instant::now();
        let found = await_token(
            &mut mock,
            Token::Exact("READY"),
            Duration::from_millis(30),
            |_| {},
        )
        .unwrap();
        assert!(found.is_none());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_513_bytes_three_blocks_lock_step() {
        let (flash, observer) = session(256);
        let data = payload(513);
        let mock = MockChannel::new();
        mock.queue_line("READY")
            .queue_ack()
            .queue_line("ERASE_DONE")
            .queue_acks(3)
            .queue_line("DONE");
        let handle = mock.clone();

        let report = flash.transfer(mock, &data).unwrap();
        assert_eq!(report.total_bytes, 513);
        assert_eq!(report.bytes_sent, 513);
        assert_eq!(report.blocks_sent, 3);

        let expected = vec![
            MockOp::ReadLine(Some("READY".into())),
            MockOp::Write(vec![0x00, 0x00, 0x02, 0x01]),
            MockOp::Flush,
            MockOp::ReadBytes(b"A".to_vec()),
            MockOp::ReadLine(Some("ERASE_DONE".into())),
            MockOp::Write(data[0..256].to_vec()),
            MockOp::Flush,
            MockOp::ReadBytes(b"A".to_vec()),
            MockOp::Write(data[256..512].to_vec()),
            MockOp::Flush,
            MockOp::ReadBytes(b"A".to_vec()),
            MockOp::Write(data[512..513].to_vec()),
            MockOp::Flush,
            MockOp::ReadBytes(b"A".to_vec()),
            MockOp::ReadLine(Some("DONE".into())),
            MockOp::Close,
        ];
        assert_eq!(handle.ops(), expected);

        assert_eq!(progress_events(&observer), vec![(256, 513), (513, 513)]);
        assert_eq!(final_state(&observer), Some(SessionState::Succeeded));
        assert!(observer.events().contains(&FlashEvent::Complete));
    }

    #[test]
    fn test_diagnostic_lines_do_not_confuse_state_machine() {
        let (flash, observer) = session(4);
        let data = payload(8);
        let mock = MockChannel::new();
        mock.queue_line("Font programmer v1.0")
            .queue_line("READY")
            .queue_ack()
            .queue_line("Erasing sector 0")
            .queue_line("ERASE_DONE")
            .queue_acks(2)
            .queue_line("Received 8 bytes")
            .queue_line("Font programming DONE");

        flash.transfer(mock, &data).unwrap();

        let messages: Vec<String> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                FlashEvent::DeviceMessage { line } => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["Received 8 bytes".to_string()]);
        assert_eq!(final_state(&observer), Some(SessionState::Succeeded));
    }

    #[test]
    fn test_no_ready_writes_nothing() {
        let (flash, observer) = session(256);
        let mock = MockChannel::new();
        mock.queue_line("HELLO");
        let handle = mock.clone();

        let err = flash.transfer(mock, &payload(10)).unwrap_err();
        assert!(matches!(err, TransferError::NoReadySignal { timeout_ms: 40 }));
        assert!(handle.get_writes().is_empty());
        assert!(handle.is_closed());
        assert_eq!(
            final_state(&observer),
            Some(SessionState::Failed(FailureReason::NoReadySignal))
        );
    }

    #[test]
    fn test_length_ack_rejected() {
        let (flash, observer) = session(256);
        let mock = MockChannel::new();
        mock.queue_line("READY").queue_bytes(b"N").queue_line("ERASE_DONE");
        let handle = mock.clone();

        let err = flash.transfer(mock, &payload(300)).unwrap_err();
        assert!(matches!(
            err,
            TransferError::LengthAckRejected {
                response: Ack::Rejected(b'N')
            }
        ));
        // Only the length frame went out
        assert_eq!(handle.get_writes(), vec![vec![0, 0, 0x01, 0x2C]]);
        assert!(handle.is_closed());
        assert_eq!(
            final_state(&observer),
            Some(SessionState::Failed(FailureReason::LengthAckRejected))
        );
    }

    #[test]
    fn test_length_ack_timeout() {
        let (flash, _) = session(256);
        let mock = MockChannel::new();
        mock.queue_line("READY").queue_silence();

        let err = flash.transfer(mock, &payload(1)).unwrap_err();
        assert!(matches!(
            err,
            TransferError::LengthAckRejected {
                response: Ack::Missing
            }
        ));
    }

    #[test]
    fn test_erase_timeout() {
        let (flash, observer) = session(256);
        let mock = MockChannel::new();
        mock.queue_line("READY").queue_ack().queue_line("ERASING");
        let handle = mock.clone();

        let err = flash.transfer(mock, &payload(16)).unwrap_err();
        assert!(matches!(err, TransferError::EraseTimeout { .. }));
        assert_eq!(handle.get_writes().len(), 1);
        assert_eq!(
            final_state(&observer),
            Some(SessionState::Failed(FailureReason::EraseTimeout))
        );
    }

    #[test]
    fn test_block_ack_rejected_aborts_remaining_blocks() {
        let (flash, observer) = session(256);
        let data = payload(600);
        let mock = MockChannel::new();
        mock.queue_line("READY")
            .queue_ack()
            .queue_line("ERASE_DONE")
            .queue_ack()
            .queue_bytes(b"E")
            .queue_acks(1);
        let handle = mock.clone();

        let err = flash.transfer(mock, &data).unwrap_err();
        assert!(matches!(
            err,
            TransferError::BlockAckRejected {
                block_index: 1,
                response: Ack::Rejected(b'E')
            }
        ));

        let writes = handle.get_writes();
        assert_eq!(writes.len(), 3); // length + blocks 0 and 1
        assert_eq!(writes[2], data[256..512].to_vec());
        assert!(handle.is_closed());
        assert_eq!(
            final_state(&observer),
            Some(SessionState::Failed(FailureReason::BlockAckRejected {
                block_index: 1
            }))
        );
    }

    #[test]
    fn test_block_ack_timeout() {
        let (flash, _) = session(4);
        let mock = MockChannel::new();
        mock.queue_line("READY")
            .queue_ack()
            .queue_line("ERASE_DONE")
            .queue_silence();

        let err = flash.transfer(mock, &payload(8)).unwrap_err();
        assert!(matches!(
            err,
            TransferError::BlockAckRejected {
                block_index: 0,
                response: Ack::Missing
            }
        ));
    }

    fn packet_events(observer: &RecordingObserver) -> Vec<(PacketDirection, usize)> {
        observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                FlashEvent::Packet { direction, length } => Some((direction, length)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_packet_events_follow_traffic() {
        let (flash, observer) = session(256);
        let mock = MockChannel::new();
        mock.queue_line("READY")
            .queue_ack()
            .queue_line("ERASE_DONE")
            .queue_ack()
            .queue_line("DONE");

        flash.transfer(mock, &payload(3)).unwrap();

        use PacketDirection::{Rx, Tx};
        assert_eq!(
            packet_events(&observer),
            vec![(Rx, 5), (Tx, 4), (Rx, 1), (Rx, 10), (Tx, 3), (Rx, 1), (Rx, 4)]
        );
    }

    #[test]
    fn test_silent_reads_emit_no_packets() {
        let observer = RecordingObserver::new();
        let mock = MockChannel::new();
        mock.queue_silence().queue_silence().queue_line("READY");
        let mut channel = ObservableChannel {
            inner: mock,
            observer: &observer,
        };
        let t = Duration::from_millis(1);

        assert_eq!(channel.read_line(t).unwrap(), None);
        assert!(channel.read_bytes(1, t).unwrap().is_empty());
        assert!(packet_events(&observer).is_empty());

        assert_eq!(channel.read_line(t).unwrap().as_deref(), Some("READY"));
        assert_eq!(packet_events(&observer), vec![(PacketDirection::Rx, 5)]);
    }

    #[test]
    fn test_empty_payload_skips_block_phase() {
        let (flash, observer) = session(256);
        let mock = MockChannel::new();
        mock.queue_line("READY")
            .queue_ack()
            .queue_line("ERASE_DONE")
            .queue_line("DONE");
        let handle = mock.clone();

        let report = flash.transfer(mock, &[]).unwrap();
        assert_eq!(report.blocks_sent, 0);
        assert_eq!(handle.get_writes(), vec![vec![0, 0, 0, 0]]);
        assert!(progress_events(&observer).is_empty());

        let phases: Vec<SessionState> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                FlashEvent::PhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                SessionState::AwaitingReady,
                SessionState::LengthSent,
                SessionState::AwaitingLengthAck,
                SessionState::AwaitingEraseDone,
                SessionState::SendingBlocks,
                SessionState::AwaitingCompletion,
                SessionState::Succeeded,
            ]
        );
    }

    #[test]
    fn test_missing_done_is_soft_failure() {
        let (flash, observer) = session(256);
        let data = payload(300);
        let mock = MockChannel::new();
        mock.queue_line("READY")
            .queue_ack()
            .queue_line("ERASE_DONE")
            .queue_acks(2)
            .queue_line("checksum 0x1F");
        let handle = mock.clone();

        let err = flash.transfer(mock, &data).unwrap_err();
        assert!(matches!(
            err,
            TransferError::NoCompletionSignal { bytes_sent: 300 }
        ));
        assert!(err.data_possibly_valid());
        assert!(handle.is_closed());
        assert_eq!(
            final_state(&observer),
            Some(SessionState::Failed(FailureReason::NoCompletionSignal))
        );
        // Reported as a warning, not an error event
        assert!(
            !observer
                .events()
                .iter()
                .any(|e| matches!(e, FlashEvent::Error { .. }))
        );
        assert!(observer.events().contains(&FlashEvent::DeviceMessage {
            line: "checksum 0x1F".into()
        }));
    }

    #[test]
    fn test_write_failure() {
        let (flash, observer) = session(256);
        let mock = MockChannel::new();
        mock.queue_line("READY")
            .queue_ack()
            .queue_line("ERASE_DONE")
            .fail_writes_after(1);
        let handle = mock.clone();

        let err = flash.transfer(mock, &payload(20)).unwrap_err();
        assert!(matches!(err, TransferError::WriteFailure(_)));
        assert!(handle.is_closed());
        assert_eq!(
            final_state(&observer),
            Some(SessionState::Failed(FailureReason::WriteFailure))
        );
    }

    #[test]
    fn test_progress_every_ten_blocks_and_last() {
        let (flash, observer) = session(4);
        let data = payload(100); // 25 blocks
        let mock = MockChannel::new();
        mock.queue_line("READY")
            .queue_ack()
            .queue_line("ERASE_DONE")
            .queue_acks(25)
            .queue_line("DONE");

        flash.transfer(mock, &data).unwrap();
        assert_eq!(
            progress_events(&observer),
            vec![(4, 100), (44, 100), (84, 100), (100, 100)]
        );
    }

    #[test]
    fn test_zero_block_size_rejected_before_io() {
        let (flash, _) = session(0);
        let mock = MockChannel::new();
        let handle = mock.clone();

        let err = flash.transfer(mock, &payload(4)).unwrap_err();
        assert!(matches!(err, TransferError::InvalidConfig(_)));
        assert!(handle.ops().is_empty());
    }

    #[test]
    fn test_run_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fast_config(256);
        config.input = dir.path().join("absent.bin");

        let err = FlashSession::with_observer(config, Arc::new(crate::events::NullObserver))
            .run()
            .unwrap_err();
        assert!(matches!(err, TransferError::InputMissing(_)));
    }

    #[test]
    fn test_run_unopenable_port() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("font.bin");
        std::fs::write(&input, [0u8; 32]).unwrap();

        let mut config = fast_config(256);
        config.input = input;
        config.port = dir.path().join("no-such-tty").display().to_string();

        let err = FlashSession::with_observer(config, Arc::new(crate::events::NullObserver))
            .run()
            .unwrap_err();
        assert!(matches!(err, TransferError::Connection { .. }));
    }
}

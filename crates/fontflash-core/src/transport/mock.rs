//! Mock serial channel for testing.
//!
//! The device side is a pre-recorded script: chunks of bytes the device
//! "sends", separated by silence markers that make the next read time out.
//! Every host operation is captured so tests can check ordering.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::traits::{SerialChannel, TransportError, take_line};
use crate::protocol::constants::ACK_BYTE;

/// One scripted step of device output.
#[derive(Debug, Clone)]
enum Chunk {
    Data(Vec<u8>),
    Silence,
}

/// Host-side operation observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    Write(Vec<u8>),
    Flush,
    ReadLine(Option<String>),
    ReadBytes(Vec<u8>),
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Chunk>,
    rx: Vec<u8>,
    ops: Vec<MockOp>,
    writes_before_failure: Option<usize>,
    closed: bool,
}

impl MockState {
    /// Move scripted data into the receive buffer until `ready` is satisfied
    /// or a silence marker is reached. Returns false on silence/exhaustion.
    fn pull_until(&mut self, ready: impl Fn(&[u8]) -> bool) -> bool {
        while !ready(&self.rx) {
            match self.script.pop_front() {
                Some(Chunk::Data(bytes)) => self.rx.extend_from_slice(&bytes),
                Some(Chunk::Silence) | None => return false,
            }
        }
        true
    }
}

/// Scripted channel. Clones share state, so a test can keep one handle
/// while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text line, terminated with `\r\n` like the firmware does.
    pub fn queue_line(&self, line: &str) -> &Self {
        let mut bytes = line.as_bytes().to_vec();
        bytes.extend_from_slice(b"\r\n");
        self.queue_bytes(&bytes)
    }

    /// Queue raw bytes.
    pub fn queue_bytes(&self, bytes: &[u8]) -> &Self {
        self.state
            .lock()
            .unwrap()
            .script
            .push_back(Chunk::Data(bytes.to_vec()));
        self
    }

    /// Queue a positive acknowledgement.
    pub fn queue_ack(&self) -> &Self {
        self.queue_bytes(&[ACK_BYTE])
    }

    /// Queue `n` positive acknowledgements.
    pub fn queue_acks(&self, n: usize) -> &Self {
        for _ in 0..n {
            self.queue_ack();
        }
        self
    }

    /// Make the next read that reaches this point time out.
    pub fn queue_silence(&self) -> &Self {
        self.state.lock().unwrap().script.push_back(Chunk::Silence);
        self
    }

    /// Let `n` writes succeed, then fail every following one.
    pub fn fail_writes_after(&self, n: usize) -> &Self {
        self.state.lock().unwrap().writes_before_failure = Some(n);
        self
    }

    /// All captured host operations, in order.
    pub fn ops(&self) -> Vec<MockOp> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Captured writes only.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                MockOp::Write(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl SerialChannel for MockChannel {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let line = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return Err(TransportError::Closed);
            }
            let line = if state.pull_until(|rx| rx.contains(&b'\n')) {
                take_line(&mut state.rx)
            } else {
                None
            };
            state.ops.push(MockOp::ReadLine(line.clone()));
            line
        };
        if line.is_none() {
            thread::sleep(timeout);
        }
        Ok(line)
    }

    fn read_bytes(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let (bytes, complete) = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return Err(TransportError::Closed);
            }
            let complete = state.pull_until(|rx| rx.len() >= count);
            let n = count.min(state.rx.len());
            let bytes: Vec<u8> = state.rx.drain(..n).collect();
            state.ops.push(MockOp::ReadBytes(bytes.clone()));
            (bytes, complete)
        };
        if !complete {
            thread::sleep(timeout);
        }
        Ok(bytes)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TransportError::Closed);
        }
        if let Some(remaining) = state.writes_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(TransportError::WriteFailed("simulated I/O failure".into()));
            }
            *remaining -= 1;
        }
        state.ops.push(MockOp::Write(data.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.ops.push(MockOp::Flush);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        if !state.closed {
            state.closed = true;
            state.ops.push(MockOp::Close);
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(1);

    #[test]
    fn test_mock_lines_and_bytes_share_stream() {
        let mut mock = MockChannel::new();
        mock.queue_line("READY").queue_ack().queue_line("ERASE_DONE");

        assert_eq!(mock.read_line(T).unwrap().as_deref(), Some("READY"));
        assert_eq!(mock.read_bytes(1, T).unwrap(), b"A");
        assert_eq!(mock.read_line(T).unwrap().as_deref(), Some("ERASE_DONE"));
        // Script is exhausted
        assert_eq!(mock.read_line(T).unwrap(), None);
        assert!(mock.read_bytes(1, T).unwrap().is_empty());
    }

    #[test]
    fn test_mock_silence_splits_reads() {
        let mut mock = MockChannel::new();
        mock.queue_silence().queue_ack();

        assert!(mock.read_bytes(1, T).unwrap().is_empty());
        assert_eq!(mock.read_bytes(1, T).unwrap(), b"A");
    }

    #[test]
    fn test_mock_write_capture() {
        let mut mock = MockChannel::new();
        mock.write_bytes(b"Hello").unwrap();
        mock.flush().unwrap();
        mock.write_bytes(b"World").unwrap();

        assert_eq!(mock.get_writes(), vec![b"Hello".to_vec(), b"World".to_vec()]);
        assert_eq!(mock.ops()[1], MockOp::Flush);
    }

    #[test]
    fn test_mock_write_failure_injection() {
        let mut mock = MockChannel::new();
        mock.fail_writes_after(1);
        assert!(mock.write_bytes(b"ok").is_ok());
        assert!(matches!(
            mock.write_bytes(b"boom"),
            Err(TransportError::WriteFailed(_))
        ));
    }

    #[test]
    fn test_mock_close() {
        let mut mock = MockChannel::new();
        let handle = mock.clone();
        mock.close();
        mock.close();

        assert!(handle.is_closed());
        assert_eq!(handle.ops(), vec![MockOp::Close]);
        assert!(mock.write_bytes(b"late").is_err());
    }
}

//! serialport-based transport implementation.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info, instrument, trace};

use super::traits::{SerialChannel, TransportError, take_line};
use crate::protocol::constants::ACK_TIMEOUT_MS;

const READ_CHUNK: usize = 256;

/// Serial port channel.
///
/// Keeps its own receive buffer: bytes that arrive in the same read as a
/// line terminator stay available to the next `read_line`/`read_bytes`.
pub struct SerialPortChannel {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    rx: Vec<u8>,
}

impl SerialPortChannel {
    /// Open `port` at `baud_rate`, 8N1, no flow control.
    #[instrument(level = "info")]
    pub fn open(port: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let handle = serialport::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(ACK_TIMEOUT_MS))
            .open()
            .map_err(|e| TransportError::OpenFailed {
                port: port.to_string(),
                message: e.to_string(),
            })?;

        info!(port = %port, baud = baud_rate, "Serial port opened");

        Ok(Self {
            port: Some(handle),
            name: port.to_string(),
            rx: Vec::new(),
        })
    }

    /// Names of the serial ports present on this machine.
    pub fn available_ports() -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                debug!(error = %e, "Could not enumerate serial ports");
                Vec::new()
            }
        }
    }

    /// Read whatever arrives before `deadline` into the receive buffer.
    /// Returns the number of new bytes; 0 means the wait ran out.
    fn fill(&mut self, deadline: Instant) -> Result<usize, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(0);
        }
        port.set_timeout(remaining)
            .map_err(|e| TransportError::ReadFailed(e.to_string()))?;

        let mut buf = [0u8; READ_CHUNK];
        match port.read(&mut buf) {
            Ok(n) => {
                self.rx.extend_from_slice(&buf[..n]);
                trace!(bytes_read = n, "Read chunk");
                Ok(n)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) => Err(TransportError::ReadFailed(e.to_string())),
        }
    }
}

impl SerialChannel for SerialPortChannel {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = take_line(&mut self.rx) {
                return Ok(Some(line));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            self.fill(deadline)?;
        }
    }

    fn read_bytes(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + timeout;
        while self.rx.len() < count && Instant::now() < deadline {
            self.fill(deadline)?;
        }
        let n = count.min(self.rx.len());
        Ok(self.rx.drain(..n).collect())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        trace!(bytes_written = data.len(), "Write complete");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.flush()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            self.rx.clear();
            info!(port = %self.name, "Serial port closed");
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialPortChannel {
    fn drop(&mut self) {
        self.close();
    }
}

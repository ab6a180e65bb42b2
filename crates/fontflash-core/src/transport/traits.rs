//! Serial transport abstraction.
//!
//! Defines the `SerialChannel` trait for byte-oriented, half-duplex
//! communication with the receiving device, allowing different
//! implementations (serialport, mock).

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Channel closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract serial channel.
///
/// All reads are bounded by the given timeout. A read that runs out of time
/// is not an error: `read_line` yields `None` and `read_bytes` yields fewer
/// bytes than requested. Retrying is left to the caller.
pub trait SerialChannel: Send {
    /// Read one text line, without its terminator and surrounding whitespace.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;

    /// Read up to `count` raw bytes.
    fn read_bytes(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Write all of `data`.
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Flush pending output to the wire.
    fn flush(&mut self) -> Result<(), TransportError>;

    /// Release the underlying connection. Calling it twice is harmless.
    fn close(&mut self);

    /// Human-readable name of the connection (port path).
    fn name(&self) -> &str;
}

impl<C: SerialChannel + ?Sized> SerialChannel for Box<C> {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        (**self).read_line(timeout)
    }

    fn read_bytes(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).read_bytes(count, timeout)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write_bytes(data)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Split a complete line off the front of `buf`, if a `\n` is present.
///
/// The returned text is decoded lossily and trimmed, so `\r\n` and `\n`
/// terminated lines look the same.
pub(crate) fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let raw: Vec<u8> = buf.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&raw).trim().to_string())
}

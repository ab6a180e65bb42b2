//! Event system for UI decoupling.
//!
//! Lets the CLI (or any other front end) follow a transfer without the
//! protocol code knowing how progress is displayed. Events are
//! observational only and never influence control flow.

use std::fmt;

use crate::state::SessionState;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Events emitted by a flash session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashEvent {
    /// Serial channel opened.
    Connected { port: String, baud_rate: u32 },
    /// Protocol state changed.
    PhaseChanged { from: SessionState, to: SessionState },
    /// Block transfer progress.
    Progress {
        block_index: usize,
        total_blocks: usize,
        bytes_sent: usize,
        total_bytes: usize,
    },
    /// Informational line printed by the device while finishing up.
    DeviceMessage { line: String },
    /// Log message.
    Log { level: LogLevel, message: String },
    /// Bytes sent/received on the channel.
    Packet {
        direction: PacketDirection,
        length: usize,
    },
    /// Transfer failed.
    Error { message: String },
    /// Device confirmed completion.
    Complete,
}

/// Serial packet direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Host -> Device
    Rx, // Device -> Host
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Observer trait for receiving flash events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait FlashObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &FlashEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl FlashObserver for NullObserver {
    fn on_event(&self, _event: &FlashEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl FlashObserver for TracingObserver {
    fn on_event(&self, event: &FlashEvent) {
        match event {
            FlashEvent::Connected { port, baud_rate } => {
                tracing::info!(port = %port, baud = baud_rate, "Connected");
            }
            FlashEvent::PhaseChanged { from, to } => {
                tracing::debug!(from = %from, to = %to, "Phase changed");
            }
            FlashEvent::Progress {
                bytes_sent,
                total_bytes,
                ..
            } => {
                let pct = if *total_bytes > 0 {
                    (*bytes_sent * 100) / *total_bytes
                } else {
                    100
                };
                tracing::info!("Progress: {}% ({}/{} bytes)", pct, bytes_sent, total_bytes);
            }
            FlashEvent::DeviceMessage { line } => {
                tracing::info!("MCU: {}", line);
            }
            FlashEvent::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
            FlashEvent::Packet { direction, length } => {
                tracing::trace!(dir = %direction, len = length, "Serial packet");
            }
            FlashEvent::Error { message } => {
                tracing::error!("Error: {}", message);
            }
            FlashEvent::Complete => {
                tracing::info!("Font programming completed");
            }
        }
    }
}

/// Observer that keeps every event, for tests and post-run inspection.
#[derive(Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<FlashEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<FlashEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl FlashObserver for RecordingObserver {
    fn on_event(&self, event: &FlashEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

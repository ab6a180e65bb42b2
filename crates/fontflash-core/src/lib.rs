//! FontFlash-Core: font glyph conversion and serial flashing for OLED firmware.
//!
//! The host side of a small lock-step serial protocol that programs a
//! font-glyph blob into a microcontroller's external flash, plus the
//! converter that produces that blob from a C glyph table.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Tokens, ACK byte, length frame
//! - **Transport**: Serial communication abstraction (serialport, mock)
//! - **State**: Session states and per-transfer bookkeeping
//! - **Events**: Observer pattern for UI decoupling
//! - **Session**: High-level orchestrator
//! - **Font**: C glyph table parsing, binary and index header generation
//! - **Config**: TOML configuration
//!
//! # Example
//!
//! ```no_run
//! use fontflash_core::config::FlashConfig;
//! use fontflash_core::session::FlashSession;
//!
//! let config = FlashConfig {
//!     port: "/dev/ttyUSB0".to_string(),
//!     input: "assets/CH_Font.bin".into(),
//!     ..Default::default()
//! };
//!
//! let session = FlashSession::new(config);
//! session.run().expect("transfer failed");
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod font;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use config::{ConvertConfig, FlashConfig, HeaderLayout, ProtocolTimings, ToolConfig};
pub use error::TransferError;
pub use events::{FlashEvent, FlashObserver, LogLevel, NullObserver, TracingObserver};
pub use font::{FontError, Glyph};
pub use protocol::Ack;
pub use session::{FlashSession, Token, TransferReport, await_token};
pub use state::{FailureReason, SessionState, TransferSession};
pub use transport::{MockChannel, SerialChannel, SerialPortChannel, TransportError};

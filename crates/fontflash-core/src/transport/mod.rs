//! Transport layer module.

pub mod guard;
pub mod mock;
pub mod serial;
pub mod traits;

pub use guard::ChannelGuard;
pub use mock::{MockChannel, MockOp};
pub use serial::SerialPortChannel;
pub use traits::{SerialChannel, TransportError};

//! Transport layer module for the GENIBus protocol
//!
//! The protocol core only needs a byte-in/byte-out stream. This crate defines
//! that contract and provides TCP and serial implementations of it.

pub mod error;
pub mod stream;
pub mod tcp;
pub mod serial;

pub use error::{GeniError, GeniResult};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{TcpTransport, TcpSettings};
pub use serial::{SerialTransport, SerialSettings, GENIBUS_BAUD_RATE};

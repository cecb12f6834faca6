//! Transport errors share the protocol-wide taxonomy

pub use genibus_core::error::{GeniError, GeniResult};

/// Error for an operation on a stream that has not been opened
pub(crate) fn not_connected(what: &str) -> GeniError {
    GeniError::Connection(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        format!("{} not connected", what),
    ))
}

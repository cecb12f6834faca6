//! Connection management module

pub mod builder;
pub mod connection;

pub use builder::{ConnectionBuilder, DynConnection};
pub use connection::{Connection, ContentionPolicy};

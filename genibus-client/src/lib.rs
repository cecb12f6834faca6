//! GENIBus client implementation
//!
//! This crate drives request/reply transactions against GENIBus units.
//! [`TransactionEngine`] runs one transaction at a time over a byte stream;
//! [`Connection`] shares an engine between tasks and enforces the
//! one-outstanding-transaction rule of the bus.

pub mod connection;
pub mod engine;
pub mod state;
pub mod statistics;

pub use connection::{Connection, ConnectionBuilder, ContentionPolicy, DynConnection};
pub use engine::{EngineConfig, TransactionEngine, DEFAULT_MASTER_ADDRESS, DEFAULT_REPLY_TIMEOUT};
pub use genibus_application::{DataItem, ItemValue, ReplyItem, ScaleInfo};
pub use state::TransactionState;
pub use statistics::TransactionStatistics;

//! genibus - Rust implementation of the Grundfos GENIBus protocol
//!
//! GENIBus is the half-duplex RS-485 field bus of Grundfos pumps. A master
//! sends request telegrams to a unit and the unit answers with a reply
//! telegram; each telegram carries one or more APDUs that read, write or
//! describe data items.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `genibus-core`: Protocol constants, addresses, byte helpers and errors
//! - `genibus-transport`: Transport layer (TCP, serial)
//! - `genibus-session`: Telegram framing and checksums
//! - `genibus-application`: APDU encoding and reply value extraction
//! - `genibus-client`: Transaction engine and shared connection
//! - `genibus-simulator`: In-process simulated unit
//!
//! This crate re-exports them and adds what outer applications need around
//! the protocol: label tables for data items, persisted connection settings
//! and the configuration directory.
//!
//! # Usage
//!
//! ```no_run
//! use genibus::client::ConnectionBuilder;
//! use genibus::ApduClass;
//! use std::time::Duration;
//!
//! # async fn demo() -> genibus::GeniResult<()> {
//! let conn = ConnectionBuilder::new().tcp("192.168.1.50:5000").build()?;
//! conn.open().await?;
//! conn.connect(Duration::from_secs(1)).await?;
//! let speed = conn.get(ApduClass::MeasuredData, &[0x23]).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod presentation;
pub mod settings;

// Re-export core types
pub use genibus_core::{
    Access, Ack, Address, ApduClass, GeniError, GeniResult, Operation, StartDelimiter,
};
pub use genibus_core::items;

pub use config::ConfigDirectory;
pub use presentation::{Info, Item, Label};
pub use settings::{ClientSettings, ConnectionKind};

// Re-export client API
pub mod client {
    pub use genibus_client::*;
}

// Re-export the simulator
pub mod simulator {
    pub use genibus_simulator::*;
}

// Re-export the lower layers
pub mod session {
    pub use genibus_session::*;
}

pub mod transport {
    pub use genibus_transport::*;
}

pub mod application {
    pub use genibus_application::*;
}

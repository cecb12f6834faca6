//! Simulated GENIBus unit
//!
//! [`SimulatedUnit`] answers request PDUs the way a slave on the bus does.
//! [`SimulatorTransport`] puts a unit behind the transport traits so a
//! client can talk to it without hardware.

pub mod transport;
pub mod unit;

pub use transport::{Fault, SimulatorTransport};
pub use unit::{Register, SimulatedUnit};

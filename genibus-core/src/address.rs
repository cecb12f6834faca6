//! GENIBus unit addresses

use crate::constants::{BROADCAST_ADDR, CONNECTION_REQ_ADDR, SLAVE_ADDR_OFFSET};
use crate::error::{GeniResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-byte bus address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(u8);

impl Address {
    /// Reserved for connection establishment only
    pub const CONNECTION_REQUEST: Address = Address(CONNECTION_REQ_ADDR);
    /// No reply is ever expected for telegrams sent here
    pub const BROADCAST: Address = Address(BROADCAST_ADDR);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Address of slave unit number `unit` (`SLAVE_ADDR_OFFSET + unit`)
    ///
    /// Unit numbers that would collide with the reserved addresses are
    /// rejected.
    pub fn slave(unit: u8) -> GeniResult<Self> {
        match unit.checked_add(SLAVE_ADDR_OFFSET) {
            Some(value) if value < CONNECTION_REQ_ADDR => Ok(Self(value)),
            _ => Err(ValidationError::AddressOutOfRange(unit).into()),
        }
    }

    /// Unit number of a slave address, if it lies in the slave range
    pub fn unit_number(&self) -> Option<u8> {
        if self.0 >= SLAVE_ADDR_OFFSET && !self.is_reserved() {
            Some(self.0 - SLAVE_ADDR_OFFSET)
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == BROADCAST_ADDR
    }

    pub fn is_connection_request(&self) -> bool {
        self.0 == CONNECTION_REQ_ADDR
    }

    pub fn is_reserved(&self) -> bool {
        self.is_broadcast() || self.is_connection_request()
    }
}

impl From<u8> for Address {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Address> for u8 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            BROADCAST_ADDR => write!(f, "broadcast(0x{:02X})", self.0),
            CONNECTION_REQ_ADDR => write!(f, "connection-request(0x{:02X})", self.0),
            _ => write!(f, "0x{:02X}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeniError;

    #[test]
    fn test_slave_addresses() {
        assert_eq!(Address::slave(0).unwrap().value(), 32);
        assert_eq!(Address::slave(1).unwrap().unit_number(), Some(1));
        assert_eq!(Address::slave(221).unwrap().value(), 253);
        assert!(matches!(
            Address::slave(222),
            Err(GeniError::Validation(ValidationError::AddressOutOfRange(222)))
        ));
        assert!(Address::slave(250).is_err());
    }

    #[test]
    fn test_reserved_addresses() {
        assert!(Address::BROADCAST.is_broadcast());
        assert!(Address::CONNECTION_REQUEST.is_connection_request());
        assert!(!Address::new(0x20).is_reserved());
        assert_eq!(Address::BROADCAST.unit_number(), None);
        assert_eq!(Address::new(1).unit_number(), None);
        assert_eq!(Address::new(0x20).to_string(), "0x20");
    }
}

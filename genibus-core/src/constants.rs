//! GENIBus protocol constants
//!
//! The closed vocabulary of the protocol: telegram field positions, reserved
//! addresses, start delimiters, APDU classes, operation specifiers,
//! acknowledgement codes and the class capability matrix.
//!
//! `CLASS_CAPABILITIES` is the single source of truth for which operations a
//! class permits; [`ApduClass::supports`] and the client's pre-flight checks
//! both consult it.

use crate::error::{GeniError, GeniResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// Telegram field offsets.
pub const START_DELIMITER: usize = 0;
pub const LENGTH: usize = 1;
pub const DESTINATION_ADDRESS: usize = 2;
pub const SOURCE_ADDRESS: usize = 3;
pub const PDU_START: usize = 4;

/// Number of trailing checksum bytes (high byte, then low byte)
pub const CRC_LEN: usize = 2;

pub const MAX_TELEGRAM_LEN: usize = 259;
pub const MAX_PDU_LEN: usize = 253;
pub const MIN_TELEGRAM_LEN: usize = PDU_START + CRC_LEN;

pub const SLAVE_ADDR_OFFSET: u8 = 32;
pub const CONNECTION_REQ_ADDR: u8 = 254;
pub const BROADCAST_ADDR: u8 = 255;

pub const SD_DATA_REQUEST: u8 = 0x27;
pub const SD_DATA_REPLY: u8 = 0x24;
pub const SD_DATA_MESSAGE: u8 = 0x26;

pub const ACC_RO: u8 = 0x01;
pub const ACC_WO: u8 = 0x02;
pub const ACC_WR: u8 = 0x03;

pub const OS_GET: u8 = 0;
pub const OS_SET: u8 = 2;
pub const OS_INFO: u8 = 3;

pub const ACK_OK: u8 = 0;
pub const ACK_CLASS_UNKNOWN: u8 = 1;
pub const ACK_ID_UNKNOWN: u8 = 2;
pub const ACK_OPERATION_ILLEGAL: u8 = 3;

/// Telegram start delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartDelimiter {
    DataRequest,
    DataReply,
    DataMessage,
}

impl StartDelimiter {
    pub fn to_byte(self) -> u8 {
        match self {
            StartDelimiter::DataRequest => SD_DATA_REQUEST,
            StartDelimiter::DataReply => SD_DATA_REPLY,
            StartDelimiter::DataMessage => SD_DATA_MESSAGE,
        }
    }
}

impl TryFrom<u8> for StartDelimiter {
    type Error = GeniError;

    fn try_from(value: u8) -> GeniResult<Self> {
        match value {
            SD_DATA_REQUEST => Ok(StartDelimiter::DataRequest),
            SD_DATA_REPLY => Ok(StartDelimiter::DataReply),
            SD_DATA_MESSAGE => Ok(StartDelimiter::DataMessage),
            other => Err(GeniError::ProtocolViolation(format!(
                "Unknown start delimiter 0x{:02X}",
                other
            ))),
        }
    }
}

/// APDU class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ApduClass {
    ProtocolData = 0,
    BusData = 1,
    MeasuredData = 2,
    Commands = 3,
    ConfigurationParameters = 4,
    ReferenceValues = 5,
    TestData = 6,
    AsciiStrings = 7,
    MemoryBlocks = 8,
    EmbeddedPdus = 9,
    DataObjects = 10,
    SixteenBitMeasuredData = 11,
    SixteenBitConfigurationParameters = 12,
    SixteenBitReferenceValues = 13,
}

/// Every APDU class, ordered by class number
pub const ALL_CLASSES: [ApduClass; 14] = [
    ApduClass::ProtocolData,
    ApduClass::BusData,
    ApduClass::MeasuredData,
    ApduClass::Commands,
    ApduClass::ConfigurationParameters,
    ApduClass::ReferenceValues,
    ApduClass::TestData,
    ApduClass::AsciiStrings,
    ApduClass::MemoryBlocks,
    ApduClass::EmbeddedPdus,
    ApduClass::DataObjects,
    ApduClass::SixteenBitMeasuredData,
    ApduClass::SixteenBitConfigurationParameters,
    ApduClass::SixteenBitReferenceValues,
];

/// Classes this client implementation handles
pub const SUPPORTED_CLASSES: [ApduClass; 7] = [
    ApduClass::ProtocolData,
    ApduClass::MeasuredData,
    ApduClass::Commands,
    ApduClass::ConfigurationParameters,
    ApduClass::ReferenceValues,
    ApduClass::AsciiStrings,
    ApduClass::SixteenBitMeasuredData,
];

use Operation::{Get, Info, Set};

/// Legal operations per class, indexed by class number
pub const CLASS_CAPABILITIES: [&[Operation]; 14] = [
    &[Get],            // PROTOCOL_DATA
    &[Get],            // BUS_DATA
    &[Get, Info],      // MEASURED_DATA
    &[Set, Info],      // COMMANDS
    &[Get, Set, Info], // CONFIGURATION_PARAMETERS
    &[Get, Set, Info], // REFERENCE_VALUES
    &[Get, Set],       // TEST_DATA
    &[Get],            // ASCII_STRINGS
    &[Get, Set],       // MEMORY_BLOCKS
    &[Get],            // EMBEDDED_PUDS
    &[Get, Set],       // DATA_OBJECTS
    &[Get, Info],      // SIXTEENBIT_MEASURED_DATA
    &[Get, Set, Info], // SIXTEENBIT_CONFIGURATION_PARAMETERS
    &[Get, Set, Info], // SIXTEENBIT_REFERENCE_VALUES
];

impl ApduClass {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Stable protocol name, e.g. `MEASURED_DATA`
    pub fn name(self) -> &'static str {
        match self {
            ApduClass::ProtocolData => "PROTOCOL_DATA",
            ApduClass::BusData => "BUS_DATA",
            ApduClass::MeasuredData => "MEASURED_DATA",
            ApduClass::Commands => "COMMANDS",
            ApduClass::ConfigurationParameters => "CONFIGURATION_PARAMETERS",
            ApduClass::ReferenceValues => "REFERENCE_VALUES",
            ApduClass::TestData => "TEST_DATA",
            ApduClass::AsciiStrings => "ASCII_STRINGS",
            ApduClass::MemoryBlocks => "MEMORY_BLOCKS",
            ApduClass::EmbeddedPdus => "EMBEDDED_PUDS",
            ApduClass::DataObjects => "DATA_OBJECTS",
            ApduClass::SixteenBitMeasuredData => "SIXTEENBIT_MEASURED_DATA",
            ApduClass::SixteenBitConfigurationParameters => "SIXTEENBIT_CONFIGURATION_PARAMETERS",
            ApduClass::SixteenBitReferenceValues => "SIXTEENBIT_REFERENCE_VALUES",
        }
    }

    /// Human-facing class name, e.g. `Measured Data`
    pub fn nice_name(self) -> &'static str {
        match self {
            ApduClass::ProtocolData => "Protocol Data",
            ApduClass::BusData => "Bus Data",
            ApduClass::MeasuredData => "Measured Data",
            ApduClass::Commands => "Commands",
            ApduClass::ConfigurationParameters => "Configuration Parameters",
            ApduClass::ReferenceValues => "Reference Values",
            ApduClass::TestData => "Test Data",
            ApduClass::AsciiStrings => "ASCII Strings",
            ApduClass::MemoryBlocks => "Memory Blocks",
            ApduClass::EmbeddedPdus => "Embedded PDUs",
            ApduClass::DataObjects => "Data Objects",
            ApduClass::SixteenBitMeasuredData => "16Bit Measured Data",
            ApduClass::SixteenBitConfigurationParameters => "16Bit Configuration Parameters",
            ApduClass::SixteenBitReferenceValues => "16Bit Reference Values",
        }
    }

    /// Operations the class permits
    pub fn capabilities(self) -> &'static [Operation] {
        CLASS_CAPABILITIES[self as usize]
    }

    pub fn supports(self, operation: Operation) -> bool {
        self.capabilities().contains(&operation)
    }

    /// Whether this client handles the class at all
    pub fn is_supported(self) -> bool {
        SUPPORTED_CLASSES.contains(&self)
    }

    /// Layout of the per-item data for `operation` on this class
    pub fn value_format(self, operation: Operation) -> ValueFormat {
        if operation == Operation::Info {
            return ValueFormat::ScaleInfo;
        }
        match self {
            ApduClass::Commands => ValueFormat::None,
            ApduClass::MeasuredData
            | ApduClass::SixteenBitMeasuredData
            | ApduClass::SixteenBitConfigurationParameters
            | ApduClass::SixteenBitReferenceValues => ValueFormat::Fixed(2),
            ApduClass::AsciiStrings => ValueFormat::Text,
            ApduClass::MemoryBlocks | ApduClass::EmbeddedPdus | ApduClass::DataObjects => ValueFormat::Raw,
            ApduClass::ProtocolData
            | ApduClass::BusData
            | ApduClass::ConfigurationParameters
            | ApduClass::ReferenceValues
            | ApduClass::TestData => ValueFormat::Fixed(1),
        }
    }
}

impl TryFrom<u8> for ApduClass {
    type Error = GeniError;

    fn try_from(value: u8) -> GeniResult<Self> {
        ALL_CLASSES
            .get(value as usize)
            .copied()
            .ok_or_else(|| GeniError::ProtocolViolation(format!("Undefined APDU class {}", value)))
    }
}

impl fmt::Display for ApduClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-item data layout of an APDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// Identifier only, no value bytes (commands)
    None,
    /// Big-endian unsigned value of the given byte width
    Fixed(usize),
    /// NUL-terminated ASCII string
    Text,
    /// Opaque bytes; one item per APDU
    Raw,
    /// INFO reply: 1-byte head, optionally followed by unit, zero and range
    ScaleInfo,
}

/// Operation specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Operation {
    Get = OS_GET,
    Set = OS_SET,
    Info = OS_INFO,
}

impl Operation {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        operation_to_string(self)
    }
}

/// Diagnostic name of an operation
pub fn operation_to_string(operation: Operation) -> &'static str {
    match operation {
        Operation::Get => "Read",
        Operation::Set => "Write",
        Operation::Info => "Info-Request",
    }
}

impl TryFrom<u8> for Operation {
    type Error = GeniError;

    fn try_from(value: u8) -> GeniResult<Self> {
        match value {
            OS_GET => Ok(Operation::Get),
            OS_SET => Ok(Operation::Set),
            OS_INFO => Ok(Operation::Info),
            other => Err(GeniError::ProtocolViolation(format!(
                "Undefined operation specifier {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement code of a reply APDU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Ack {
    Ok = ACK_OK,
    ClassUnknown = ACK_CLASS_UNKNOWN,
    IdUnknown = ACK_ID_UNKNOWN,
    OperationIllegal = ACK_OPERATION_ILLEGAL,
}

impl Ack {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == Ack::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Ack::Ok => "OK",
            Ack::ClassUnknown => "CLASS_UNKNOWN",
            Ack::IdUnknown => "ID_UNKNOWN",
            Ack::OperationIllegal => "OPERATION_ILLEGAL",
        }
    }
}

impl TryFrom<u8> for Ack {
    type Error = GeniError;

    fn try_from(value: u8) -> GeniResult<Self> {
        match value {
            ACK_OK => Ok(Ack::Ok),
            ACK_CLASS_UNKNOWN => Ok(Ack::ClassUnknown),
            ACK_ID_UNKNOWN => Ok(Ack::IdUnknown),
            ACK_OPERATION_ILLEGAL => Ok(Ack::OperationIllegal),
            other => Err(GeniError::ProtocolViolation(format!(
                "Undefined acknowledgement code {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access mode of a data item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Access {
    ReadOnly = ACC_RO,
    WriteOnly = ACC_WO,
    ReadWrite = ACC_WR,
}

impl Access {
    /// Whether an item with this access mode accepts `operation`
    ///
    /// INFO only describes the item and is allowed for every mode.
    pub fn permits(self, operation: Operation) -> bool {
        match operation {
            Operation::Info => true,
            Operation::Get => self.value() & ACC_RO != 0,
            Operation::Set => self.value() & ACC_WO != 0,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Access {
    type Error = GeniError;

    fn try_from(value: u8) -> GeniResult<Self> {
        match value {
            ACC_RO => Ok(Access::ReadOnly),
            ACC_WO => Ok(Access::WriteOnly),
            ACC_WR => Ok(Access::ReadWrite),
            other => Err(GeniError::ProtocolViolation(format!("Undefined access mode {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_round_trip_and_names() {
        for (n, class) in ALL_CLASSES.iter().enumerate() {
            assert_eq!(class.value() as usize, n);
            assert_eq!(ApduClass::try_from(n as u8).unwrap(), *class);
        }
        assert_eq!(ApduClass::MeasuredData.name(), "MEASURED_DATA");
        assert_eq!(ApduClass::SixteenBitMeasuredData.nice_name(), "16Bit Measured Data");
        assert_eq!(ApduClass::EmbeddedPdus.to_string(), "EMBEDDED_PUDS");
    }

    #[test]
    fn test_undefined_lookups_are_protocol_violations() {
        assert!(matches!(ApduClass::try_from(14), Err(GeniError::ProtocolViolation(_))));
        assert!(matches!(Operation::try_from(1), Err(GeniError::ProtocolViolation(_))));
        assert!(matches!(Ack::try_from(4), Err(GeniError::ProtocolViolation(_))));
        assert!(matches!(StartDelimiter::try_from(0x7E), Err(GeniError::ProtocolViolation(_))));
        assert!(matches!(Access::try_from(0), Err(GeniError::ProtocolViolation(_))));
    }

    #[test]
    fn test_capability_matrix() {
        assert_eq!(ApduClass::ProtocolData.capabilities(), &[Operation::Get]);
        assert!(ApduClass::Commands.supports(Operation::Set));
        assert!(ApduClass::Commands.supports(Operation::Info));
        assert!(!ApduClass::Commands.supports(Operation::Get));
        assert!(!ApduClass::ProtocolData.supports(Operation::Set));
        assert!(ApduClass::ConfigurationParameters.supports(Operation::Set));
        assert!(!ApduClass::TestData.supports(Operation::Info));
        assert!(ApduClass::SixteenBitReferenceValues.supports(Operation::Info));
    }

    #[test]
    fn test_supported_classes() {
        let supported: Vec<_> = ALL_CLASSES.iter().filter(|c| c.is_supported()).collect();
        assert_eq!(supported.len(), 7);
        assert!(!ApduClass::BusData.is_supported());
        assert!(ApduClass::SixteenBitMeasuredData.is_supported());
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(operation_to_string(Operation::Get), "Read");
        assert_eq!(Operation::Set.to_string(), "Write");
        assert_eq!(Operation::Info.as_str(), "Info-Request");
        assert_eq!(Operation::try_from(3).unwrap(), Operation::Info);
    }

    #[test]
    fn test_value_formats() {
        assert_eq!(ApduClass::MeasuredData.value_format(Operation::Get), ValueFormat::Fixed(2));
        assert_eq!(ApduClass::ReferenceValues.value_format(Operation::Set), ValueFormat::Fixed(1));
        assert_eq!(ApduClass::Commands.value_format(Operation::Set), ValueFormat::None);
        assert_eq!(ApduClass::AsciiStrings.value_format(Operation::Get), ValueFormat::Text);
        assert_eq!(ApduClass::MeasuredData.value_format(Operation::Info), ValueFormat::ScaleInfo);
    }

    #[test]
    fn test_access_modes() {
        assert!(Access::ReadOnly.permits(Operation::Get));
        assert!(!Access::ReadOnly.permits(Operation::Set));
        assert!(Access::WriteOnly.permits(Operation::Set));
        assert!(!Access::WriteOnly.permits(Operation::Get));
        assert!(Access::ReadWrite.permits(Operation::Get) && Access::ReadWrite.permits(Operation::Set));
        assert!(Access::ReadOnly.permits(Operation::Info));
    }
}

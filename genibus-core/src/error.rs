use crate::constants::{Ack, ApduClass, Operation};
use thiserror::Error;

/// Main error type for GENIBus operations
///
/// Every failure is scoped to a single transaction; none of them leave a
/// connection unusable for the next request.
#[derive(Error, Debug)]
pub enum GeniError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Frame invalid: {0}")]
    Frame(#[from] FrameError),

    #[error("Timeout")]
    Timeout,

    #[error("Negative acknowledgement for class {class}: {ack}")]
    NegativeAck { class: ApduClass, ack: Ack },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Connection busy: another transaction is in flight")]
    Busy,

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl GeniError {
    /// Rejected locally before any byte was sent
    pub fn is_validation_error(&self) -> bool {
        matches!(self, GeniError::Validation(_))
    }

    /// Reply bytes were received but did not form a valid telegram
    pub fn is_frame_error(&self) -> bool {
        matches!(self, GeniError::Frame(_))
    }

    /// Well-formed reply in which the unit rejected the request
    pub fn is_negative_ack(&self) -> bool {
        matches!(self, GeniError::NegativeAck { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GeniError::Timeout)
    }

    /// The acknowledgement code carried by a negative reply, if any
    pub fn ack(&self) -> Option<Ack> {
        match self {
            GeniError::NegativeAck { ack, .. } => Some(*ack),
            _ => None,
        }
    }
}

/// Pre-flight failures: the request itself is malformed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("APDU class {0} is not supported by this client")]
    UnsupportedClass(ApduClass),

    #[error("Operation {operation} is illegal for class {class}")]
    IllegalOperation {
        class: ApduClass,
        operation: Operation,
    },

    #[error("PDU too long: {len} bytes, maximum {max}")]
    PduTooLong { len: usize, max: usize },

    #[error("Telegram too long: {len} bytes, maximum {max}")]
    TelegramTooLong { len: usize, max: usize },

    #[error("APDU data too long: {len} bytes, maximum {max}")]
    ApduTooLong { len: usize, max: usize },

    #[error("Value for item {id} must be {expected} bytes, got {actual}")]
    ValueWidth { id: u8, expected: usize, actual: usize },

    #[error("Missing value for item {id}")]
    MissingValue { id: u8 },

    #[error("Item {id} does not take a value for this operation")]
    UnexpectedValue { id: u8 },

    #[error("Request contains no data items")]
    EmptyRequest,

    #[error("Unit number {0} does not map to a slave address")]
    AddressOutOfRange(u8),
}

/// Post-flight failures: the received bytes are not a valid telegram
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Telegram too short: {len} bytes, minimum {min}")]
    TooShort { len: usize, min: usize },

    #[error("Telegram too long: {len} bytes, maximum {max}")]
    TooLong { len: usize, max: usize },

    #[error("Expected start delimiter 0x{expected:02X}, got 0x{actual:02X}")]
    BadDelimiter { expected: u8, actual: u8 },

    #[error("Length field says {declared} bytes, telegram carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Checksum mismatch: computed 0x{computed:04X}, received 0x{received:04X}")]
    ChecksumMismatch { computed: u16, received: u16 },

    #[error("Malformed PDU: {0}")]
    MalformedPdu(String),
}

/// Result type alias for GENIBus operations
pub type GeniResult<T> = Result<T, GeniError>;

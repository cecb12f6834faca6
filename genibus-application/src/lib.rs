//! Application layer module for the GENIBus protocol
//!
//! This crate turns class/operation/data-item requests into APDU bytes and
//! reply APDUs back into typed item values.

pub mod apdu;
pub mod value;

pub use apdu::{split_pdu, validate_operation, DataItem, RawApdu, ReplyApdu, RequestApdu, MAX_APDU_DATA_LEN};
pub use value::{decode_items, ItemValue, ReplyItem, ScaleInfo, ScaleRange};

//! Session layer module for the GENIBus protocol
//!
//! Pure byte-level framing of telegrams: header, addresses, PDU payload and
//! the trailing checksum. Class semantics live in the application layer.

pub mod crc;
pub mod reader;
pub mod telegram;

pub use genibus_core::{GeniError, GeniResult};
pub use crc::{Additive16, ChecksumStrategy, Crc16Calc, GeniCrc};
pub use reader::TelegramReader;
pub use telegram::{DecodedTelegram, Telegram, TelegramCodec};

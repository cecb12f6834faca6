//! GENIBus telegram structure and encoding/decoding
//!
//! Wire layout:
//!
//! ```text
//! [SD][LEN][DA][SA][PDU ... 0..=253 bytes][CRC_HI][CRC_LO]
//! ```
//!
//! `LEN` is the number of bytes following the length byte up to but
//! excluding the checksum, i.e. `2 + pdu.len()`. The checksum always occupies
//! the last two bytes and is located from the end of the buffer.

use crate::crc::{ChecksumStrategy, GeniCrc};
use bytes::{BufMut, Bytes, BytesMut};
use genibus_core::byteops::{hex_line, make_word, to_bytes};
use genibus_core::constants::{
    CRC_LEN, DESTINATION_ADDRESS, LENGTH, MAX_PDU_LEN, MAX_TELEGRAM_LEN, MIN_TELEGRAM_LEN,
    PDU_START, SOURCE_ADDRESS, START_DELIMITER,
};
use genibus_core::{Address, FrameError, GeniResult, StartDelimiter, ValidationError};
use std::fmt;
use std::sync::Arc;

/// An encoded telegram, built fresh for every transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    bytes: Bytes,
}

impl Telegram {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn destination(&self) -> Address {
        Address::new(self.bytes[DESTINATION_ADDRESS])
    }

    pub fn source(&self) -> Address {
        Address::new(self.bytes[SOURCE_ADDRESS])
    }

    pub fn pdu(&self) -> &[u8] {
        &self.bytes[PDU_START..self.bytes.len() - CRC_LEN]
    }
}

impl fmt::Display for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_line(&self.bytes))
    }
}

/// A validated inbound telegram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTelegram {
    pub delimiter: StartDelimiter,
    pub destination: Address,
    pub source: Address,
    pub pdu: Bytes,
    pub checksum: u16,
}

/// Telegram encoder/decoder with a pluggable checksum
#[derive(Debug, Clone)]
pub struct TelegramCodec {
    checksum: Arc<dyn ChecksumStrategy>,
}

impl TelegramCodec {
    /// Create a codec using the CRC the units expect
    pub fn new() -> Self {
        Self::with_checksum(Arc::new(GeniCrc))
    }

    pub fn with_checksum(checksum: Arc<dyn ChecksumStrategy>) -> Self {
        Self { checksum }
    }

    /// Encode a telegram
    ///
    /// # Errors
    /// `ValidationError::PduTooLong` if the PDU exceeds 253 bytes.
    pub fn encode(
        &self,
        delimiter: StartDelimiter,
        destination: Address,
        source: Address,
        pdu: &[u8],
    ) -> GeniResult<Telegram> {
        if pdu.len() > MAX_PDU_LEN {
            return Err(ValidationError::PduTooLong {
                len: pdu.len(),
                max: MAX_PDU_LEN,
            }
            .into());
        }
        let total = MIN_TELEGRAM_LEN + pdu.len();
        if total > MAX_TELEGRAM_LEN {
            return Err(ValidationError::TelegramTooLong {
                len: total,
                max: MAX_TELEGRAM_LEN,
            }
            .into());
        }

        let mut buf = BytesMut::with_capacity(total);
        buf.put_u8(delimiter.to_byte());
        buf.put_u8((pdu.len() + PDU_START - DESTINATION_ADDRESS) as u8);
        buf.put_u8(destination.value());
        buf.put_u8(source.value());
        buf.extend_from_slice(pdu);

        let (crc_high, crc_low) = to_bytes(self.checksum.compute(&buf));
        buf.put_u8(crc_high);
        buf.put_u8(crc_low);

        Ok(Telegram { bytes: buf.freeze() })
    }

    /// Decode and validate a telegram
    ///
    /// The checksum is verified before the length field, so any corruption
    /// of the covered bytes surfaces as `ChecksumMismatch`.
    pub fn decode(&self, raw: &[u8], expected: StartDelimiter) -> GeniResult<DecodedTelegram> {
        let len = raw.len();
        if len < MIN_TELEGRAM_LEN {
            return Err(FrameError::TooShort {
                len,
                min: MIN_TELEGRAM_LEN,
            }
            .into());
        }
        if len > MAX_TELEGRAM_LEN {
            return Err(FrameError::TooLong {
                len,
                max: MAX_TELEGRAM_LEN,
            }
            .into());
        }
        if raw[START_DELIMITER] != expected.to_byte() {
            return Err(FrameError::BadDelimiter {
                expected: expected.to_byte(),
                actual: raw[START_DELIMITER],
            }
            .into());
        }

        let crc_start = len - CRC_LEN;
        let received = make_word(raw[crc_start], raw[crc_start + 1]);
        let computed = self.checksum.compute(&raw[..crc_start]);
        if received != computed {
            return Err(FrameError::ChecksumMismatch { computed, received }.into());
        }

        let declared = raw[LENGTH] as usize;
        let actual = crc_start - DESTINATION_ADDRESS;
        if declared != actual {
            return Err(FrameError::LengthMismatch { declared, actual }.into());
        }

        Ok(DecodedTelegram {
            delimiter: expected,
            destination: Address::new(raw[DESTINATION_ADDRESS]),
            source: Address::new(raw[SOURCE_ADDRESS]),
            pdu: Bytes::copy_from_slice(&raw[PDU_START..crc_start]),
            checksum: received,
        })
    }
}

impl Default for TelegramCodec {
    fn default() -> Self {
        Self::new()
    }
}

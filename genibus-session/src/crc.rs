//! Telegram checksum strategies
//!
//! The codec hands a strategy every byte that precedes the checksum field
//! (start delimiter through end of PDU); the strategy decides which of them
//! it covers. Units on the bus use [`GeniCrc`].

use std::fmt;

const INITIAL_CRC: u16 = 0xFFFF;
const FINAL_XOR: u16 = 0xFFFF;
const POLY: u16 = 0x1021; // CCITT, MSB first

/// Precomputed CRC table
static CRC_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for b in 0..=0xFF {
        let mut v = (b as u16) << 8;
        for _ in 0..8 {
            if (v & 0x8000) != 0 {
                v = (v << 1) ^ POLY;
            } else {
                v <<= 1;
            }
        }
        table[b as usize] = v;
    }
    table
});

/// Checksum algorithm used to protect a telegram
pub trait ChecksumStrategy: Send + Sync + fmt::Debug {
    /// Compute the checksum for a telegram prefix
    ///
    /// `preceding` holds every byte in front of the checksum field, starting
    /// with the start delimiter.
    fn compute(&self, preceding: &[u8]) -> u16;
}

/// Incremental CRC-16/GENIBUS calculator
///
/// CCITT polynomial, initial value `0xFFFF`, result inverted.
pub struct Crc16Calc {
    crc_value: u16,
}

impl Crc16Calc {
    /// Create a new CRC calculator
    pub fn new() -> Self {
        Self {
            crc_value: INITIAL_CRC,
        }
    }

    /// Reset the CRC value to initial state
    pub fn reset(&mut self) {
        self.crc_value = INITIAL_CRC;
    }

    /// Update the CRC value with a single byte
    pub fn update(&mut self, data: u8) {
        let index = ((self.crc_value >> 8) ^ data as u16) & 0xFF;
        self.crc_value = (self.crc_value << 8) ^ CRC_TABLE[index as usize];
    }

    /// Update the CRC value with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Finished checksum
    pub fn value(&self) -> u16 {
        self.crc_value ^ FINAL_XOR
    }

    /// Finished checksum as it appears on the wire (high byte first)
    pub fn value_bytes(&self) -> [u8; 2] {
        self.value().to_be_bytes()
    }
}

impl Default for Crc16Calc {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-16/GENIBUS over the length byte through the end of the PDU
///
/// The start delimiter is not covered.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeniCrc;

impl ChecksumStrategy for GeniCrc {
    fn compute(&self, preceding: &[u8]) -> u16 {
        let mut calc = Crc16Calc::new();
        calc.update_bytes(preceding.get(1..).unwrap_or_default());
        calc.value()
    }
}

/// 16-bit wrapping byte sum over the whole telegram prefix
///
/// Only for peers that do not speak CRC, e.g. test rigs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Additive16;

impl ChecksumStrategy for Additive16 {
    fn compute(&self, preceding: &[u8]) -> u16 {
        preceding
            .iter()
            .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_check_value() {
        let mut calc = Crc16Calc::new();
        calc.update_bytes(b"123456789");
        assert_eq!(calc.value(), 0xD64E);
        assert_eq!(calc.value_bytes(), [0xD6, 0x4E]);
    }

    #[test]
    fn test_crc_reset() {
        let mut calc = Crc16Calc::new();
        calc.update(0x01);
        calc.reset();
        assert_eq!(calc.value(), INITIAL_CRC ^ FINAL_XOR);
    }

    #[test]
    fn test_geni_crc_skips_start_delimiter() {
        let request = [0x27, 0x05, 0x20, 0x01, 0x02, 0x01, 0x23];
        assert_eq!(GeniCrc.compute(&request), 0x85BE);

        let mut other_delimiter = request;
        other_delimiter[0] = 0x24;
        assert_eq!(GeniCrc.compute(&other_delimiter), 0x85BE);
        assert_eq!(GeniCrc.compute(&[]), 0x0000);
    }

    #[test]
    fn test_additive_checksum() {
        assert_eq!(Additive16.compute(&[0x01, 0x02, 0x03]), 6);
        assert_eq!(Additive16.compute(&[0xFF; 300]), (0xFFu32 * 300) as u16);
    }
}

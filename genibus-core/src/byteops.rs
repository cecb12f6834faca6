//! Byte/word helpers and hex dumps
//!
//! Inputs are masked rather than rejected, matching hardware register
//! semantics.

/// Combine a high and a low byte into a 16-bit word
pub fn make_word(high: u8, low: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}

pub fn hi_byte(word: u16) -> u8 {
    ((word & 0xFF00) >> 8) as u8
}

pub fn lo_byte(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Split a word into `(high, low)`
pub fn to_bytes(word: u16) -> (u8, u8) {
    (hi_byte(word), lo_byte(word))
}

/// Per-byte hexadecimal rendering, for diagnostics only
pub fn dump_hex(bytes: &[u8]) -> Vec<String> {
    bytes.iter().map(|b| format!("{:#x}", b)).collect()
}

/// Space separated hex dump of a whole buffer
pub fn hex_line(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_word() {
        assert_eq!(make_word(0x0B, 0xB8), 3000);
        assert_eq!(make_word(0xFF, 0xFF), 0xFFFF);
        assert_eq!(make_word(0, 0), 0);
    }

    #[test]
    fn test_split_word() {
        assert_eq!(hi_byte(0x1234), 0x12);
        assert_eq!(lo_byte(0x1234), 0x34);
        assert_eq!(to_bytes(0xABCD), (0xAB, 0xCD));
        for word in [0u16, 1, 0x00FF, 0xFF00, 0x8001, u16::MAX] {
            let (high, low) = to_bytes(word);
            assert_eq!(make_word(high, low), word);
        }
    }

    #[test]
    fn test_dump_hex() {
        assert_eq!(dump_hex(&[0x00, 0x27, 0xFE]), vec!["0x0", "0x27", "0xfe"]);
        assert!(dump_hex(&[]).is_empty());
        assert_eq!(hex_line(&[0x27, 0x0E, 0xFE]), "27 0E FE");
    }
}

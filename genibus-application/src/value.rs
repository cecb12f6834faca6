//! Typed data item values extracted from reply APDUs

use bytes::Bytes;
use genibus_core::{ApduClass, GeniError, GeniResult, Operation, ValueFormat};
use std::fmt;

const SIF_MASK: u8 = 0x03;
const SIF_EXTENDED: u8 = 0x02;
const SCALE_RANGE_LEN: usize = 3;

/// Unit, zero and range bytes of an extended scale record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleRange {
    pub unit: u8,
    pub zero: u8,
    pub range: u8,
}

/// Scale information returned by an INFO request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleInfo {
    pub head: u8,
    pub range: Option<ScaleRange>,
}

impl ScaleInfo {
    /// Record consisting of the head byte only
    ///
    /// The scale information format bits are cleared to 0 if they would
    /// announce a range.
    pub fn head_only(head: u8) -> Self {
        let head = if head & SIF_MASK >= SIF_EXTENDED {
            head & !SIF_MASK
        } else {
            head
        };
        Self { head, range: None }
    }

    /// Record with unit, zero and range; the head announces the extension
    pub fn scaled(head: u8, range: ScaleRange) -> Self {
        let head = if head & SIF_MASK < SIF_EXTENDED {
            (head & !SIF_MASK) | SIF_EXTENDED
        } else {
            head
        };
        Self {
            head,
            range: Some(range),
        }
    }

    /// Scale information format, bits 1..0 of the head
    pub fn sif(&self) -> u8 {
        self.head & SIF_MASK
    }

    pub fn encoded_len(&self) -> usize {
        1 + if self.range.is_some() { SCALE_RANGE_LEN } else { 0 }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.head];
        if let Some(range) = self.range {
            bytes.extend_from_slice(&[range.unit, range.zero, range.range]);
        }
        bytes
    }

    /// Parse one record from the front of `data`
    ///
    /// Returns the record and the number of bytes it used.
    pub fn parse(data: &[u8]) -> GeniResult<(Self, usize)> {
        let (&head, rest) = data
            .split_first()
            .ok_or_else(|| GeniError::ProtocolViolation("Scale information missing".to_string()))?;

        if head & SIF_MASK < SIF_EXTENDED {
            return Ok((Self { head, range: None }, 1));
        }
        match rest {
            [unit, zero, range, ..] => Ok((
                Self {
                    head,
                    range: Some(ScaleRange {
                        unit: *unit,
                        zero: *zero,
                        range: *range,
                    }),
                },
                1 + SCALE_RANGE_LEN,
            )),
            _ => Err(GeniError::ProtocolViolation(format!(
                "Scale information with SIF {} needs {} more bytes, got {}",
                head & SIF_MASK,
                SCALE_RANGE_LEN,
                rest.len()
            ))),
        }
    }
}

/// Decoded value of one data item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValue {
    Unsigned(u32),
    Text(String),
    Scale(ScaleInfo),
    Raw(Bytes),
    /// Written or commanded item; the reply carries no data for it
    Acknowledged,
}

impl ItemValue {
    pub fn as_unsigned(&self) -> Option<u32> {
        match self {
            ItemValue::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ItemValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_scale(&self) -> Option<&ScaleInfo> {
        match self {
            ItemValue::Scale(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ItemValue::Raw(bytes) => Some(bytes.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Unsigned(v) => write!(f, "{}", v),
            ItemValue::Text(s) => f.write_str(s),
            ItemValue::Scale(info) => match info.range {
                Some(r) => write!(
                    f,
                    "head=0x{:02X} unit={} zero={} range={}",
                    info.head, r.unit, r.zero, r.range
                ),
                None => write!(f, "head=0x{:02X}", info.head),
            },
            ItemValue::Raw(bytes) => write!(f, "{} bytes", bytes.len()),
            ItemValue::Acknowledged => f.write_str("OK"),
        }
    }
}

/// One item of a completed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyItem {
    pub id: u8,
    pub value: ItemValue,
}

fn violation(class: ApduClass, operation: Operation, detail: String) -> GeniError {
    GeniError::ProtocolViolation(format!("{} {} reply: {}", class, operation, detail))
}

/// Extract one value per requested identifier from reply data
///
/// The layout follows [`ApduClass::value_format`]. Data that is shorter or
/// longer than the requested items need is a protocol violation.
pub fn decode_items(
    class: ApduClass,
    operation: Operation,
    ids: &[u8],
    data: &[u8],
) -> GeniResult<Vec<ReplyItem>> {
    if operation == Operation::Set {
        if !data.is_empty() {
            return Err(violation(
                class,
                operation,
                format!("unexpected {} data bytes", data.len()),
            ));
        }
        return Ok(ids
            .iter()
            .map(|&id| ReplyItem {
                id,
                value: ItemValue::Acknowledged,
            })
            .collect());
    }

    let mut items = Vec::with_capacity(ids.len());
    let mut rest = data;
    match class.value_format(operation) {
        ValueFormat::None => {}
        ValueFormat::Fixed(width) => {
            let expected = ids.len() * width;
            if data.len() != expected {
                return Err(violation(
                    class,
                    operation,
                    format!("expected {} data bytes, got {}", expected, data.len()),
                ));
            }
            for (&id, chunk) in ids.iter().zip(data.chunks(width)) {
                let value = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
                items.push(ReplyItem {
                    id,
                    value: ItemValue::Unsigned(value),
                });
            }
            rest = &[];
        }
        ValueFormat::Text => {
            for &id in ids {
                let end = rest.iter().position(|&b| b == 0).ok_or_else(|| {
                    violation(class, operation, format!("string for item {} is not terminated", id))
                })?;
                let text = &rest[..end];
                if !text.is_ascii() {
                    return Err(violation(
                        class,
                        operation,
                        format!("string for item {} is not ASCII", id),
                    ));
                }
                items.push(ReplyItem {
                    id,
                    value: ItemValue::Text(text.iter().map(|&b| b as char).collect()),
                });
                rest = &rest[end + 1..];
            }
        }
        ValueFormat::Raw => {
            if ids.len() != 1 {
                return Err(violation(
                    class,
                    operation,
                    format!("raw data answers exactly one item, {} requested", ids.len()),
                ));
            }
            items.push(ReplyItem {
                id: ids[0],
                value: ItemValue::Raw(Bytes::copy_from_slice(data)),
            });
            rest = &[];
        }
        ValueFormat::ScaleInfo => {
            for &id in ids {
                let (info, used) = ScaleInfo::parse(rest)
                    .map_err(|e| violation(class, operation, format!("item {}: {}", id, e)))?;
                items.push(ReplyItem {
                    id,
                    value: ItemValue::Scale(info),
                });
                rest = &rest[used..];
            }
        }
    }

    if !rest.is_empty() {
        return Err(violation(
            class,
            operation,
            format!("{} trailing data bytes", rest.len()),
        ));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measured_data_is_two_bytes_big_endian() {
        let items = decode_items(ApduClass::MeasuredData, Operation::Get, &[0x23], &[0x0B, 0xB8]).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 0x23);
        assert_eq!(items[0].value.as_unsigned(), Some(3000));

        let items = decode_items(
            ApduClass::ReferenceValues,
            Operation::Get,
            &[1, 2],
            &[0xFE, 0x10],
        )
        .unwrap();
        assert_eq!(items[0].value, ItemValue::Unsigned(0xFE));
        assert_eq!(items[1].value, ItemValue::Unsigned(0x10));
    }

    #[test]
    fn test_fixed_width_length_mismatch() {
        assert!(matches!(
            decode_items(ApduClass::MeasuredData, Operation::Get, &[0x23, 0x25], &[0x0B, 0xB8]),
            Err(GeniError::ProtocolViolation(_))
        ));
        assert!(matches!(
            decode_items(ApduClass::ProtocolData, Operation::Get, &[2], &[0x01, 0x02]),
            Err(GeniError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_ascii_strings() {
        let items = decode_items(
            ApduClass::AsciiStrings,
            Operation::Get,
            &[8, 9],
            b"UPE 25-60\0V07\0",
        )
        .unwrap();
        assert_eq!(items[0].value.as_text(), Some("UPE 25-60"));
        assert_eq!(items[1].value.as_text(), Some("V07"));

        assert!(decode_items(ApduClass::AsciiStrings, Operation::Get, &[8], b"UPE").is_err());
    }

    #[test]
    fn test_non_ascii_string_is_rejected() {
        assert!(matches!(
            decode_items(ApduClass::AsciiStrings, Operation::Get, &[8], b"UPE \xB025\0"),
            Err(GeniError::ProtocolViolation(_))
        ));
        assert!(matches!(
            decode_items(ApduClass::AsciiStrings, Operation::Get, &[8], b"\xFF\xFE\0"),
            Err(GeniError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_scale_info() {
        let data = [0x81, 0x82, 0x26, 0x00, 0x64];
        let items = decode_items(ApduClass::MeasuredData, Operation::Info, &[30, 0x23], &data).unwrap();
        let short = items[0].value.as_scale().unwrap();
        assert_eq!(short.sif(), 1);
        assert!(short.range.is_none());
        let long = items[1].value.as_scale().unwrap();
        assert_eq!(long.sif(), 2);
        assert_eq!(
            long.range,
            Some(ScaleRange {
                unit: 0x26,
                zero: 0x00,
                range: 0x64
            })
        );
        assert_eq!(long.to_bytes(), vec![0x82, 0x26, 0x00, 0x64]);

        assert!(decode_items(ApduClass::MeasuredData, Operation::Info, &[0x23], &[0x82, 0x26]).is_err());
        assert!(decode_items(ApduClass::MeasuredData, Operation::Info, &[0x23], &[0x81, 0x00]).is_err());
    }

    #[test]
    fn test_scale_constructors_keep_head_consistent() {
        let scaled = ScaleInfo::scaled(0x80, ScaleRange { unit: 1, zero: 0, range: 10 });
        assert_eq!(scaled.sif(), 2);
        assert_eq!(scaled.encoded_len(), 4);
        let plain = ScaleInfo::head_only(0x82);
        assert_eq!(plain.sif(), 0);
        assert_eq!(plain.encoded_len(), 1);
    }

    #[test]
    fn test_set_reply() {
        let items = decode_items(ApduClass::Commands, Operation::Set, &[6, 7], &[]).unwrap();
        assert!(items.iter().all(|item| item.value == ItemValue::Acknowledged));
        assert!(decode_items(ApduClass::ReferenceValues, Operation::Set, &[1], &[0x00]).is_err());
    }
}

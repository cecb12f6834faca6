//! APDU encoding and decoding
//!
//! A PDU is a plain concatenation of APDUs. Every APDU starts with a two byte
//! header:
//!
//! ```text
//! request: [class][operation << 6 | data_len][data ...]
//! reply:   [class][ack << 6       | data_len][data ...]
//! ```
//!
//! Request data is a list of item identifiers (GET, INFO) or of
//! identifier/value pairs (SET). Value widths come from
//! [`ApduClass::value_format`].

use bytes::{BufMut, Bytes, BytesMut};
use genibus_core::{
    Ack, ApduClass, FrameError, GeniError, GeniResult, Operation, ValidationError, ValueFormat,
};

/// Largest data field an APDU header can describe
pub const MAX_APDU_DATA_LEN: usize = 63;

const APDU_HEADER_LEN: usize = 2;
const SPECIFIER_SHIFT: u8 = 6;
const LENGTH_MASK: u8 = 0x3F;

/// Check that this client may issue `operation` on `class`
///
/// Capability is checked first, so any pair missing from the capability
/// table reports `IllegalOperation` even for classes the client does not
/// handle.
pub fn validate_operation(class: ApduClass, operation: Operation) -> GeniResult<()> {
    if !class.supports(operation) {
        return Err(ValidationError::IllegalOperation { class, operation }.into());
    }
    if !class.is_supported() {
        return Err(ValidationError::UnsupportedClass(class).into());
    }
    Ok(())
}

/// APDU exactly as found on the wire, before class semantics are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawApdu {
    pub class: u8,
    /// Operation specifier (requests) or acknowledgement code (replies)
    pub specifier: u8,
    pub data: Bytes,
}

impl RawApdu {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.class);
        buf.put_u8((self.specifier << SPECIFIER_SHIFT) | (self.data.len() as u8 & LENGTH_MASK));
        buf.extend_from_slice(&self.data);
    }
}

/// Split a PDU into its APDUs
///
/// # Errors
/// `FrameError::MalformedPdu` if the PDU ends inside an APDU header or an
/// APDU's declared data length runs past the end of the PDU.
pub fn split_pdu(pdu: &Bytes) -> GeniResult<Vec<RawApdu>> {
    let mut apdus = Vec::new();
    let mut pos = 0;
    while pos < pdu.len() {
        if pdu.len() - pos < APDU_HEADER_LEN {
            return Err(FrameError::MalformedPdu(format!(
                "APDU header truncated at offset {}",
                pos
            ))
            .into());
        }
        let class = pdu[pos];
        let header = pdu[pos + 1];
        let start = pos + APDU_HEADER_LEN;
        let end = start + (header & LENGTH_MASK) as usize;
        if end > pdu.len() {
            return Err(FrameError::MalformedPdu(format!(
                "APDU at offset {} declares {} data bytes, only {} left",
                pos,
                end - start,
                pdu.len() - start
            ))
            .into());
        }
        apdus.push(RawApdu {
            class,
            specifier: header >> SPECIFIER_SHIFT,
            data: pdu.slice(start..end),
        });
        pos = end;
    }
    Ok(apdus)
}

/// One data item of a request: identifier plus, for SET, its value bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    id: u8,
    value: Option<Bytes>,
}

impl DataItem {
    /// Item without a value (GET, INFO, commands)
    pub fn new(id: u8) -> Self {
        Self { id, value: None }
    }

    pub fn with_value(id: u8, value: impl Into<Bytes>) -> Self {
        Self {
            id,
            value: Some(value.into()),
        }
    }

    pub fn with_u8(id: u8, value: u8) -> Self {
        Self::with_value(id, vec![value])
    }

    /// Item carrying a 16-bit value, high byte first
    pub fn with_u16(id: u8, value: u16) -> Self {
        Self::with_value(id, value.to_be_bytes().to_vec())
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    fn encoded_len(&self) -> usize {
        1 + self.value.as_ref().map_or(0, |v| v.len())
    }
}

/// Request APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestApdu {
    class: ApduClass,
    operation: Operation,
    items: Vec<DataItem>,
}

impl RequestApdu {
    /// Build a validated request APDU
    ///
    /// Nothing is encoded if the class/operation pair is not allowed, the
    /// request is empty, a value does not match the class layout or the data
    /// does not fit one APDU.
    pub fn new(class: ApduClass, operation: Operation, items: Vec<DataItem>) -> GeniResult<Self> {
        validate_operation(class, operation)?;
        if items.is_empty() {
            return Err(ValidationError::EmptyRequest.into());
        }

        let format = class.value_format(operation);
        for item in &items {
            Self::check_item(operation, format, item)?;
        }

        let request = Self {
            class,
            operation,
            items,
        };
        let len = request.data_len();
        if len > MAX_APDU_DATA_LEN {
            return Err(ValidationError::ApduTooLong {
                len,
                max: MAX_APDU_DATA_LEN,
            }
            .into());
        }
        Ok(request)
    }

    fn check_item(operation: Operation, format: ValueFormat, item: &DataItem) -> GeniResult<()> {
        let id = item.id;
        match (operation, format, item.value()) {
            (Operation::Get | Operation::Info, _, Some(_)) => {
                Err(ValidationError::UnexpectedValue { id }.into())
            }
            (Operation::Get | Operation::Info, _, None) => Ok(()),
            (Operation::Set, ValueFormat::None, Some(_)) => {
                Err(ValidationError::UnexpectedValue { id }.into())
            }
            (Operation::Set, ValueFormat::None, None) => Ok(()),
            (Operation::Set, _, None) => Err(ValidationError::MissingValue { id }.into()),
            (Operation::Set, ValueFormat::Fixed(expected), Some(value)) if value.len() != expected => {
                Err(ValidationError::ValueWidth {
                    id,
                    expected,
                    actual: value.len(),
                }
                .into())
            }
            (Operation::Set, _, Some(_)) => Ok(()),
        }
    }

    /// GET request for the given identifiers
    pub fn get(class: ApduClass, ids: &[u8]) -> GeniResult<Self> {
        Self::new(class, Operation::Get, ids.iter().copied().map(DataItem::new).collect())
    }

    /// INFO request for the given identifiers
    pub fn info(class: ApduClass, ids: &[u8]) -> GeniResult<Self> {
        Self::new(class, Operation::Info, ids.iter().copied().map(DataItem::new).collect())
    }

    pub fn set(class: ApduClass, items: Vec<DataItem>) -> GeniResult<Self> {
        Self::new(class, Operation::Set, items)
    }

    /// Parse a request APDU as a unit sees it
    ///
    /// Only the byte layout is checked. Whether the class or operation is
    /// acceptable is left to the caller, which answers with an
    /// acknowledgement code instead of failing.
    pub fn from_raw(raw: &RawApdu) -> GeniResult<Self> {
        let class = ApduClass::try_from(raw.class)?;
        let operation = Operation::try_from(raw.specifier)?;
        let data = &raw.data;

        let items = match (operation, class.value_format(operation)) {
            (Operation::Get | Operation::Info, _) | (Operation::Set, ValueFormat::None) => {
                data.iter().copied().map(DataItem::new).collect()
            }
            (Operation::Set, ValueFormat::Fixed(width)) => {
                if data.len() % (width + 1) != 0 {
                    return Err(FrameError::MalformedPdu(format!(
                        "{} SET data of {} bytes is not a list of {} byte values",
                        class,
                        data.len(),
                        width
                    ))
                    .into());
                }
                data.chunks(width + 1)
                    .map(|chunk| DataItem::with_value(chunk[0], chunk[1..].to_vec()))
                    .collect()
            }
            (Operation::Set, _) => match data.split_first() {
                Some((&id, value)) => vec![DataItem::with_value(id, value.to_vec())],
                None => Vec::new(),
            },
        };

        Ok(Self {
            class,
            operation,
            items,
        })
    }

    pub fn class(&self) -> ApduClass {
        self.class
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn items(&self) -> &[DataItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<u8> {
        self.items.iter().map(DataItem::id).collect()
    }

    /// Length of the data field in bytes
    pub fn data_len(&self) -> usize {
        self.items.iter().map(DataItem::encoded_len).sum()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.class.value());
        buf.put_u8((self.operation.value() << SPECIFIER_SHIFT) | self.data_len() as u8);
        for item in &self.items {
            buf.put_u8(item.id);
            if let Some(value) = &item.value {
                buf.extend_from_slice(value);
            }
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(APDU_HEADER_LEN + self.data_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Reply APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyApdu {
    pub class: ApduClass,
    pub ack: Ack,
    pub data: Bytes,
}

impl ReplyApdu {
    pub fn new(class: ApduClass, ack: Ack, data: impl Into<Bytes>) -> GeniResult<Self> {
        let data = data.into();
        if data.len() > MAX_APDU_DATA_LEN {
            return Err(ValidationError::ApduTooLong {
                len: data.len(),
                max: MAX_APDU_DATA_LEN,
            }
            .into());
        }
        Ok(Self { class, ack, data })
    }

    /// Reply without data, e.g. a negative acknowledgement
    pub fn empty(class: ApduClass, ack: Ack) -> Self {
        Self {
            class,
            ack,
            data: Bytes::new(),
        }
    }

    pub fn from_raw(raw: &RawApdu) -> GeniResult<Self> {
        let class = ApduClass::try_from(raw.class)?;
        let ack = Ack::try_from(raw.specifier)?;
        Ok(Self {
            class,
            ack,
            data: raw.data.clone(),
        })
    }

    /// Fail with the acknowledgement if the unit rejected the request
    pub fn check_ack(&self) -> GeniResult<()> {
        if self.ack.is_ok() {
            Ok(())
        } else {
            Err(GeniError::NegativeAck {
                class: self.class,
                ack: self.ack,
            })
        }
    }

    pub fn to_raw(&self) -> RawApdu {
        RawApdu {
            class: self.class.value(),
            specifier: self.ack.value(),
            data: self.data.clone(),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.to_raw().encode(buf);
    }
}

//! Simulated GENIBus unit
//!
//! A unit holds a register table keyed by (class, item id) and answers
//! request APDUs like a slave on the bus:
//!
//! - class undefined or not served by the unit: `CLASS_UNKNOWN`
//! - operation outside the class capabilities or the item's access mode:
//!   `OPERATION_ILLEGAL`
//! - item not in the table: `ID_UNKNOWN`
//!
//! A rejected APDU changes nothing, even if some of its items were valid.

use bytes::{Bytes, BytesMut};
use genibus_application::{
    split_pdu, RawApdu, ReplyApdu, RequestApdu, ScaleInfo, ScaleRange, MAX_APDU_DATA_LEN,
};
use genibus_core::items::DATA_POINTS;
use genibus_core::{Access, Ack, Address, ApduClass, GeniResult, Operation, ValueFormat};
use std::collections::BTreeMap;

/// Scale record reported for items without a specific one
const DEFAULT_SCALE: ScaleInfo = ScaleInfo {
    head: 0x81,
    range: None,
};

/// One data item held by the unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    /// Value bytes in the class layout (text without terminator)
    pub value: Vec<u8>,
    pub access: Access,
    pub scale: Option<ScaleInfo>,
}

impl Register {
    pub fn new(value: impl Into<Vec<u8>>, access: Access) -> Self {
        Self {
            value: value.into(),
            access,
            scale: None,
        }
    }

    pub fn with_scale(mut self, scale: ScaleInfo) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// A simulated slave unit
#[derive(Debug, Clone)]
pub struct SimulatedUnit {
    address: Address,
    registers: BTreeMap<(ApduClass, u8), Register>,
    commands: Vec<u8>,
}

impl SimulatedUnit {
    /// Create a unit with an empty register table
    pub fn new(address: Address) -> Self {
        Self {
            address,
            registers: BTreeMap::new(),
            commands: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn set_address(&mut self, address: Address) {
        self.address = address;
    }

    pub fn insert(&mut self, class: ApduClass, id: u8, register: Register) {
        self.registers.insert((class, id), register);
    }

    pub fn register(&self, class: ApduClass, id: u8) -> Option<&Register> {
        self.registers.get(&(class, id))
    }

    pub fn value(&self, class: ApduClass, id: u8) -> Option<&[u8]> {
        self.register(class, id).map(|r| r.value.as_slice())
    }

    /// Overwrite a value as the unit itself would, e.g. a new measurement
    pub fn update(&mut self, class: ApduClass, id: u8, value: impl Into<Vec<u8>>) -> bool {
        match self.registers.get_mut(&(class, id)) {
            Some(register) => {
                register.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Commands received so far, oldest first
    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    /// Whether the unit has any item of `class`
    pub fn serves(&self, class: ApduClass) -> bool {
        self.registers.keys().any(|(c, _)| *c == class)
    }

    /// Whether a telegram sent to `destination` concerns this unit
    pub fn accepts(&self, destination: Address) -> bool {
        destination == self.address || destination.is_connection_request() || destination.is_broadcast()
    }

    /// Answer a request PDU with a reply PDU, one reply APDU per request APDU
    pub fn handle_pdu(&mut self, pdu: &Bytes) -> GeniResult<Bytes> {
        let mut reply = BytesMut::new();
        for raw in split_pdu(pdu)? {
            self.handle_apdu(&raw).encode(&mut reply);
        }
        Ok(reply.freeze())
    }

    fn handle_apdu(&mut self, raw: &RawApdu) -> RawApdu {
        let class = match ApduClass::try_from(raw.class) {
            Ok(class) if self.serves(class) => class,
            _ => {
                log::debug!("Unit {}: class {} unknown", self.address, raw.class);
                return RawApdu {
                    class: raw.class,
                    specifier: Ack::ClassUnknown.value(),
                    data: Bytes::new(),
                };
            }
        };

        let request = match Operation::try_from(raw.specifier) {
            Ok(operation) if class.supports(operation) => RequestApdu::from_raw(raw),
            _ => return ReplyApdu::empty(class, Ack::OperationIllegal).to_raw(),
        };
        let reply = match request {
            Ok(request) => match self.answer(&request) {
                Ok(data) => ReplyApdu {
                    class,
                    ack: Ack::Ok,
                    data: Bytes::from(data),
                },
                Err(ack) => ReplyApdu::empty(class, ack),
            },
            Err(_) => ReplyApdu::empty(class, Ack::OperationIllegal),
        };
        log::debug!(
            "Unit {}: {} {} {:?} -> {}",
            self.address,
            class,
            raw.specifier,
            raw.data.as_ref(),
            reply.ack
        );
        reply.to_raw()
    }

    fn answer(&mut self, request: &RequestApdu) -> Result<Vec<u8>, Ack> {
        let class = request.class();
        let operation = request.operation();
        let format = class.value_format(operation);

        for item in request.items() {
            let register = self.registers.get(&(class, item.id())).ok_or(Ack::IdUnknown)?;
            if !register.access.permits(operation) {
                return Err(Ack::OperationIllegal);
            }
            if let (Operation::Set, ValueFormat::Fixed(width)) = (operation, format) {
                if item.value().map_or(0, <[u8]>::len) != width {
                    return Err(Ack::OperationIllegal);
                }
            }
        }

        let mut data = Vec::new();
        for item in request.items() {
            let key = (class, item.id());
            match operation {
                Operation::Get => {
                    if let Some(register) = self.registers.get(&key) {
                        data.extend_from_slice(&register.value);
                        if format == ValueFormat::Text {
                            data.push(0);
                        }
                    }
                }
                Operation::Info => {
                    if let Some(register) = self.registers.get(&key) {
                        data.extend(register.scale.unwrap_or(DEFAULT_SCALE).to_bytes());
                    }
                }
                Operation::Set => {
                    if format == ValueFormat::None {
                        self.commands.push(item.id());
                    } else if let Some(register) = self.registers.get_mut(&key) {
                        register.value = item.value().unwrap_or_default().to_vec();
                    }
                }
            }
        }

        if data.len() > MAX_APDU_DATA_LEN {
            return Err(Ack::OperationIllegal);
        }
        Ok(data)
    }

    /// A circulator pump with measured values, reference values, product
    /// strings and scale information
    pub fn pump(address: Address) -> Self {
        let mut unit = Self::new(address);
        for point in DATA_POINTS {
            let value = match point.class.value_format(Operation::Get) {
                ValueFormat::Fixed(width) => {
                    let number = pump_number(point.name, address);
                    number.to_be_bytes()[4 - width..].to_vec()
                }
                ValueFormat::Text => pump_text(point.name).as_bytes().to_vec(),
                _ => Vec::new(),
            };
            let mut register = Register::new(value, point.access);
            if let Some(scale) = pump_scale(point.name) {
                register = register.with_scale(scale);
            }
            unit.insert(point.class, point.id, register);
        }
        unit
    }
}

fn pump_number(name: &str, address: Address) -> u32 {
    match name {
        "df_buf_len" => 70,
        "unit_bus_mode" => 0x0E,
        "t_2hour_lo" => 0x2A30,
        "i_dc" => 12,
        "v_dc" => 230,
        "t_e" => 45,
        "t_m" => 40,
        "i_mo" => 30,
        "i_line" => 35,
        "f_act" => 200,
        "p" => 95,
        "speed" => 3000,
        "h" => 450,
        "q" => 120,
        "unit_family" => 1,
        "unit_type" => 2,
        "unit_version" => 3,
        "energy_lo" => 1234,
        "unit_addr" => address.unit_number().unwrap_or(0) as u32,
        "h_const_ref_min" => 10,
        "h_const_ref_max" => 200,
        "ref_rem" => 0xFE,
        _ => 0,
    }
}

fn pump_text(name: &str) -> &'static str {
    match name {
        "product_name" => "UPE 25-60 A",
        "software_name1" => "V07.02",
        "compile_date1" => "2012-06-01",
        "protocol_code" => "GENIbus 5",
        "developers" => "GeniControl",
        "rtos_code" => "none",
        _ => "",
    }
}

fn pump_scale(name: &str) -> Option<ScaleInfo> {
    let (unit, range) = match name {
        "speed" => (38, 0xFF),
        "h" => (24, 0x64),
        "q" => (22, 0xC8),
        "p" => (9, 0xFA),
        _ => return None,
    };
    Some(ScaleInfo::scaled(0x82, ScaleRange { unit, zero: 0, range }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: Address = Address::new(0x20);

    fn ask(unit: &mut SimulatedUnit, pdu: &'static [u8]) -> Vec<u8> {
        unit.handle_pdu(&Bytes::from_static(pdu)).unwrap().to_vec()
    }

    #[test]
    fn test_pump_answers_get() {
        let mut unit = SimulatedUnit::pump(UNIT);
        assert_eq!(ask(&mut unit, &[0x02, 0x01, 0x23]), vec![0x02, 0x02, 0x0B, 0xB8]);
        assert_eq!(ask(&mut unit, &[0x00, 0x02, 0x02, 0x03]), vec![0x00, 0x02, 70, 0x0E]);
        assert_eq!(
            ask(&mut unit, &[0x07, 0x01, 0x03]),
            b"\x07\x07V07.02\0".to_vec()
        );
    }

    #[test]
    fn test_pump_answers_info() {
        let mut unit = SimulatedUnit::pump(UNIT);
        assert_eq!(
            ask(&mut unit, &[0x02, 0xC2, 0x23, 0x20]),
            vec![0x02, 0x05, 0x82, 38, 0, 0xFF, 0x81]
        );
    }

    #[test]
    fn test_negative_acks() {
        let mut unit = SimulatedUnit::pump(UNIT);
        // Class not served
        assert_eq!(ask(&mut unit, &[0x01, 0x01, 0x02]), vec![0x01, 0x40]);
        // Undefined class
        assert_eq!(ask(&mut unit, &[0x1F, 0x00]), vec![0x1F, 0x40]);
        // GET on commands
        assert_eq!(ask(&mut unit, &[0x03, 0x01, 0x06]), vec![0x03, 0xC0]);
        // SET on measured data
        assert_eq!(ask(&mut unit, &[0x02, 0x83, 0x23, 0x00, 0x01]), vec![0x02, 0xC0]);
        // Wrong value width
        assert_eq!(ask(&mut unit, &[0x05, 0x83, 0x01, 0x00, 0x01]), vec![0x05, 0xC0]);
        // Unknown item
        assert_eq!(ask(&mut unit, &[0x02, 0x01, 0xFA]), vec![0x02, 0x80]);
    }

    #[test]
    fn test_access_mode() {
        let mut unit = SimulatedUnit::new(UNIT);
        unit.insert(ApduClass::ReferenceValues, 1, Register::new(vec![0x10], Access::ReadOnly));
        unit.insert(ApduClass::ReferenceValues, 2, Register::new(vec![0x20], Access::WriteOnly));

        assert_eq!(ask(&mut unit, &[0x05, 0x82, 0x01, 0x11]), vec![0x05, 0xC0]);
        assert_eq!(ask(&mut unit, &[0x05, 0x01, 0x02]), vec![0x05, 0xC0]);
        assert_eq!(ask(&mut unit, &[0x05, 0x82, 0x02, 0x21]), vec![0x05, 0x00]);
        assert_eq!(ask(&mut unit, &[0x05, 0xC1, 0x02]), vec![0x05, 0x01, 0x81]);
    }

    #[test]
    fn test_set_and_commands() {
        let mut unit = SimulatedUnit::pump(UNIT);
        assert_eq!(ask(&mut unit, &[0x05, 0x82, 0x01, 0x40]), vec![0x05, 0x00]);
        assert_eq!(unit.value(ApduClass::ReferenceValues, 1), Some(&[0x40][..]));

        assert_eq!(ask(&mut unit, &[0x03, 0x82, 0x07, 0x06]), vec![0x03, 0x00]);
        assert_eq!(unit.commands(), &[7, 6]);

        // A rejected APDU writes nothing
        assert_eq!(ask(&mut unit, &[0x05, 0x84, 0x01, 0x10, 0x09, 0x10]), vec![0x05, 0x80]);
        assert_eq!(unit.value(ApduClass::ReferenceValues, 1), Some(&[0x40][..]));
    }

    #[test]
    fn test_multiple_apdus() {
        let mut unit = SimulatedUnit::pump(UNIT);
        assert_eq!(
            ask(&mut unit, &[0x02, 0x01, 0x23, 0x05, 0x01, 0x01]),
            vec![0x02, 0x02, 0x0B, 0xB8, 0x05, 0x01, 0xFE]
        );
    }

    #[test]
    fn test_update_and_accepts() {
        let mut unit = SimulatedUnit::new(UNIT);
        assert!(!unit.update(ApduClass::MeasuredData, 35, vec![0, 1]));
        unit.insert(
            ApduClass::MeasuredData,
            35,
            Register::new(vec![0, 1], Access::ReadOnly),
        );
        assert!(unit.update(ApduClass::MeasuredData, 35, vec![0, 2]));
        assert_eq!(unit.value(ApduClass::MeasuredData, 35), Some(&[0, 2][..]));

        assert!(unit.accepts(UNIT));
        assert!(unit.accepts(Address::CONNECTION_REQUEST));
        assert!(unit.accepts(Address::BROADCAST));
        assert!(!unit.accepts(Address::new(0x21)));
    }
}

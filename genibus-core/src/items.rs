//! Well-known data items of Grundfos circulator pumps
//!
//! Maps item names to their class and identifier. The codec never needs
//! this table; it is lookup data for tools and the simulator.

use crate::constants::{Access, ApduClass};

/// A named data item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPoint {
    pub name: &'static str,
    pub class: ApduClass,
    pub id: u8,
    pub access: Access,
}

const fn point(name: &'static str, class: ApduClass, id: u8, access: Access) -> DataPoint {
    DataPoint {
        name,
        class,
        id,
        access,
    }
}

use Access::{ReadOnly as RO, ReadWrite as RW, WriteOnly as WO};
use ApduClass::{
    AsciiStrings, Commands, ConfigurationParameters, MeasuredData, ProtocolData, ReferenceValues,
};

pub static DATA_POINTS: &[DataPoint] = &[
    point("df_buf_len", ProtocolData, 2, RO),
    point("unit_bus_mode", ProtocolData, 3, RO),
    point("t_2hour_hi", MeasuredData, 24, RO),
    point("t_2hour_lo", MeasuredData, 25, RO),
    point("i_dc", MeasuredData, 26, RO),
    point("v_dc", MeasuredData, 27, RO),
    point("t_e", MeasuredData, 28, RO),
    point("t_m", MeasuredData, 29, RO),
    point("i_mo", MeasuredData, 30, RO),
    point("i_line", MeasuredData, 31, RO),
    point("f_act", MeasuredData, 32, RO),
    point("p", MeasuredData, 34, RO),
    point("speed", MeasuredData, 35, RO),
    point("h", MeasuredData, 37, RO),
    point("q", MeasuredData, 39, RO),
    point("act_mode1", MeasuredData, 81, RO),
    point("act_mode2", MeasuredData, 82, RO),
    point("act_mode3", MeasuredData, 83, RO),
    point("unit_family", MeasuredData, 148, RO),
    point("unit_type", MeasuredData, 149, RO),
    point("unit_version", MeasuredData, 150, RO),
    point("energy_hi", MeasuredData, 152, RO),
    point("energy_lo", MeasuredData, 153, RO),
    point("alarm_code", MeasuredData, 158, RO),
    point("reset", Commands, 1, WO),
    point("reset_alarm", Commands, 2, WO),
    point("stop", Commands, 5, WO),
    point("start", Commands, 6, WO),
    point("remote", Commands, 7, WO),
    point("local", Commands, 8, WO),
    point("const_freq", Commands, 22, WO),
    point("prop_press", Commands, 23, WO),
    point("const_press", Commands, 24, WO),
    point("min", Commands, 25, WO),
    point("max", Commands, 26, WO),
    point("unit_addr", ConfigurationParameters, 46, RW),
    point("group_addr", ConfigurationParameters, 47, RW),
    point("h_const_ref_min", ConfigurationParameters, 83, RW),
    point("h_const_ref_max", ConfigurationParameters, 84, RW),
    point("ref_rem", ReferenceValues, 1, RW),
    point("ref_ir", ReferenceValues, 2, RW),
    point("ref_att_rem", ReferenceValues, 3, RW),
    point("compile_date1", AsciiStrings, 2, RO),
    point("software_name1", AsciiStrings, 3, RO),
    point("protocol_code", AsciiStrings, 5, RO),
    point("rtos_code", AsciiStrings, 6, RO),
    point("developers", AsciiStrings, 7, RO),
    point("product_name", AsciiStrings, 8, RO),
];

/// Find a data item by name
pub fn lookup(name: &str) -> Option<&'static DataPoint> {
    DATA_POINTS.iter().find(|p| p.name == name)
}

/// Find a data item by class and identifier
pub fn find(class: ApduClass, id: u8) -> Option<&'static DataPoint> {
    DATA_POINTS.iter().find(|p| p.class == class && p.id == id)
}

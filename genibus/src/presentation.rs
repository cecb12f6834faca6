//! Presentation metadata for data items
//!
//! Labels and engineering units for the items a control panel shows. The
//! protocol crates never consult these tables.

use genibus_application::{ItemValue, ScaleInfo};
use std::fmt;

/// Scale information as shown to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Info {
    pub head: u8,
    pub unit: u8,
    pub zero: u8,
    pub range: u8,
}

impl From<&ScaleInfo> for Info {
    fn from(scale: &ScaleInfo) -> Self {
        let (unit, zero, range) = scale
            .range
            .map(|r| (r.unit, r.zero, r.range))
            .unwrap_or_default();
        Self {
            head: scale.head,
            unit,
            zero,
            range,
        }
    }
}

/// A named data item with its last value and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    pub value: Option<ItemValue>,
    pub info: Option<Info>,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            info: None,
        }
    }

    pub fn with_value(mut self, value: ItemValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_info(mut self, info: Info) -> Self {
        self.info = Some(info);
        self
    }
}

/// Display label of a data item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub name: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            f.write_str(self.label)
        } else {
            write!(f, "{} [{}]", self.label, self.unit)
        }
    }
}

const fn label_of(name: &'static str, label: &'static str, unit: &'static str) -> Label {
    Label { name, label, unit }
}

pub static MEAS_VALUES: &[Label] = &[
    label_of("speed", "Speed", "rpm"),
    label_of("h", "Head", "m"),
    label_of("q", "Flowrate", "m3/h"),
    label_of("p", "Power", "W"),
    label_of("energy_hi", "Energy", "kWh"),
    label_of("t_2hour_hi", "Hours", "h"),
    label_of("f_act", "Performance", "%"),
    label_of("unit_family", "Unit family code", ""),
    label_of("unit_type", "Unit type code", ""),
];

pub static REF_VALUES: &[Label] = &[
    label_of("ref_rem", "GENIBus ref.", "%"),
    label_of("ref_ir", "GENIlink ref.", "%"),
    label_of("ref_att_rem", "Ext. Analogue", "%"),
];

pub static STRING_VALUES: &[Label] = &[
    label_of("product_name", "Product name", ""),
    label_of("software_name1", "Software name", ""),
    label_of("compile_date1", "Compilation date", ""),
    label_of("protocol_code", "Protocol code", ""),
    label_of("developers", "Developers", ""),
    label_of("rtos_code", "RTOS code", ""),
];

/// Items whose scale can be queried with an INFO request
pub static INFO_VALUES: &[&str] = &[
    "t_2hour_hi", "i_dc", "v_dc", "t_e", "t_m", "i_mo", "i_line", "f_act", "p", "speed", "h", "q",
    "ref_rem", "ref_att_rem", "ref_ir", "min_curve_no", "h_prop_ref_min", "h_prop_ref_max",
    "group_addr", "unit_addr", "h_const_ref_max", "h_const_ref_min", "ref_steps", "t_2hour_lo",
    "energy_lo", "ref_loc", "p_max", "q_kn1", "q_max", "h_max", "ind_alarm_bak", "led_contr",
    "ref_act", "ref_inf", "t_w", "ref_att_loc", "sys_ref", "start_alarm1", "start_alarm2",
    "qsd_alarm1", "qsd_alarm2", "stop_alarm1", "stop_alarm2", "surv_alarm1", "surv_alarm2",
    "ind_alarm", "start_alarm1_bak", "start_alarm2_bak", "qsd_alarm1_bak", "qsd_alarm2_bak",
    "stop_alarm1_bak", "stop_alarm2_bak", "surv_alarm1_bak", "surv_alarm2_bak", "act_mode1",
    "act_mode2", "act_mode3", "loc_setup1", "rem_setup1", "extern_inputs", "contr_source",
    "stop_alarm3", "stop_alarm3_bak", "curve_no_ref", "contr_ref", "unit_family", "unit_type",
    "unit_version", "energy_hi", "alarm_code_disp", "alarm_code", "alarm_log_1", "alarm_log_2",
    "alarm_log_3", "alarm_log_4", "alarm_log_5", "twin_pump_mode",
];

/// Look up the label of an item in any of the tables
pub fn label(name: &str) -> Option<&'static Label> {
    MEAS_VALUES
        .iter()
        .chain(REF_VALUES)
        .chain(STRING_VALUES)
        .find(|l| l.name == name)
}

pub fn supports_info(name: &str) -> bool {
    INFO_VALUES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genibus_application::ScaleRange;
    use genibus_core::items;

    #[test]
    fn test_label_lookup() {
        let speed = label("speed").unwrap();
        assert_eq!(speed.label, "Speed");
        assert_eq!(speed.to_string(), "Speed [rpm]");
        assert_eq!(label("product_name").unwrap().to_string(), "Product name");
        assert_eq!(label("ref_ir").unwrap().unit, "%");
        assert!(label("alarm_code").is_none());

        assert!(supports_info("speed"));
        assert!(!supports_info("product_name"));
    }

    #[test]
    fn test_labelled_items_are_known() {
        for l in MEAS_VALUES.iter().chain(REF_VALUES).chain(STRING_VALUES) {
            assert!(items::lookup(l.name).is_some(), "no data point for {}", l.name);
        }
    }

    #[test]
    fn test_info_from_scale() {
        let info = Info::from(&ScaleInfo::scaled(0x82, ScaleRange { unit: 38, zero: 0, range: 0xFF }));
        assert_eq!(info, Info { head: 0x82, unit: 38, zero: 0, range: 0xFF });
        assert_eq!(Info::from(&ScaleInfo::head_only(0x81)), Info { head: 0x81, ..Info::default() });

        let item = Item::new("speed").with_value(ItemValue::Unsigned(3000)).with_info(info);
        assert_eq!(item.value.as_ref().and_then(ItemValue::as_unsigned), Some(3000));
        assert_eq!(item.info.map(|i| i.unit), Some(38));
    }
}

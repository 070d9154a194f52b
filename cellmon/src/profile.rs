//! Vendor command profiles. Each profile names the command that reports the
//! serving cell on that vendor's modems; every other poll command is standard.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandProfile {
    pub vendor: &'static str,
    pub serving_cell_command: &'static str,
}

impl CommandProfile {
    const fn new(vendor: &'static str, serving_cell_command: &'static str) -> Self {
        Self {
            vendor,
            serving_cell_command,
        }
    }
}

impl fmt::Display for CommandProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.vendor, self.serving_cell_command)
    }
}

pub const PROFILES: &[CommandProfile] = &[
    CommandProfile::new("Generic mobile", "AT+EINFO"),
    CommandProfile::new("Dell", "AT+COPS=3,0;+COPS?"),
    CommandProfile::new("Ericsson", "AT+SURSERV"),
    CommandProfile::new("Gemalto/Cinterion", "AT^SMONI"),
    CommandProfile::new("Huawei", "AT^HCSQ?"),
    CommandProfile::new("Intel", "AT+XREG?"),
    CommandProfile::new("MediaTek", "AT+EMSRV?"),
    CommandProfile::new("Neul/HiSilicon", "AT+NUESTATS"),
    CommandProfile::new("Qualcomm", "AT$QCRSRP"),
    CommandProfile::new("Quectel", "AT+QENG=\"servingcell\""),
    CommandProfile::new("Samsung", "AT+MODEMINFO"),
    CommandProfile::new("Sierra Wireless", "AT!GSTATUS?"),
    CommandProfile::new("SimCom", "AT+CPSI?"),
    CommandProfile::new("Telit", "AT#RFSTS"),
    CommandProfile::new("u-blox", "AT+UCEDATA?"),
    CommandProfile::new("ZTE", "AT+ZCELLINFO?"),
];

pub fn by_index(index: usize) -> Option<&'static CommandProfile> {
    PROFILES.get(index)
}

/// Index of the profile after `index`, wrapping at the end of the table.
pub fn next_index(index: usize) -> usize {
    (index + 1) % PROFILES.len()
}

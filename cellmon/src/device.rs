//! Device and SIM identity read once at connect time.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::parser::PLACEHOLDER;

pub const IMEI_COMMAND: &str = "AT+GSN";
pub const MANUFACTURER_COMMAND: &str = "AT+CGMI";
pub const MODEL_COMMAND: &str = "AT+CGMM";
pub const REVISION_COMMAND: &str = "AT+CGMR";
pub const IMSI_COMMAND: &str = "AT+CIMI";
pub const NUMBER_COMMAND: &str = "AT+CNUM";

/// Tried in order, the first reply carrying a plausible ICCID wins.
pub const ICCID_COMMANDS: &[&str] = &[
    "AT+CCID",
    "AT^ICCID?",
    "AT+QCCID",
    "AT+CRSM=176,12258,0,0,10",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub imei: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub revision: Option<String>,
    pub iccid: Option<String>,
    pub imsi: Option<String>,
    pub number: Option<String>,
}

impl DeviceIdentity {
    /// `(label, value)` pairs in display order, missing values as `--`.
    pub fn rows(&self) -> [(&'static str, &str); 7] {
        fn show(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or(PLACEHOLDER)
        }

        [
            ("IMEI", show(&self.imei)),
            ("Manufacturer", show(&self.manufacturer)),
            ("Model", show(&self.model)),
            ("Revision", show(&self.revision)),
            ("ICCID", show(&self.iccid)),
            ("IMSI", show(&self.imsi)),
            ("Number", show(&self.number)),
        ]
    }
}

/// First line that is neither the echoed command, a final result code nor an
/// unsolicited `*` line.
pub fn info_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty()
                && !line.starts_with("AT")
                && !line.starts_with("OK")
                && !line.starts_with('*')
        })
        .map(str::to_string)
}

pub fn parse_iccid(text: &str) -> Option<String> {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{15,22}").unwrap());
    RE.find(text).map(|m| m.as_str().to_string())
}

pub fn parse_imsi(text: &str) -> Option<String> {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{10,20}").unwrap());
    RE.find(text).map(|m| m.as_str().to_string())
}

/// First quoted number of a `+CNUM` reply.
pub fn parse_number(text: &str) -> Option<String> {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""(\+?\d+)""#).unwrap());
    RE.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

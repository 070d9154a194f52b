//! Access technology (`<AcT>` of `+COPS`) codes and what they imply.

use serde::Serialize;

use crate::parser::BandwidthMhz;

/// Broad radio generation, used for defaults that only depend on the family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RadioFamily {
    Gsm,
    Umts,
    Lte,
}

impl RadioFamily {
    /// Nominal channel bandwidth when the modem does not report one.
    pub fn default_bandwidth(self) -> BandwidthMhz {
        match self {
            RadioFamily::Gsm => BandwidthMhz::from_tenths(2),
            RadioFamily::Umts => BandwidthMhz::from_tenths(50),
            RadioFamily::Lte => BandwidthMhz::from_tenths(100),
        }
    }
}

/// Raw `<AcT>` code as reported, e.g. `"7"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessTech(String);

impl AccessTech {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn label(&self) -> &'static str {
        match self.0.as_str() {
            "0" => "GSM (2G)",
            "1" => "GSM Compact (2G)",
            "2" => "UTRAN (3G)",
            "3" => "GSM/EDGE (2G)",
            "4" | "5" => "HSDPA (3G)",
            "6" | "7" => "E-UTRAN/LTE (4G)",
            "8" => "EC-GSM-IoT (2G)",
            "9" => "E-UTRAN NB-S1 (NB-IoT)",
            "10" => "E-UTRAN/LTE-M (4G)",
            _ => "Radio",
        }
    }

    /// Compact label for table rows.
    pub fn short_label(&self) -> &'static str {
        match self.0.as_str() {
            "0" | "1" => "GSM",
            "2" => "3G",
            "6" | "7" => "LTE",
            "10" => "LTE-M",
            _ => "Radio",
        }
    }

    /// NB-IoT has no family default, its carrier is narrower than any of them.
    pub fn family(&self) -> Option<RadioFamily> {
        match self.0.as_str() {
            "0" | "1" | "3" | "8" => Some(RadioFamily::Gsm),
            "2" | "4" | "5" => Some(RadioFamily::Umts),
            "6" | "7" | "10" => Some(RadioFamily::Lte),
            _ => None,
        }
    }
}

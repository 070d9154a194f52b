//! Carrier names for mobile network codes.
//!
//! The table covers the German MNC allocations (MCC 262) as of 02-2026.

use serde::Serialize;

pub const DEFAULT_FALLBACK_CARRIER: &str = "Vodafone DE";

const CARRIERS: &[(&str, &str)] = &[
    ("01", "Telekom DE"),
    ("06", "Telekom DE"),
    ("02", "Vodafone DE"),
    ("04", "Vodafone DE"),
    ("09", "Vodafone DE"),
    ("03", "Telefónica DE"),
    ("05", "O2 Telefónica DE"),
    ("07", "Telefónica DE"),
    ("08", "O2 Telefónica DE"),
    ("11", "Telefónica DE"),
    ("10", "DBInfraGo AG"),
    ("60", "DBInfraGo AG"),
    ("13", "BAAINBw"),
    ("14", "Lebara Limited"),
    ("15", "Airdata"),
    ("22", "sipgate Wireless"),
    ("23", "1&1 Mobilfunk"),
    ("43", "Lycamobile"),
    ("72", "Ericsson"),
    ("74", "Ericsson"),
    ("73", "Nokia"),
    ("78", "T-Mobile"),
    ("98", "non-public"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorInfo {
    pub mcc: String,
    pub mnc: String,
    pub carrier_name: String,
}

/// Maps MNCs to carrier names. Codes missing from the table resolve to the
/// fallback carrier rather than to "unknown", since unlisted domestic codes are
/// in practice MVNOs riding on that network.
#[derive(Debug, Clone)]
pub struct OperatorResolver {
    fallback: String,
}

impl Default for OperatorResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_CARRIER)
    }
}

impl OperatorResolver {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    pub fn resolve(&self, mnc: &str) -> &str {
        CARRIERS
            .iter()
            .find_map(|(code, name)| (*code == mnc).then_some(*name))
            .unwrap_or(self.fallback.as_str())
    }

    /// Splits a combined numeric network code (`"26202"`) into MCC and MNC and
    /// resolves the carrier. The first three digits are the MCC.
    pub fn operator_info(&self, network_code: &str) -> OperatorInfo {
        let split = network_code
            .char_indices()
            .nth(3)
            .map_or(network_code.len(), |(idx, _)| idx);
        let (mcc, mnc) = network_code.split_at(split);

        OperatorInfo {
            mcc: mcc.to_string(),
            mnc: mnc.to_string(),
            carrier_name: self.resolve(mnc).to_string(),
        }
    }
}

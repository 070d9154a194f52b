//! Best-effort extraction of radio fields from free-form AT responses.
//!
//! Vendors disagree on almost everything, so every extractor is a heuristic and
//! returns `None` when it finds nothing. A missing field is a normal outcome,
//! never an error.

pub mod pci;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::band;
use crate::registration::{CellIdentity, Registration, RegistrationStatus};
use crate::technology::{AccessTech, RadioFamily};

pub use pci::{LayeredPci, PciExtractor, PositionalPci};

/// Shown wherever a value is absent.
pub const PLACEHOLDER: &str = "--";

/// `+CSQ` code meaning "not known or not detectable".
pub const CSQ_UNKNOWN: u32 = 99;

macro_rules! regex {
    ($re:literal) => {{
        static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).unwrap());
        &*RE
    }};
}

/// Every run of ascii digits, in order of appearance.
pub fn integer_tokens(text: &str) -> Vec<&str> {
    regex!(r"\d+").find_iter(text).map(|m| m.as_str()).collect()
}

/// Channel number, labeled (`EARFCN: 6300`, `ch=62`, `Kanal 10`) or else the
/// first integer that falls inside a known band.
pub fn parse_channel(text: &str) -> Option<u32> {
    parse_labeled_channel(text).or_else(|| {
        integer_tokens(text)
            .into_iter()
            .filter_map(|token| token.parse().ok())
            .find(|&channel| band::is_known_channel(channel))
    })
}

pub fn parse_labeled_channel(text: &str) -> Option<u32> {
    regex!(r"(?i)(?:ch|kanal|arfcn|earfcn)[\s:=,]+(\d+)")
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Converts a `+CSQ` signal quality code to dBm. Only 0..=31 are measurements.
pub fn csq_to_dbm(code: u32) -> Option<i32> {
    match code {
        0..=31 => Some(-113 + 2 * code as i32),
        _ => None,
    }
}

/// RSSI in dBm from a `+CSQ: <rssi>,<ber>` reply.
pub fn parse_rssi(text: &str) -> Option<i32> {
    let code = regex!(r"\+CSQ:\s*(\d+)")
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;

    csq_to_dbm(code)
}

/// `+CREG` / `+CEREG` reply, both the `<n>,<stat>[,<lac>,<ci>]` query form and
/// the unsolicited `<stat>[,<lac>,<ci>]` form. LAC and CI are hex.
pub fn parse_registration(text: &str) -> Option<Registration> {
    let captures = regex!(
        r#"\+CE?REG:\s*(?:\d+\s*,\s*)?(\d+)(?:\s*,\s*["']([0-9A-Fa-f]+)["']\s*,\s*["']([0-9A-Fa-f]+)["'])?"#
    )
    .captures(text)?;

    let status = captures
        .get(1)?
        .as_str()
        .parse()
        .map_or(RegistrationStatus::Unknown, RegistrationStatus::from_code);
    let identity = match (captures.get(2), captures.get(3)) {
        (Some(lac), Some(cid)) => CellIdentity::from_hex(lac.as_str(), cid.as_str()),
        _ => None,
    };

    Some(Registration { status, identity })
}

/// Numeric operator selection from `+COPS: <mode>,<format>,"<oper>"[,<AcT>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorReading {
    /// MCC and MNC concatenated, e.g. `"26202"`.
    pub network_code: String,
    pub access_tech: Option<AccessTech>,
}

pub fn parse_operator(text: &str) -> Option<OperatorReading> {
    let captures = regex!(r#"\+COPS:\s*(\d+),(\d+),"(\d+)",?(\d{1,2})?"#).captures(text)?;

    Some(OperatorReading {
        network_code: captures.get(3)?.as_str().to_string(),
        access_tech: captures.get(4).map(|m| AccessTech::new(m.as_str())),
    })
}

/// Access technology of a `+COPS` reply. A reply without `<AcT>` counts as GSM.
pub fn parse_technology(text: &str) -> Option<AccessTech> {
    parse_operator(text)
        .map(|reading| reading.access_tech.unwrap_or_else(|| AccessTech::new("0")))
}

/// Channel bandwidth, kept in tenths of a MHz so 1.4 MHz stays exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BandwidthMhz {
    tenths: u32,
}

impl BandwidthMhz {
    pub const fn from_tenths(tenths: u32) -> Self {
        Self { tenths }
    }

    /// Vendors report either an `N_RB`-like enum (0..=6), a resource block
    /// count (15..=100) or plain MHz. Unmapped codes below 50 are MHz, the
    /// rest are tenths of a MHz.
    pub fn from_code(code: u32) -> Self {
        let tenths = match code {
            0 | 6 => 14,
            1 | 15 => 30,
            2 | 25 => 50,
            3 | 50 => 100,
            4 | 75 => 150,
            5 | 100 => 200,
            code if code < 50 => code.saturating_mul(10),
            code => code,
        };
        Self { tenths }
    }
}

impl fmt::Display for BandwidthMhz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (whole, frac) = (self.tenths / 10, self.tenths % 10);
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{frac}")
        }
    }
}

pub fn parse_bandwidth_code(text: &str) -> Option<u32> {
    regex!(r"(?i)(?:BW|Bandwidth|width|mhz)[\s:=,]+(\d+)")
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Reported bandwidth, or the family default when the response has none.
pub fn parse_bandwidth(text: &str, family: Option<RadioFamily>) -> Option<BandwidthMhz> {
    parse_bandwidth_code(text)
        .map(BandwidthMhz::from_code)
        .or_else(|| family.map(RadioFamily::default_bandwidth))
}

pub fn bandwidth_label(text: &str, family: Option<RadioFamily>) -> String {
    display_or_placeholder(parse_bandwidth(text, family))
}

pub fn display_or_placeholder<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string())
}

/// `channel, pci, rssi` triple seen in a serving or neighbor cell listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborObservation {
    pub channel_or_cid: u32,
    pub pci: String,
    pub rssi_dbm: i32,
}

pub fn parse_neighbors(text: &str) -> Vec<NeighborObservation> {
    regex!(r"(\d+)\s*,\s*(\d+)\s*,\s*(-?\d+)")
        .captures_iter(text)
        .filter_map(|c| {
            Some(NeighborObservation {
                channel_or_cid: c.get(1)?.as_str().parse().ok()?,
                pci: c.get(2)?.as_str().to_string(),
                rssi_dbm: c.get(3)?.as_str().parse().ok()?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldCategory {
    Channel,
    Pci,
    Rssi,
    Registration,
    Operator,
    Technology,
    Bandwidth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Field {
    Channel(u32),
    Pci(String),
    RssiDbm(i32),
    Registration(Registration),
    Operator(OperatorReading),
    Technology(AccessTech),
    Bandwidth(BandwidthMhz),
}

/// What is already known when a response is parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseContext {
    pub channel: Option<u32>,
    pub family: Option<RadioFamily>,
}

/// Dispatches a response to the extractor of a field category.
pub struct ResponseParser {
    pci: Box<dyn PciExtractor>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(LayeredPci::<PositionalPci>::default())
    }
}

impl fmt::Debug for ResponseParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseParser").finish_non_exhaustive()
    }
}

impl ResponseParser {
    pub fn new(pci: impl PciExtractor + 'static) -> Self {
        Self { pci: Box::new(pci) }
    }

    pub fn pci(&self, text: &str, channel: Option<u32>) -> Option<String> {
        self.pci.extract(text, channel)
    }

    pub fn extract(
        &self,
        text: &str,
        category: FieldCategory,
        ctx: ParseContext,
    ) -> Option<Field> {
        match category {
            FieldCategory::Channel => parse_channel(text).map(Field::Channel),
            FieldCategory::Pci => self.pci(text, ctx.channel).map(Field::Pci),
            FieldCategory::Rssi => parse_rssi(text).map(Field::RssiDbm),
            FieldCategory::Registration => {
                parse_registration(text).map(Field::Registration)
            }
            FieldCategory::Operator => parse_operator(text).map(Field::Operator),
            FieldCategory::Technology => parse_technology(text).map(Field::Technology),
            FieldCategory::Bandwidth => {
                parse_bandwidth(text, ctx.family).map(Field::Bandwidth)
            }
        }
    }
}

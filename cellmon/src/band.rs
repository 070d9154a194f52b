//! Channel number to frequency band classification.
//!
//! The ranges overlap across technologies (P-GSM and UMTS both claim channel 0),
//! so the table is ordered and the first range containing a channel wins.

use serde::Serialize;

/// Label returned when no range contains the channel.
pub const UNKNOWN_BAND: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BandRange {
    pub start: u32,
    /// Inclusive.
    pub end: u32,
    pub name: &'static str,
}

impl BandRange {
    pub const fn new(start: u32, end: u32, name: &'static str) -> Self {
        Self { start, end, name }
    }

    pub fn contains(&self, channel: u32) -> bool {
        (self.start..=self.end).contains(&channel)
    }
}

/// Declaration order is significant, do not sort or deduplicate.
pub const BANDS: &[BandRange] = &[
    BandRange::new(0, 124, "900 MHz P-GSM"),
    BandRange::new(512, 885, "1800 MHz GSM"),
    BandRange::new(975, 1023, "900 MHz E-GSM"),
    BandRange::new(10562, 10838, "2100 MHz UMTS"),
    BandRange::new(0, 599, "2100 MHz UMTS"),
    BandRange::new(1200, 1949, "1800 MHz LTE-3"),
    BandRange::new(2400, 2649, "2600 MHz LTE-7"),
    BandRange::new(3450, 3799, "900 MHz LTE-8"),
    BandRange::new(6150, 6449, "800 MHz LTE-20"),
    BandRange::new(9210, 9659, "700 MHz LTE 5G"),
    BandRange::new(3257, 4458, "950 MHz UMTS"),
    BandRange::new(2937, 3088, "900 MHz UMTS 3G"),
];

/// First declared range containing `channel`.
pub fn lookup(channel: u32) -> Option<&'static BandRange> {
    BANDS.iter().find(|band| band.contains(channel))
}

/// Band name for `channel`, or [`UNKNOWN_BAND`].
pub fn band_name(channel: u32) -> &'static str {
    lookup(channel).map_or(UNKNOWN_BAND, |band| band.name)
}

pub fn is_known_channel(channel: u32) -> bool {
    lookup(channel).is_some()
}

//! Downlink/uplink carrier frequencies for a channel number.
//!
//! The range boundaries repeat the ones in [`crate::band`] on purpose, so this
//! module can be used without the catalog. The constants follow the 3GPP channel
//! rasters and must stay exact.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Downlink {
    /// `base + step * (channel - start)`
    Linear { base: f64, step: f64 },
    /// `channel / divisor`
    Divided { divisor: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Raster {
    start: u32,
    end: u32,
    downlink: Downlink,
    uplink_offset_mhz: f64,
}

const fn linear(start: u32, end: u32, base: f64, step: f64, offset: f64) -> Raster {
    Raster {
        start,
        end,
        downlink: Downlink::Linear { base, step },
        uplink_offset_mhz: offset,
    }
}

const fn divided(start: u32, end: u32, divisor: f64, offset: f64) -> Raster {
    Raster {
        start,
        end,
        downlink: Downlink::Divided { divisor },
        uplink_offset_mhz: offset,
    }
}

const RASTERS: &[Raster] = &[
    // GSM 900 (P-GSM, E-GSM)
    linear(0, 124, 935.0, 0.2, 45.0),
    linear(975, 1023, 925.2, 0.2, 45.0),
    // GSM 1800
    linear(512, 885, 1805.2, 0.2, 95.0),
    // UMTS 2100 / 900
    divided(10562, 10838, 5.0, 190.0),
    divided(2937, 3088, 5.0, 45.0),
    // LTE bands 20, 3, 7, 8, 28
    linear(6150, 6449, 791.0, 0.1, 30.0),
    linear(1200, 1949, 1805.0, 0.1, 95.0),
    linear(2400, 2649, 2620.0, 0.1, 120.0),
    linear(3450, 3799, 925.0, 0.1, 45.0),
    linear(9210, 9659, 758.0, 0.1, 55.0),
];

impl Raster {
    fn contains(&self, channel: u32) -> bool {
        (self.start..=self.end).contains(&channel)
    }

    fn pair(&self, channel: u32) -> FrequencyPair {
        let downlink_mhz = match self.downlink {
            Downlink::Linear { base, step } => {
                base + step * f64::from(channel - self.start)
            }
            Downlink::Divided { divisor } => f64::from(channel) / divisor,
        };

        FrequencyPair {
            downlink_mhz,
            uplink_mhz: downlink_mhz - self.uplink_offset_mhz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyPair {
    pub downlink_mhz: f64,
    pub uplink_mhz: f64,
}

impl fmt::Display for FrequencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "↓ {:.1} MHz | ↑ {:.1} MHz",
            self.downlink_mhz, self.uplink_mhz
        )
    }
}

/// Frequencies for `channel`, `None` if no raster covers it.
pub fn compute(channel: u32) -> Option<FrequencyPair> {
    RASTERS
        .iter()
        .find(|raster| raster.contains(channel))
        .map(|raster| raster.pair(channel))
}

/// Frequency pair with one decimal, or `Ch: <channel>` for unknown channels.
pub fn display(channel: u32) -> String {
    match compute(channel) {
        Some(pair) => pair.to_string(),
        None => format!("Ch: {channel}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn gsm_900() {
        let pair = compute(1).unwrap();
        assert_close(pair.downlink_mhz, 935.2);
        assert_close(pair.uplink_mhz, 890.2);

        let pair = compute(975).unwrap();
        assert_close(pair.downlink_mhz, 925.2);
        assert_close(pair.uplink_mhz, 880.2);
    }

    #[test]
    fn gsm_1800() {
        let pair = compute(600).unwrap();
        assert_close(pair.downlink_mhz, 1822.8);
        assert_close(pair.uplink_mhz, 1727.8);
    }

    #[test]
    fn umts() {
        let pair = compute(10700).unwrap();
        assert_close(pair.downlink_mhz, 2140.0);
        assert_close(pair.uplink_mhz, 1950.0);

        let pair = compute(3000).unwrap();
        assert_close(pair.downlink_mhz, 600.0);
        assert_close(pair.uplink_mhz, 555.0);
    }

    #[test]
    fn lte() {
        let pair = compute(6300).unwrap();
        assert_close(pair.downlink_mhz, 806.0);
        assert_close(pair.uplink_mhz, 776.0);

        let pair = compute(1300).unwrap();
        assert_close(pair.downlink_mhz, 1815.0);
        assert_close(pair.uplink_mhz, 1720.0);

        let pair = compute(3550).unwrap();
        assert_close(pair.downlink_mhz, 935.0);
        assert_close(pair.uplink_mhz, 890.0);

        let pair = compute(9260).unwrap();
        assert_close(pair.downlink_mhz, 763.0);
        assert_close(pair.uplink_mhz, 708.0);

        let pair = compute(2400).unwrap();
        assert_close(pair.downlink_mhz, 2620.0);
        assert_close(pair.uplink_mhz, 2500.0);
    }

    #[test]
    fn display_rounds_to_one_decimal() {
        assert_eq!(display(6300), "↓ 806.0 MHz | ↑ 776.0 MHz");
        assert_eq!(display(1), "↓ 935.2 MHz | ↑ 890.2 MHz");
    }

    #[test]
    fn unknown_channel_falls_back_to_bare_number() {
        assert_eq!(compute(5000), None);
        assert_eq!(display(5000), "Ch: 5000");
    }

    #[test]
    fn umts_range_starting_at_zero_has_no_raster_of_its_own() {
        // 300 is catalogued as UMTS but has no frequency formula
        assert_eq!(display(300), "Ch: 300");
    }

    proptest! {
        #[test]
        fn gsm_900_duplex_spacing(channel in prop_oneof![0u32..=124, 975u32..=1023]) {
            let pair = compute(channel).unwrap();
            prop_assert!((pair.downlink_mhz - pair.uplink_mhz - 45.0).abs() < 1e-6);
        }

        #[test]
        fn uplink_is_below_downlink(channel in 0u32..12_000) {
            if let Some(pair) = compute(channel) {
                prop_assert!(pair.uplink_mhz < pair.downlink_mhz);
            }
        }
    }
}

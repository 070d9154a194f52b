//! Physical cell id extraction.
//!
//! Vendors rarely label the PCI, so the default extractor falls back to guessing
//! from token positions. That guess is fragile; a vendor specific extractor can
//! replace it through [`PciExtractor`] without touching the tracker.

use std::sync::LazyLock;

use regex::Regex;

use super::integer_tokens;

pub trait PciExtractor: Send + Sync {
    /// `channel` is the channel already extracted from the same response.
    fn extract(&self, text: &str, channel: Option<u32>) -> Option<String>;
}

/// `pci: 123`, `PHYS_ID=123`, ...
pub fn labeled_pci(text: &str) -> Option<String> {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)(?:pci|phys_id)[\s:=,]+(\d+)").unwrap()
    });

    RE.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Positional guess over the bare integer tokens of a response:
/// - three or more tokens led by the known channel: the second token,
/// - exactly two tokens: the second token,
/// - anything else: nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalPci;

impl PciExtractor for PositionalPci {
    fn extract(&self, text: &str, channel: Option<u32>) -> Option<String> {
        let tokens = integer_tokens(text);
        match tokens.as_slice() {
            [_, second] => Some(second.to_string()),
            [first, second, _, ..] => {
                let channel = channel?.to_string();
                (*first == channel).then(|| second.to_string())
            }
            _ => None,
        }
    }
}

/// Labeled match first, `fallback` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LayeredPci<F = PositionalPci> {
    fallback: F,
}

impl Default for LayeredPci<PositionalPci> {
    fn default() -> Self {
        Self::new(PositionalPci)
    }
}

impl<F> LayeredPci<F> {
    pub fn new(fallback: F) -> Self {
        Self { fallback }
    }
}

impl<F: PciExtractor> PciExtractor for LayeredPci<F> {
    fn extract(&self, text: &str, channel: Option<u32>) -> Option<String> {
        labeled_pci(text).or_else(|| self.fallback.extract(text, channel))
    }
}

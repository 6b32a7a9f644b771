//! Bin code parsing.
//!
//! Bin codes look like `01A-12-03-2`: a "01" house prefix glued to the zone,
//! then aisle, position and shelf separated by hyphens.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinAddress {
    pub zone: String,
    pub aisle: String,
    pub position: String,
    pub shelf: String,
}

fn bin_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^01([^-]+)-([^-]+)-([^-]+)-([^-]+)$").expect("bin pattern"))
}

impl BinAddress {
    /// Full structured parse. `None` when the code does not follow the
    /// four-segment layout.
    pub fn parse(code: &str) -> Option<Self> {
        let caps = bin_pattern().captures(code.trim())?;
        Some(Self {
            zone: caps[1].to_string(),
            aisle: caps[2].to_string(),
            position: caps[3].to_string(),
            shelf: caps[4].to_string(),
        })
    }
}

/// Zone of a bin code. Total: falls back to the first hyphen-separated
/// segment for codes that do not match the layout, and to "?" for empty
/// input.
pub fn zone_of(code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return "?".to_string();
    }
    if let Some(addr) = BinAddress::parse(code) {
        return addr.zone;
    }
    code.split('-').next().unwrap_or(code).to_string()
}

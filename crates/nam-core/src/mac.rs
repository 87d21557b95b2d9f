//! MAC address extraction.
//!
//! Firmware pages embed the device MAC in one of two shapes:
//! `AA:BB:CC:DD:EE:FF` (any case) or a parenthesized run of twelve hex
//! digits such as `(aabbccddeeff)`. [`MacAddress::find_in`] scans text for
//! the leftmost token of either shape.

use std::fmt;
use std::str::FromStr;

use nam_types::ParseError;

/// A 6-octet hardware address, displayed as lowercase colon-separated hex.
///
/// ```
/// use nam_core::MacAddress;
///
/// let mac = MacAddress::find_in("MAC: AA:BB:CC:DD:EE:FF").unwrap();
/// assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
///
/// let mac = MacAddress::find_in("Device (aabbccddeeff) ready").unwrap();
/// assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

/// Length of `AA:BB:CC:DD:EE:FF`.
const COLON_FORM_LEN: usize = 17;
/// Length of `(aabbccddeeff)`.
const PAREN_FORM_LEN: usize = 14;

impl MacAddress {
    /// Create from raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Find the leftmost MAC token in free text.
    pub fn find_in(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        (0..bytes.len()).find_map(|start| {
            let rest = &bytes[start..];
            parse_colon_form(rest).or_else(|| parse_paren_form(rest))
        })
    }
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let high = (pair[0] as char).to_digit(16)?;
    let low = (pair[1] as char).to_digit(16)?;
    u8::try_from(high << 4 | low).ok()
}

fn parse_colon_form(bytes: &[u8]) -> Option<MacAddress> {
    let token = bytes.get(..COLON_FORM_LEN)?;
    let mut octets = [0u8; 6];
    for (i, octet) in octets.iter_mut().enumerate() {
        let offset = i * 3;
        if i > 0 && token[offset - 1] != b':' {
            return None;
        }
        *octet = hex_pair(&token[offset..offset + 2])?;
    }
    Some(MacAddress(octets))
}

fn parse_paren_form(bytes: &[u8]) -> Option<MacAddress> {
    let token = bytes.get(..PAREN_FORM_LEN)?;
    if token[0] != b'(' || token[PAREN_FORM_LEN - 1] != b')' {
        return None;
    }
    let mut octets = [0u8; 6];
    for (octet, pair) in octets.iter_mut().zip(token[1..13].chunks_exact(2)) {
        *octet = hex_pair(pair)?;
    }
    Some(MacAddress(octets))
}

impl FromStr for MacAddress {
    type Err = ParseError;

    /// Parse a string that is exactly one MAC token.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bytes = s.as_bytes();
        let parsed = match bytes.len() {
            COLON_FORM_LEN => parse_colon_form(bytes),
            PAREN_FORM_LEN => parse_paren_form(bytes),
            _ => None,
        };
        parsed.ok_or_else(|| ParseError::InvalidData(format!("Invalid MAC address: {s}")))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

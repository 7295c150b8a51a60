//! Decoded payloads and their text renditions

use std::fmt;

use crate::TextMode;

/// Classification of a decoded payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    #[default]
    Text = 0,
    Binary = 1,
    Mixed = 2,
    GS1 = 3,
    ISO15434 = 4,
    UnknownECI = 5,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "Text",
            Self::Binary => "Binary",
            Self::Mixed => "Mixed",
            Self::GS1 => "GS1",
            Self::ISO15434 => "ISO15434",
            Self::UnknownECI => "UnknownECI",
        })
    }
}

/// ISO/IEC 15424 symbology identifier, e.g. `]E4` for EAN-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbologyIdentifier {
    pub code: u8,
    pub modifier: u8,
}

impl SymbologyIdentifier {
    pub const fn new(code: u8, modifier: u8) -> Self {
        Self { code, modifier }
    }
}

impl fmt::Display for SymbologyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code == 0 {
            return Ok(());
        }
        write!(f, "]{}{}", self.code as char, self.modifier as char)
    }
}

const GS: u8 = 0x1D;
const ISO15434_HEADER: &[u8] = b"[)>\x1E";

/// Raw payload of a symbol together with what is known about its meaning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Content {
    bytes: Vec<u8>,
    symbology: SymbologyIdentifier,
    gs1: bool,
}

impl Content {
    pub fn new(bytes: Vec<u8>, symbology: SymbologyIdentifier) -> Self {
        Self {
            bytes,
            symbology,
            gs1: false,
        }
    }

    /// GS1 element strings, `0x1D` separating variable length fields.
    pub fn gs1(bytes: Vec<u8>, symbology: SymbologyIdentifier) -> Self {
        Self {
            bytes,
            symbology,
            gs1: true,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn symbology(&self) -> SymbologyIdentifier {
        self.symbology
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Linear symbologies have no ECI mechanism.
    pub fn has_eci(&self) -> bool {
        false
    }

    pub fn content_type(&self) -> ContentType {
        if self.gs1 {
            return ContentType::GS1;
        }
        if self.bytes.starts_with(ISO15434_HEADER) {
            return ContentType::ISO15434;
        }
        let binary = self.bytes.iter().filter(|&&b| !is_text_byte(b)).count();
        match binary {
            0 => ContentType::Text,
            n if n == self.bytes.len() => ContentType::Binary,
            _ => ContentType::Mixed,
        }
    }

    /// Payload following the ECI protocol: symbology identifier first, every
    /// backslash doubled.
    pub fn bytes_eci(&self) -> Vec<u8> {
        let mut out = self.symbology.to_string().into_bytes();
        for &b in &self.bytes {
            out.push(b);
            if b == b'\\' {
                out.push(b'\\');
            }
        }
        out
    }

    pub fn text(&self, mode: TextMode) -> String {
        match mode {
            TextMode::Plain => latin1(&self.bytes),
            TextMode::ECI => latin1(&self.bytes_eci()),
            TextMode::HRI => match self.content_type() {
                ContentType::GS1 => gs1_hri(&self.bytes).unwrap_or_else(|| latin1(&self.bytes)),
                ContentType::ISO15434 | ContentType::Binary | ContentType::Mixed => {
                    escaped(&self.bytes)
                }
                _ => latin1(&self.bytes),
            },
            TextMode::Hex => self
                .bytes
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(" "),
            TextMode::Escaped => escaped(&self.bytes),
        }
    }
}

fn is_text_byte(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\r' | 0x20..=0x7E | 0xA0..=0xFF)
}

/// Linear symbols carry ISO-8859-1 by default.
fn latin1(bytes: &[u8]) -> String {
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}

const ASCII_NAMES: [&str; 33] = [
    "NUL", "SOH", "STX", "ETX", "EOT", "ENQ", "ACK", "BEL", "BS", "HT", "LF", "VT", "FF", "CR",
    "SO", "SI", "DLE", "DC1", "DC2", "DC3", "DC4", "NAK", "SYN", "ETB", "CAN", "EM", "SUB", "ESC",
    "FS", "GS", "RS", "US", "DEL",
];

fn escaped(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            0..=0x1F => {
                out.push('<');
                out.push_str(ASCII_NAMES[b as usize]);
                out.push('>');
            }
            0x7F => out.push_str("<DEL>"),
            _ => out.push(char::from(b)),
        }
    }
    out
}

// ============================================================================
// GS1 human readable interpretation
// ============================================================================

/// Number of digits of the application identifier starting `data`.
fn ai_length(prefix: u8) -> Option<usize> {
    match prefix {
        0..=22 | 30 | 37 | 90..=99 => Some(2),
        23..=29 | 40..=42 => Some(3),
        31..=36 | 39 | 43..=49 | 70..=89 => Some(4),
        _ => None,
    }
}

/// Length of the data field for application identifiers with a predefined
/// length, keyed by the first two digits.
fn fixed_field_length(prefix: u8) -> Option<usize> {
    match prefix {
        0 => Some(18),
        1..=3 => Some(14),
        4 => Some(16),
        11..=19 => Some(6),
        20 => Some(2),
        31..=36 => Some(6),
        41 => Some(13),
        _ => None,
    }
}

/// Render GS1 element strings as `(AI)value(AI)value...`.
pub(crate) fn gs1_hri(bytes: &[u8]) -> Option<String> {
    let mut out = String::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        if rest[0] == GS {
            rest = &rest[1..];
            continue;
        }
        if rest.len() < 2 || !rest[..2].iter().all(u8::is_ascii_digit) {
            return None;
        }
        let prefix = (rest[0] - b'0') * 10 + (rest[1] - b'0');
        let ai_len = ai_length(prefix)?;
        if rest.len() < ai_len || !rest[..ai_len].iter().all(u8::is_ascii_digit) {
            return None;
        }
        let (ai, data) = rest.split_at(ai_len);
        let field_len = match fixed_field_length(prefix) {
            Some(n) => n.min(data.len()),
            None => data.iter().position(|&b| b == GS).unwrap_or(data.len()),
        };
        out.push('(');
        out.push_str(&latin1(ai));
        out.push(')');
        out.push_str(&latin1(&data[..field_len]));
        rest = &data[field_len..];
    }
    Some(out)
}

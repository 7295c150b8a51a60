//! Code 39 barcode decoder and encoder
//!
//! Every character is nine elements, three of them wide, followed by a
//! narrow gap. The symbol is framed by `*`. The extended flavour maps all
//! of ASCII onto two-character sequences led by `$`, `%`, `/` or `+`.

use super::{narrow_wide_bits, push_narrow_wide, wide_ratio, DecodeContext, Decoded, Encoded, Row};
use crate::{
    content::{Content, SymbologyIdentifier},
    error::BarcodeError,
    options::FormatOptions,
    BarcodeFormat, Error, Result,
};

// ============================================================================
// Lookup tables
// ============================================================================

const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Narrow/wide patterns of [`ALPHABET`], first element in bit 8.
const CHARACTER_ENCODINGS: [u32; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8, // U-$
    0x0A2, 0x08A, 0x02A, // /-%
];

const ASTERISK_ENCODING: u32 = 0x094;

const QUIET_ZONE: f32 = 5.0;

fn char_index(c: u8) -> Option<usize> {
    ALPHABET.iter().position(|&a| a == c)
}

fn check_char(data: &[u8]) -> Option<u8> {
    let mut sum = 0;
    for &c in data {
        sum += char_index(c)?;
    }
    Some(ALPHABET[sum % 43])
}

// ============================================================================
// Full ASCII
// ============================================================================

/// Value of the full ASCII pair `shift`, `c`.
fn full_ascii_pair(shift: u8, c: u8) -> Option<u8> {
    match (shift, c) {
        (b'$', b'A'..=b'Z') => Some(c - b'A' + 0x01),
        (b'%', b'A'..=b'E') => Some(c - b'A' + 0x1B),
        (b'%', b'F'..=b'J') => Some(c - b'F' + b';'),
        (b'%', b'K'..=b'O') => Some(c - b'K' + b'['),
        (b'%', b'P'..=b'T') => Some(c - b'P' + b'{'),
        (b'%', b'U') => Some(0x00),
        (b'%', b'V') => Some(b'@'),
        (b'%', b'W') => Some(b'`'),
        (b'%', b'X'..=b'Z') => Some(0x7F),
        (b'/', b'A'..=b'O') => Some(c - b'A' + b'!'),
        (b'/', b'Z') => Some(b':'),
        (b'+', b'A'..=b'Z') => Some(c - b'A' + b'a'),
        _ => None,
    }
}

fn is_shift(c: u8) -> bool {
    matches!(c, b'$' | b'%' | b'/' | b'+')
}

/// Resolve full ASCII pairs. `None` unless at least one pair is present and
/// every shift character starts a valid pair.
fn decode_full_ascii(raw: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut pairs = 0;
    let mut i = 0;
    while i < raw.len() {
        if is_shift(raw[i]) {
            out.push(full_ascii_pair(raw[i], *raw.get(i + 1)?)?);
            pairs += 1;
            i += 2;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    (pairs > 0).then_some(out)
}

fn encode_full_ascii(text: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for &c in text {
        let (shift, base) = match c {
            b'0'..=b'9' | b'A'..=b'Z' | b' ' | b'-' | b'.' => {
                out.push(c);
                continue;
            }
            0x00 => (b'%', b'U'),
            0x01..=0x1A => (b'$', c - 0x01 + b'A'),
            0x1B..=0x1F => (b'%', c - 0x1B + b'A'),
            b'!'..=b'/' => (b'/', c - b'!' + b'A'),
            b':' => (b'/', b'Z'),
            b';'..=b'?' => (b'%', c - b';' + b'F'),
            b'@' => (b'%', b'V'),
            b'['..=b'_' => (b'%', c - b'[' + b'K'),
            b'`' => (b'%', b'W'),
            b'a'..=b'z' => (b'+', c - b'a' + b'A'),
            b'{'..=0x7F => (b'%', c - b'{' + b'P'),
            _ => return None,
        };
        out.push(shift);
        out.push(base);
    }
    Some(out)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode the character whose first bar is run `j`.
fn char_at(row: &Row, j: usize, reference: u32) -> Option<u32> {
    let window = row.window(j, 9)?;
    let sum: u32 = window.iter().sum();
    if sum * 2 < reference || sum > reference * 2 {
        return None;
    }
    narrow_wide_bits(window)
}

pub(crate) fn decode(row: &Row, i: usize, ctx: &DecodeContext) -> Option<Decoded> {
    let reference = row.sum(i, 9);
    if char_at(row, i, reference)? != ASTERISK_ENCODING {
        return None;
    }
    let narrow = row.window(i, 9)?.iter().min().copied()? as f32;
    if !row.quiet_before(i, QUIET_ZONE * narrow) {
        return None;
    }

    let mut raw = Vec::new();
    let mut j = i + 10;
    let end = loop {
        if row.width(j - 1) as f32 > 3.0 * narrow * 1.5 {
            return None;
        }
        let bits = char_at(row, j, reference)?;
        if bits == ASTERISK_ENCODING {
            break j + 9;
        }
        let index = CHARACTER_ENCODINGS.iter().position(|&e| e == bits)?;
        raw.push(ALPHABET[index]);
        j += 10;
    };
    if raw.is_empty() || !row.quiet_after(end, QUIET_ZONE * narrow) {
        return None;
    }

    let mut error = None;
    let mut modifier = b'0';
    if ctx.validate_optional_checksum {
        match raw.split_last() {
            Some((&check, body)) if check_char(body) == Some(check) => {
                raw.pop();
                modifier = b'3';
            }
            _ => error = Some(BarcodeError::checksum("check character mismatch")),
        }
    }

    let extended = if ctx.accepts(BarcodeFormat::CODE39_EXT) {
        decode_full_ascii(&raw)
    } else {
        None
    };
    let (format, bytes) = match extended {
        Some(text) => {
            modifier += 4;
            (BarcodeFormat::CODE39_EXT, text)
        }
        None => (BarcodeFormat::CODE39_STD, raw),
    };

    let content = Content::new(bytes, SymbologyIdentifier::new(b'A', modifier));
    let decoded = Decoded::new(format, content, i, end);
    Some(match error {
        Some(e) => decoded.with_error(e),
        None => decoded,
    })
}

// ============================================================================
// Encoding
// ============================================================================

pub(crate) fn encode(format: BarcodeFormat, text: &[u8], opts: &FormatOptions) -> Result<Encoded> {
    let invalid = |reason: &str| Error::InvalidContent {
        format: format.name().to_string(),
        reason: reason.to_string(),
    };
    if text.is_empty() {
        return Err(invalid("content must not be empty"));
    }
    let wide = wide_ratio(opts)?;

    let mut raw = if format == BarcodeFormat::CODE39_EXT {
        encode_full_ascii(text).ok_or_else(|| invalid("only ASCII characters are allowed"))?
    } else {
        if text.iter().any(|&c| char_index(c).is_none()) {
            return Err(invalid("character outside of the Code 39 alphabet"));
        }
        text.to_vec()
    };

    let with_checksum = opts.flag("checksum");
    if with_checksum {
        let check =
            check_char(&raw).ok_or_else(|| invalid("character outside of the Code 39 alphabet"))?;
        raw.push(check);
    }

    let mut modules = Vec::with_capacity((raw.len() + 2) * (13 + 3 * wide as usize));
    push_narrow_wide(&mut modules, ASTERISK_ENCODING, 9, wide);
    for &c in &raw {
        modules.push(false);
        let index =
            char_index(c).ok_or_else(|| invalid("character outside of the Code 39 alphabet"))?;
        push_narrow_wide(&mut modules, CHARACTER_ENCODINGS[index], 9, wide);
    }
    modules.push(false);
    push_narrow_wide(&mut modules, ASTERISK_ENCODING, 9, wide);

    let mut modifier = if with_checksum { b'3' } else { b'0' };
    if format == BarcodeFormat::CODE39_EXT {
        modifier += 4;
    }
    let content = Content::new(text.to_vec(), SymbologyIdentifier::new(b'A', modifier));
    Ok(Encoded {
        modules,
        hrt: content.text(crate::TextMode::Plain),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReaderOptions;

    fn decode_modules(modules: &[bool], opts: &ReaderOptions) -> Option<Decoded> {
        let bits = std::iter::repeat(false)
            .take(20)
            .chain(modules.iter().flat_map(|&m| [m, m]))
            .chain(std::iter::repeat(false).take(20));
        let row = Row::from_bits(bits);
        decode(&row, 1, &DecodeContext::new(opts))
    }

    #[test]
    fn test_table_has_three_wide() {
        for &e in CHARACTER_ENCODINGS.iter().chain([&ASTERISK_ENCODING]) {
            assert_eq!(e.count_ones(), 3, "{e:#x}");
        }
    }

    #[test]
    fn test_standard_round_trip() {
        let opts = FormatOptions::default();
        let enc = encode(BarcodeFormat::CODE39_STD, b"CODE-39 TEST", &opts).unwrap();
        let dec = decode_modules(&enc.modules, &ReaderOptions::default()).unwrap();
        assert_eq!(dec.format, BarcodeFormat::CODE39_STD);
        assert_eq!(dec.content.bytes(), b"CODE-39 TEST");
        assert_eq!(dec.content.symbology().to_string(), "]A0");
    }

    #[test]
    fn test_extended_round_trip() {
        let opts = FormatOptions::default();
        let enc = encode(BarcodeFormat::CODE39_EXT, b"Hello!", &opts).unwrap();
        assert_eq!(enc.content.bytes(), b"Hello!");
        let dec = decode_modules(&enc.modules, &ReaderOptions::default()).unwrap();
        assert_eq!(dec.format, BarcodeFormat::CODE39_EXT);
        assert_eq!(dec.content.bytes(), b"Hello!");
        assert_eq!(dec.content.symbology().to_string(), "]A4");
    }

    #[test]
    fn test_shift_without_pair_is_standard() {
        assert_eq!(decode_full_ascii(b"A$"), None);
        assert_eq!(decode_full_ascii(b"AB"), None);
        assert_eq!(decode_full_ascii(b"$A/Z+A"), Some(vec![0x01, b':', b'a']));
        assert_eq!(decode_full_ascii(b"%U%V%W"), Some(vec![0x00, b'@', b'`']));
    }

    #[test]
    fn test_full_ascii_covers_ascii() {
        let all: Vec<u8> = (0..=0x7F).collect();
        let raw = encode_full_ascii(&all).unwrap();
        assert!(raw.iter().all(|&c| char_index(c).is_some()));
        assert_eq!(decode_full_ascii(&raw), Some(all));
        assert_eq!(encode_full_ascii(&[0xE9]), None);
    }

    #[test]
    fn test_checksum() {
        let opts = FormatOptions::parse(BarcodeFormat::CODE39_STD, "checksum").unwrap();
        let enc = encode(BarcodeFormat::CODE39_STD, b"CODE39", &opts).unwrap();
        assert_eq!(enc.content.symbology().to_string(), "]A3");

        let plain = decode_modules(&enc.modules, &ReaderOptions::default()).unwrap();
        assert_eq!(plain.content.bytes().len(), 7);

        let validating = ReaderOptions::default().with_validate_optional_checksum(true);
        let dec = decode_modules(&enc.modules, &validating).unwrap();
        assert_eq!(dec.content.bytes(), b"CODE39");
        assert_eq!(dec.content.symbology().to_string(), "]A3");
        assert!(dec.error.is_none());

        let unchecked =
            encode(BarcodeFormat::CODE39_STD, b"CODE39", &FormatOptions::default()).unwrap();
        let dec = decode_modules(&unchecked.modules, &validating).unwrap();
        assert_eq!(dec.error.kind(), crate::ErrorType::Checksum);
    }

    #[test]
    fn test_narrow_ratio_two() {
        let opts = FormatOptions::parse(BarcodeFormat::CODE39_STD, "wide=2").unwrap();
        let enc = encode(BarcodeFormat::CODE39_STD, b"A1", &opts).unwrap();
        let dec = decode_modules(&enc.modules, &ReaderOptions::default()).unwrap();
        assert_eq!(dec.content.bytes(), b"A1");
    }

    #[test]
    fn test_invalid_content() {
        let opts = FormatOptions::default();
        assert!(encode(BarcodeFormat::CODE39_STD, b"abc", &opts).is_err());
        assert!(encode(BarcodeFormat::CODE39_STD, b"", &opts).is_err());
        assert!(encode(BarcodeFormat::CODE39_EXT, &[0xFF], &opts).is_err());
    }
}

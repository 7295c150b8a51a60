//! Codabar barcode decoder and encoder
//!
//! Each character is seven elements followed by a narrow gap. The start
//! and stop characters (A-D) are part of the decoded text.

use super::{narrow_wide_bits, push_narrow_wide, wide_ratio, DecodeContext, Decoded, Encoded, Row};
use crate::{
    content::{Content, SymbologyIdentifier},
    options::FormatOptions,
    BarcodeFormat, Error, Result,
};

const ALPHABET: &[u8; 20] = b"0123456789-$:/.+ABCD";

/// Narrow/wide patterns of [`ALPHABET`], first element in bit 6.
const CHARACTER_ENCODINGS: [u32; 20] = [
    0x003, 0x006, 0x009, 0x060, 0x012, 0x042, 0x021, 0x024, 0x030, 0x048, // 0-9
    0x00c, 0x018, 0x045, 0x051, 0x054, 0x015, 0x01A, 0x029, 0x00B, 0x00E, // -$:/.+ABCD
];

const QUIET_ZONE: f32 = 5.0;

fn is_start_stop(c: u8) -> bool {
    matches!(c, b'A'..=b'D')
}

fn char_at(row: &Row, j: usize, reference: u32) -> Option<u8> {
    let window = row.window(j, 7)?;
    let sum: u32 = window.iter().sum();
    if sum * 2 < reference || sum > reference * 2 {
        return None;
    }
    let bits = narrow_wide_bits(window)?;
    CHARACTER_ENCODINGS
        .iter()
        .position(|&e| e == bits)
        .map(|index| ALPHABET[index])
}

pub(crate) fn decode(row: &Row, i: usize, _ctx: &DecodeContext) -> Option<Decoded> {
    let reference = row.sum(i, 7);
    let start = char_at(row, i, reference)?;
    if !is_start_stop(start) {
        return None;
    }
    let narrow = row.window(i, 7)?.iter().min().copied()? as f32;
    if !row.quiet_before(i, QUIET_ZONE * narrow) {
        return None;
    }

    let mut text = vec![start];
    let mut j = i + 8;
    let end = loop {
        if row.width(j - 1) as f32 > 2.0 * narrow {
            return None;
        }
        let c = char_at(row, j, reference)?;
        text.push(c);
        if is_start_stop(c) {
            break j + 7;
        }
        j += 8;
    };
    if text.len() < 3 || !row.quiet_after(end, QUIET_ZONE * narrow) {
        return None;
    }

    let content = Content::new(text, SymbologyIdentifier::new(b'F', b'0'));
    Some(Decoded::new(BarcodeFormat::CODABAR, content, i, end))
}

pub(crate) fn encode(text: &[u8], opts: &FormatOptions) -> Result<Encoded> {
    let invalid = |reason: &str| Error::InvalidContent {
        format: BarcodeFormat::CODABAR.name().to_string(),
        reason: reason.to_string(),
    };
    let (first, last) = match (text.first(), text.last()) {
        (Some(&f), Some(&l)) if text.len() >= 3 => (f, l),
        _ => return Err(invalid("at least one character between start and stop is required")),
    };
    if !is_start_stop(first) || !is_start_stop(last) {
        return Err(invalid("must begin and end with one of A, B, C, D"));
    }
    let wide = wide_ratio(opts)?;

    let mut modules = Vec::new();
    for (k, &c) in text.iter().enumerate() {
        let inner = k > 0 && k + 1 < text.len();
        let index = ALPHABET
            .iter()
            .position(|&a| a == c)
            .filter(|_| !(inner && is_start_stop(c)))
            .ok_or_else(|| invalid("character outside of the Codabar alphabet"))?;
        if k > 0 {
            modules.push(false);
        }
        push_narrow_wide(&mut modules, CHARACTER_ENCODINGS[index], 7, wide);
    }

    let content = Content::new(text.to_vec(), SymbologyIdentifier::new(b'F', b'0'));
    Ok(Encoded {
        modules,
        hrt: content.text(crate::TextMode::Plain),
        content,
    })
}

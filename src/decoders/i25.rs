//! Interleaved 2 of 5 (ITF) barcode decoder and encoder
//!
//! Digits are encoded in pairs: the bars carry the first digit of a pair,
//! the spaces in between the second. Each digit is five elements, two of
//! them wide.

use super::{
    gtin_check_digit, has_valid_gtin_check, narrow_wide_bits, pattern_variance, push_runs,
    wide_ratio, DecodeContext, Decoded, Encoded, Row,
};
use crate::{
    content::{Content, SymbologyIdentifier},
    error::BarcodeError,
    options::FormatOptions,
    BarcodeFormat, Error, Result,
};

// ============================================================================
// Lookup tables
// ============================================================================

/// Narrow/wide patterns of the digits 0-9, first element in bit 4.
const DIGIT_ENCODINGS: [u32; 10] = [0x06, 0x11, 0x09, 0x18, 0x05, 0x14, 0x0C, 0x03, 0x12, 0x0A];

const START_PATTERN: [u8; 4] = [1, 1, 1, 1];

const MIN_DIGITS: usize = 6;
/// Light margin required on both sides, in narrow elements.
const QUIET_ZONE: f32 = 10.0;

const MAX_AVG_VARIANCE: f32 = 0.38;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.5;

// ============================================================================
// Decoding
// ============================================================================

fn digit(elements: &[u32]) -> Option<u8> {
    let bits = narrow_wide_bits(elements)?;
    DIGIT_ENCODINGS.iter().position(|&e| e == bits).map(|d| b'0' + d as u8)
}

/// Wide bar followed by two narrow elements, then the quiet zone.
fn is_end(row: &Row, j: usize, narrow: f32) -> bool {
    let Some(end) = row.window(j, 3) else {
        return false;
    };
    let wide = end[0] as f32;
    wide >= 1.5 * narrow
        && wide <= 3.5 * narrow
        && (end[1] as f32) < 1.5 * narrow
        && (end[2] as f32) < 1.5 * narrow
        && row.quiet_after(j + 3, QUIET_ZONE * narrow)
}

pub(crate) fn decode(row: &Row, i: usize, ctx: &DecodeContext) -> Option<Decoded> {
    let start = row.window(i, 4)?;
    if pattern_variance(start, &START_PATTERN, MAX_INDIVIDUAL_VARIANCE) >= MAX_AVG_VARIANCE {
        return None;
    }
    let narrow = row.sum(i, 4) as f32 / 4.0;
    if !row.quiet_before(i, QUIET_ZONE * narrow) {
        return None;
    }

    let mut digits = Vec::new();
    let mut j = i + 4;
    let end = loop {
        if is_end(row, j, narrow) {
            break j + 3;
        }
        let pair = row.window(j, 10)?;
        let bars: Vec<u32> = pair.iter().step_by(2).copied().collect();
        let spaces: Vec<u32> = pair.iter().skip(1).step_by(2).copied().collect();
        digits.push(digit(&bars)?);
        digits.push(digit(&spaces)?);
        j += 10;
    };
    if digits.len() < MIN_DIGITS {
        return None;
    }

    let mut error = None;
    let mut modifier = b'0';
    let is_itf14 = digits.len() == 14 && ctx.names(BarcodeFormat::ITF14);
    if ctx.validate_optional_checksum || is_itf14 {
        if has_valid_gtin_check(&digits) {
            modifier = b'1';
        } else {
            error = Some(BarcodeError::checksum("check digit mismatch"));
        }
    }
    let format = if is_itf14 {
        BarcodeFormat::ITF14
    } else {
        BarcodeFormat::ITF
    };

    let content = Content::new(digits, SymbologyIdentifier::new(b'I', modifier));
    let decoded = Decoded::new(format, content, i, end);
    Some(match error {
        Some(e) => decoded.with_error(e),
        None => decoded,
    })
}

// ============================================================================
// Encoding
// ============================================================================

fn widths(bits: u32, wide: u8) -> impl Iterator<Item = u8> {
    (0..5).rev().map(move |k| if bits >> k & 1 == 1 { wide } else { 1 })
}

pub(crate) fn encode(text: &[u8], opts: &FormatOptions) -> Result<Encoded> {
    let invalid = |reason: String| Error::InvalidContent {
        format: BarcodeFormat::ITF.name().to_string(),
        reason,
    };
    if !text.iter().all(u8::is_ascii_digit) {
        return Err(invalid("only digits are allowed".to_string()));
    }
    let wide = wide_ratio(opts)?;

    let with_checksum = opts.flag("checksum");
    let mut digits = text.to_vec();
    if with_checksum {
        let check =
            gtin_check_digit(text).ok_or_else(|| invalid("only digits are allowed".to_string()))?;
        digits.push(check);
    }
    if digits.len() < MIN_DIGITS || digits.len() % 2 != 0 {
        return Err(invalid(format!(
            "an even number of at least {MIN_DIGITS} digits is required, got {}",
            digits.len()
        )));
    }

    let mut modules = Vec::new();
    push_runs(&mut modules, &START_PATTERN, true);
    for pair in digits.chunks(2) {
        let first = DIGIT_ENCODINGS[(pair[0] - b'0') as usize];
        let second = DIGIT_ENCODINGS[(pair[1] - b'0') as usize];
        let interleaved: Vec<u8> = widths(first, wide)
            .zip(widths(second, wide))
            .flat_map(|(b, s)| [b, s])
            .collect();
        push_runs(&mut modules, &interleaved, true);
    }
    push_runs(&mut modules, &[wide, 1, 1], true);

    let modifier = if with_checksum { b'1' } else { b'0' };
    let content = Content::new(digits, SymbologyIdentifier::new(b'I', modifier));
    Ok(Encoded {
        modules,
        hrt: content.text(crate::TextMode::Plain),
        content,
    })
}

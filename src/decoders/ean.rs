//! EAN/UPC barcode decoder and encoder
//!
//! Covers EAN-13, EAN-8, UPC-A, UPC-E and ISBN, plus the two and five digit
//! add-on symbols printed to the right of the main symbol. UPC-A is an
//! EAN-13 whose first digit is 0.

use super::{
    best_match, gtin_check_digit, has_valid_gtin_check, pattern_variance, push_runs,
    DecodeContext, Decoded, Encoded, Row,
};
use crate::{
    content::{Content, SymbologyIdentifier},
    error::BarcodeError,
    BarcodeFormat, EanAddOnSymbol, Error, Result,
};

// ============================================================================
// Lookup tables
// ============================================================================

/// Digit patterns, light run first. Entries 10..20 are the G (even parity)
/// patterns, the mirror images of the L patterns.
const LG_PATTERNS: [[u8; 4]; 20] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
    [1, 1, 2, 3],
    [1, 2, 2, 2],
    [2, 2, 1, 2],
    [1, 1, 4, 1],
    [2, 3, 1, 1],
    [1, 3, 2, 1],
    [4, 1, 1, 1],
    [2, 1, 3, 1],
    [3, 1, 2, 1],
    [2, 1, 1, 3],
];

/// Parity of the six left-hand digits of an EAN-13, indexed by the implied
/// first digit. A set bit means G parity.
const FIRST_DIGIT_ENCODINGS: [u32; 10] =
    [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

/// UPC-E digit parity, indexed by number system and check digit.
const NUMSYS_AND_CHECK_DIGIT_PATTERNS: [[u32; 10]; 2] = [
    [0x38, 0x34, 0x32, 0x31, 0x2C, 0x26, 0x23, 0x2A, 0x29, 0x25],
    [0x07, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A],
];

/// EAN-5 digit parity, indexed by check digit.
const CHECK_DIGIT_ENCODINGS: [u32; 10] =
    [0x18, 0x14, 0x12, 0x11, 0x0C, 0x06, 0x03, 0x0A, 0x09, 0x05];

const START_END_GUARD: [u8; 3] = [1, 1, 1];
const MIDDLE_GUARD: [u8; 5] = [1, 1, 1, 1, 1];
const UPCE_END_GUARD: [u8; 6] = [1, 1, 1, 1, 1, 1];
const ADD_ON_START: [u8; 3] = [1, 1, 2];
const ADD_ON_SEPARATOR: [u8; 2] = [1, 1];

const MAX_AVG_VARIANCE: f32 = 0.48;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

/// Minimum light margin on either side of a symbol, in modules.
const QUIET_ZONE: f32 = 5.0;
/// Gap between main symbol and add-on written by [`encode`], in modules.
const ADD_ON_GAP: usize = 9;

// ============================================================================
// Decoding
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Ean13,
    Ean8,
    UpcE,
}

struct MainSymbol {
    layout: Layout,
    /// All digits including the (implied) first and the check digit.
    digits: String,
    checksum_ok: bool,
    end: usize,
    module: f32,
}

fn is_pattern(row: &Row, at: usize, pattern: &[u8], module: f32) -> bool {
    let Some(window) = row.window(at, pattern.len()) else {
        return false;
    };
    let expected = pattern.iter().map(|&p| p as f32).sum::<f32>() * module;
    let actual = window.iter().sum::<u32>() as f32;
    (actual - expected).abs() <= expected / 2.0
        && pattern_variance(window, pattern, MAX_INDIVIDUAL_VARIANCE) < MAX_AVG_VARIANCE
}

/// Decode `count` digits, `stride` runs apart, returning their values and
/// the parity mask (first digit in the most significant bit).
fn digits_at(
    row: &Row,
    at: usize,
    count: usize,
    stride: usize,
    with_g: bool,
) -> Option<(Vec<u8>, u32)> {
    let patterns = if with_g { &LG_PATTERNS[..] } else { &LG_PATTERNS[..10] };
    let mut digits = Vec::with_capacity(count);
    let mut parity = 0;
    for x in 0..count {
        let window = row.window(at + x * stride, 4)?;
        let m = best_match(window, patterns, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        digits.push((m % 10) as u8);
        if m >= 10 {
            parity |= 1 << (count - 1 - x);
        }
    }
    Some((digits, parity))
}

fn to_ascii(digits: &[u8]) -> String {
    digits.iter().map(|&d| char::from(b'0' + d)).collect()
}

fn has_quiet_zones(row: &Row, begin: usize, end: usize, module: f32) -> bool {
    row.quiet_before(begin, QUIET_ZONE * module) && row.quiet_after(end, QUIET_ZONE * module)
}

fn decode_ean13(row: &Row, i: usize) -> Option<MainSymbol> {
    let module = row.sum(i, 59) as f32 / 95.0;
    if !is_pattern(row, i, &START_END_GUARD, module)
        || !is_pattern(row, i + 27, &MIDDLE_GUARD, module)
        || !is_pattern(row, i + 56, &START_END_GUARD, module)
        || !has_quiet_zones(row, i, i + 59, module)
    {
        return None;
    }
    let (left, parity) = digits_at(row, i + 3, 6, 4, true)?;
    let (right, _) = digits_at(row, i + 32, 6, 4, false)?;
    let first = FIRST_DIGIT_ENCODINGS.iter().position(|&p| p == parity)? as u8;

    let mut all = vec![first];
    all.extend(left);
    all.extend(right);
    let digits = to_ascii(&all);
    Some(MainSymbol {
        layout: Layout::Ean13,
        checksum_ok: has_valid_gtin_check(digits.as_bytes()),
        digits,
        end: i + 59,
        module,
    })
}

fn decode_ean8(row: &Row, i: usize) -> Option<MainSymbol> {
    let module = row.sum(i, 43) as f32 / 67.0;
    if !is_pattern(row, i, &START_END_GUARD, module)
        || !is_pattern(row, i + 19, &MIDDLE_GUARD, module)
        || !is_pattern(row, i + 40, &START_END_GUARD, module)
        || !has_quiet_zones(row, i, i + 43, module)
    {
        return None;
    }
    let (mut all, _) = digits_at(row, i + 3, 4, 4, false)?;
    let (right, _) = digits_at(row, i + 24, 4, 4, false)?;
    all.extend(right);
    let digits = to_ascii(&all);
    Some(MainSymbol {
        layout: Layout::Ean8,
        checksum_ok: has_valid_gtin_check(digits.as_bytes()),
        digits,
        end: i + 43,
        module,
    })
}

fn decode_upce(row: &Row, i: usize) -> Option<MainSymbol> {
    let module = row.sum(i, 33) as f32 / 51.0;
    if !is_pattern(row, i, &START_END_GUARD, module)
        || !is_pattern(row, i + 27, &UPCE_END_GUARD, module)
        || !has_quiet_zones(row, i, i + 33, module)
    {
        return None;
    }
    let (middle, parity) = digits_at(row, i + 3, 6, 4, true)?;
    let (numsys, check) = NUMSYS_AND_CHECK_DIGIT_PATTERNS
        .iter()
        .enumerate()
        .find_map(|(n, row)| row.iter().position(|&p| p == parity).map(|c| (n as u8, c as u8)))?;

    let mut all = vec![numsys];
    all.extend(middle);
    all.push(check);
    let digits = to_ascii(&all);
    let checksum_ok =
        upce_to_upca(&digits).is_some_and(|upca| has_valid_gtin_check(upca.as_bytes()));
    Some(MainSymbol {
        layout: Layout::UpcE,
        digits,
        checksum_ok,
        end: i + 33,
        module,
    })
}

/// Decode an add-on symbol starting with the bar at run `j`.
fn decode_add_on(row: &Row, j: usize, module: f32) -> Option<(String, usize)> {
    let gap = row.width(j.checked_sub(1)?) as f32 / module;
    if !(5.0..=15.0).contains(&gap) || !is_pattern(row, j, &ADD_ON_START, module) {
        return None;
    }
    [5, 2].into_iter().find_map(|count| {
        let (digits, parity) = digits_at(row, j + 3, count, 6, true)?;
        let separators_ok =
            (0..count - 1).all(|k| is_pattern(row, j + 7 + 6 * k, &ADD_ON_SEPARATOR, module));
        let end = j + 3 + 6 * (count - 1) + 4;
        if !separators_ok || !row.quiet_after(end, QUIET_ZONE * module) {
            return None;
        }
        let valid = match count {
            5 => CHECK_DIGIT_ENCODINGS.get(ean5_check(&digits) as usize) == Some(&parity),
            _ => (digits[0] as u32 * 10 + digits[1] as u32) % 4 == parity,
        };
        valid.then(|| (to_ascii(&digits), end))
    })
}

fn ean5_check(digits: &[u8]) -> u32 {
    let d: Vec<u32> = digits.iter().map(|&d| d as u32).collect();
    (3 * (d[0] + d[2] + d[4]) + 9 * (d[1] + d[3])) % 10
}

/// Expand an 8 digit UPC-E number into the 12 digit UPC-A it abbreviates.
pub(crate) fn upce_to_upca(upce: &str) -> Option<String> {
    let b = upce.as_bytes();
    if b.len() < 7 || !b.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let d = |i: usize| char::from(b[i]);
    let mut out = String::with_capacity(12);
    out.push(d(0));
    match b[6] {
        b'0'..=b'2' => {
            out.extend([d(1), d(2), d(6)]);
            out.push_str("0000");
            out.extend([d(3), d(4), d(5)]);
        }
        b'3' => {
            out.extend([d(1), d(2), d(3)]);
            out.push_str("00000");
            out.extend([d(4), d(5)]);
        }
        b'4' => {
            out.extend([d(1), d(2), d(3), d(4)]);
            out.push_str("00000");
            out.push(d(5));
        }
        _ => {
            out.extend([d(1), d(2), d(3), d(4), d(5)]);
            out.push_str("0000");
            out.push(d(6));
        }
    }
    out.push(char::from(gtin_check_digit(out.as_bytes())?));
    Some(out)
}

pub(crate) fn decode(row: &Row, i: usize, ctx: &DecodeContext) -> Option<Decoded> {
    let candidates: [(bool, fn(&Row, usize) -> Option<MainSymbol>); 3] = [
        (
            ctx.wants_any(&[BarcodeFormat::EAN13, BarcodeFormat::UPCA, BarcodeFormat::ISBN]),
            decode_ean13,
        ),
        (ctx.accepts(BarcodeFormat::EAN8), decode_ean8),
        (ctx.accepts(BarcodeFormat::UPCE), decode_upce),
    ];
    let main = candidates
        .iter()
        .filter(|(wanted, _)| *wanted)
        .find_map(|(_, decode)| decode(row, i))?;

    let add_on = match ctx.ean_add_on {
        EanAddOnSymbol::Ignore => None,
        _ => decode_add_on(row, main.end + 1, main.module),
    };
    if ctx.ean_add_on == EanAddOnSymbol::Require && add_on.is_none() {
        return None;
    }

    let digits = main.digits.as_str();
    let bookland = digits.starts_with("978") || digits.starts_with("979");
    let (format, mut text) = match main.layout {
        Layout::Ean13 if ctx.names(BarcodeFormat::ISBN) && bookland => {
            (BarcodeFormat::ISBN, digits.to_string())
        }
        Layout::Ean13 if digits.starts_with('0') && ctx.accepts(BarcodeFormat::UPCA) => {
            (BarcodeFormat::UPCA, digits[1..].to_string())
        }
        Layout::Ean13 => (BarcodeFormat::EAN13, digits.to_string()),
        Layout::Ean8 => (BarcodeFormat::EAN8, digits.to_string()),
        Layout::UpcE => (BarcodeFormat::UPCE, digits.to_string()),
    };

    let mut extra = Vec::new();
    if main.layout == Layout::UpcE {
        if let Some(upca) = upce_to_upca(digits) {
            extra.push(("UPC-A", upca));
        }
    }
    let mut end = main.end;
    if let Some((add_on, add_on_end)) = add_on {
        text.push(' ');
        text.push_str(&add_on);
        extra.push(("AddOn", add_on));
        end = add_on_end;
    }

    let symbology = symbology_for(main.layout, extra.iter().any(|(k, _)| *k == "AddOn"));
    let mut decoded = Decoded::new(format, Content::new(text.into_bytes(), symbology), i, end);
    decoded.extra = extra;
    if !main.checksum_ok {
        decoded = decoded.with_error(BarcodeError::checksum("check digit mismatch"));
    }
    Some(decoded)
}

fn symbology_for(layout: Layout, has_add_on: bool) -> SymbologyIdentifier {
    match (layout, has_add_on) {
        (_, true) => SymbologyIdentifier::new(b'E', b'3'),
        (Layout::Ean8, false) => SymbologyIdentifier::new(b'E', b'4'),
        _ => SymbologyIdentifier::new(b'E', b'0'),
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn invalid(format: BarcodeFormat, reason: impl Into<String>) -> Error {
    Error::InvalidContent {
        format: format.name().to_string(),
        reason: reason.into(),
    }
}

/// Append the check digit to `body`, or verify the one present.
fn with_check_digit(format: BarcodeFormat, digits: &str, len: usize) -> Result<String> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format, "only digits are allowed"));
    }
    if digits.len() == len - 1 {
        let check =
            gtin_check_digit(digits.as_bytes()).ok_or_else(|| invalid(format, "not a number"))?;
        return Ok(format!("{digits}{}", char::from(check)));
    }
    if digits.len() != len {
        let reason = format!("expected {} or {len} digits, got {}", len - 1, digits.len());
        return Err(invalid(format, reason));
    }
    if !has_valid_gtin_check(digits.as_bytes()) {
        return Err(invalid(format, "check digit mismatch"));
    }
    Ok(digits.to_string())
}

fn digit_values(digits: &str) -> Vec<u8> {
    digits.bytes().map(|b| b - b'0').collect()
}

fn push_digit(modules: &mut Vec<bool>, digit: u8, g_parity: bool, right_half: bool) {
    let pattern = LG_PATTERNS[digit as usize + if g_parity { 10 } else { 0 }];
    push_runs(modules, &pattern, right_half);
}

fn encode_ean13(digits: &[u8]) -> Vec<bool> {
    let parity = FIRST_DIGIT_ENCODINGS[digits[0] as usize];
    let mut m = Vec::with_capacity(95);
    push_runs(&mut m, &START_END_GUARD, true);
    for (x, &d) in digits[1..7].iter().enumerate() {
        push_digit(&mut m, d, parity >> (5 - x) & 1 == 1, false);
    }
    push_runs(&mut m, &MIDDLE_GUARD, false);
    for &d in &digits[7..13] {
        push_digit(&mut m, d, false, true);
    }
    push_runs(&mut m, &START_END_GUARD, true);
    m
}

fn encode_ean8(digits: &[u8]) -> Vec<bool> {
    let mut m = Vec::with_capacity(67);
    push_runs(&mut m, &START_END_GUARD, true);
    for &d in &digits[..4] {
        push_digit(&mut m, d, false, false);
    }
    push_runs(&mut m, &MIDDLE_GUARD, false);
    for &d in &digits[4..8] {
        push_digit(&mut m, d, false, true);
    }
    push_runs(&mut m, &START_END_GUARD, true);
    m
}

fn encode_upce(digits: &[u8]) -> Vec<bool> {
    let parity = NUMSYS_AND_CHECK_DIGIT_PATTERNS[digits[0] as usize][digits[7] as usize];
    let mut m = Vec::with_capacity(51);
    push_runs(&mut m, &START_END_GUARD, true);
    for (x, &d) in digits[1..7].iter().enumerate() {
        push_digit(&mut m, d, parity >> (5 - x) & 1 == 1, false);
    }
    push_runs(&mut m, &UPCE_END_GUARD, false);
    m
}

fn encode_add_on(format: BarcodeFormat, add_on: &str, modules: &mut Vec<bool>) -> Result<()> {
    if !add_on.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format, "add-on must be digits"));
    }
    let digits = digit_values(add_on);
    let parity = match digits.len() {
        2 => (digits[0] as u32 * 10 + digits[1] as u32) % 4,
        5 => CHECK_DIGIT_ENCODINGS[ean5_check(&digits) as usize],
        n => return Err(invalid(format, format!("add-on must have 2 or 5 digits, got {n}"))),
    };
    modules.extend(std::iter::repeat(false).take(ADD_ON_GAP));
    push_runs(modules, &ADD_ON_START, true);
    let count = digits.len();
    for (x, &d) in digits.iter().enumerate() {
        if x > 0 {
            push_runs(modules, &ADD_ON_SEPARATOR, false);
        }
        push_digit(modules, d, parity >> (count - 1 - x) & 1 == 1, false);
    }
    Ok(())
}

/// Encode `text` (digits, optionally followed by a space and a 2 or 5 digit
/// add-on) as one of the EAN/UPC formats.
pub(crate) fn encode(format: BarcodeFormat, text: &str) -> Result<Encoded> {
    let (main, add_on) = match text.split_once(' ') {
        Some((main, add_on)) => (main, Some(add_on)),
        None => (text, None),
    };

    let (digits, modules, layout) = match format {
        BarcodeFormat::EAN13 => {
            let digits = with_check_digit(format, main, 13)?;
            let modules = encode_ean13(&digit_values(&digits));
            (digits, modules, Layout::Ean13)
        }
        BarcodeFormat::UPCA => {
            let digits = with_check_digit(format, main, 12)?;
            let modules = encode_ean13(&digit_values(&format!("0{digits}")));
            (digits, modules, Layout::Ean13)
        }
        BarcodeFormat::EAN8 => {
            let digits = with_check_digit(format, main, 8)?;
            let modules = encode_ean8(&digit_values(&digits));
            (digits, modules, Layout::Ean8)
        }
        BarcodeFormat::UPCE => {
            if !main.starts_with(['0', '1']) {
                return Err(invalid(format, "number system must be 0 or 1"));
            }
            let digits = match main.len() {
                7 => {
                    let upca = upce_to_upca(&format!("{main}0"))
                        .ok_or_else(|| invalid(format, "only digits are allowed"))?;
                    format!("{main}{}", &upca[11..])
                }
                8 => {
                    let upca = upce_to_upca(main)
                        .ok_or_else(|| invalid(format, "only digits are allowed"))?;
                    if !upca.ends_with(&main[7..]) {
                        return Err(invalid(format, "check digit mismatch"));
                    }
                    main.to_string()
                }
                n => return Err(invalid(format, format!("expected 7 or 8 digits, got {n}"))),
            };
            let modules = encode_upce(&digit_values(&digits));
            (digits, modules, Layout::UpcE)
        }
        _ => return Err(Error::NotCreatable(format.to_string())),
    };

    let mut modules = modules;
    let mut text = digits;
    if let Some(add_on) = add_on {
        encode_add_on(format, add_on, &mut modules)?;
        text.push(' ');
        text.push_str(add_on);
    }

    let symbology = symbology_for(layout, add_on.is_some());
    Ok(Encoded {
        modules,
        hrt: text.clone(),
        content: Content::new(text.into_bytes(), symbology),
    })
}

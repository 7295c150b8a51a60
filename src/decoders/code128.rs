//! Code 128 barcode decoder and encoder
//!
//! Three code sets share one table of 107 patterns, each eleven modules
//! wide. Set A covers ASCII control characters and upper case, set B the
//! printable ASCII range, set C digit pairs. FNC4 lifts the following
//! character into the Latin-1 upper half; FNC1 in first position marks GS1
//! data.

use super::{best_match, pattern_variance, push_runs, DecodeContext, Decoded, Encoded, Row};
use crate::{
    content::{Content, SymbologyIdentifier},
    error::BarcodeError,
    BarcodeFormat, Error, Result,
};

// ============================================================================
// Lookup tables
// ============================================================================

const fn p(s: &[u8; 6]) -> [u8; 6] {
    [s[0] - b'0', s[1] - b'0', s[2] - b'0', s[3] - b'0', s[4] - b'0', s[5] - b'0']
}

/// Bar/space widths of every code value, bar first.
const CODE_PATTERNS: [[u8; 6]; 107] = [
    p(b"212222"), p(b"222122"), p(b"222221"), p(b"121223"), p(b"121322"), // 0
    p(b"131222"), p(b"122213"), p(b"122312"), p(b"132212"), p(b"221213"), // 5
    p(b"221312"), p(b"231212"), p(b"112232"), p(b"122132"), p(b"122231"), // 10
    p(b"113222"), p(b"123122"), p(b"123221"), p(b"223211"), p(b"221132"), // 15
    p(b"221231"), p(b"213212"), p(b"223112"), p(b"312131"), p(b"311222"), // 20
    p(b"321122"), p(b"321221"), p(b"312212"), p(b"322112"), p(b"322211"), // 25
    p(b"212123"), p(b"212321"), p(b"232121"), p(b"111323"), p(b"131123"), // 30
    p(b"131321"), p(b"112313"), p(b"132113"), p(b"132311"), p(b"211313"), // 35
    p(b"231113"), p(b"231311"), p(b"112133"), p(b"112331"), p(b"132131"), // 40
    p(b"113123"), p(b"113321"), p(b"133121"), p(b"313121"), p(b"211331"), // 45
    p(b"231131"), p(b"213113"), p(b"213311"), p(b"213131"), p(b"311123"), // 50
    p(b"311321"), p(b"331121"), p(b"312113"), p(b"312311"), p(b"332111"), // 55
    p(b"314111"), p(b"221411"), p(b"431111"), p(b"111224"), p(b"111422"), // 60
    p(b"121124"), p(b"121421"), p(b"141122"), p(b"141221"), p(b"112214"), // 65
    p(b"112412"), p(b"122114"), p(b"122411"), p(b"142112"), p(b"142211"), // 70
    p(b"241211"), p(b"221114"), p(b"413111"), p(b"241112"), p(b"134111"), // 75
    p(b"111242"), p(b"121142"), p(b"121241"), p(b"114212"), p(b"124112"), // 80
    p(b"124211"), p(b"411212"), p(b"421112"), p(b"421211"), p(b"212141"), // 85
    p(b"214121"), p(b"412121"), p(b"111143"), p(b"111341"), p(b"131141"), // 90
    p(b"114113"), p(b"114311"), p(b"411113"), p(b"411311"), p(b"113141"), // 95
    p(b"114131"), p(b"311141"), p(b"411131"), p(b"211412"), p(b"211214"), // 100
    p(b"211232"), p(b"233111"),                                           // 105
];

const STOP_PATTERN: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

const CODE_FNC_3: usize = 96;
const CODE_FNC_2: usize = 97;
const CODE_SHIFT: usize = 98;
const CODE_CODE_C: usize = 99;
const CODE_CODE_B: usize = 100;
const CODE_CODE_A: usize = 101;
const CODE_FNC_1: usize = 102;
const CODE_START_A: usize = 103;
const CODE_START_B: usize = 104;
const CODE_START_C: usize = 105;
const CODE_STOP: usize = 106;

/// FNC4 shares its value with the switch to the current set.
const CODE_FNC_4_A: usize = CODE_CODE_A;
const CODE_FNC_4_B: usize = CODE_CODE_B;

const GS: u8 = 0x1D;

const MAX_AVG_VARIANCE: f32 = 0.25;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;
const QUIET_ZONE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

fn checksum(codes: &[usize]) -> usize {
    let (start, data) = match codes.split_first() {
        Some(parts) => parts,
        None => return 0,
    };
    data.iter()
        .enumerate()
        .fold(*start, |sum, (i, &code)| sum + (i + 1) * code)
        % 103
}

// ============================================================================
// Decoding
// ============================================================================

fn char_width_ok(window: &[u32], modules: f32, module: f32) -> bool {
    let expected = modules * module;
    (window.iter().sum::<u32>() as f32 - expected).abs() <= expected / 2.0
}

/// Read code values from the start code at run `i` up to the stop pattern.
/// Returns the codes (start and check included) and the run after the stop.
fn read_codes(row: &Row, i: usize) -> Option<(Vec<usize>, usize, f32)> {
    let window = row.window(i, 6)?;
    let start = best_match(
        window,
        &CODE_PATTERNS[CODE_START_A..=CODE_START_C],
        MAX_AVG_VARIANCE,
        MAX_INDIVIDUAL_VARIANCE,
    )? + CODE_START_A;
    let module = row.sum(i, 6) as f32 / 11.0;
    if !row.quiet_before(i, QUIET_ZONE * module) {
        return None;
    }

    let mut codes = vec![start];
    let mut j = i + 6;
    loop {
        let window = row.window(j, 6)?;
        if !char_width_ok(window, 11.0, module) {
            return None;
        }
        let code = best_match(window, &CODE_PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        if code == CODE_STOP {
            let stop = row.window(j, 7)?;
            if pattern_variance(stop, &STOP_PATTERN, MAX_INDIVIDUAL_VARIANCE) >= MAX_AVG_VARIANCE {
                return None;
            }
            let end = j + 7;
            return row
                .quiet_after(end, QUIET_ZONE * module)
                .then_some((codes, end, module));
        }
        codes.push(code);
        j += 6;
    }
}

/// Turn data code values into bytes. Returns the payload and whether it
/// started with FNC1.
fn decode_codes(start: usize, data: &[usize]) -> Result<(Vec<u8>, bool), BarcodeError> {
    let mut set = match start {
        CODE_START_A => CodeSet::A,
        CODE_START_B => CodeSet::B,
        _ => CodeSet::C,
    };
    let mut out = Vec::new();
    let mut gs1 = false;
    let mut shift = false;
    let mut fnc4_next = false;
    let mut fnc4_latch = false;
    let mut last_was_fnc4 = false;

    for (pos, &code) in data.iter().enumerate() {
        let current = if shift {
            match set {
                CodeSet::A => CodeSet::B,
                _ => CodeSet::A,
            }
        } else {
            set
        };
        shift = false;
        let was_fnc4 = std::mem::take(&mut last_was_fnc4);

        match (current, code) {
            (_, CODE_START_A..=CODE_STOP) => {
                return Err(BarcodeError::format("unexpected start code"))
            }
            (_, CODE_FNC_1) => {
                if pos == 0 {
                    gs1 = true;
                } else {
                    out.push(GS);
                }
            }
            (CodeSet::C, 0..=99) => {
                out.push(b'0' + (code / 10) as u8);
                out.push(b'0' + (code % 10) as u8);
            }
            (CodeSet::C, CODE_CODE_B) => set = CodeSet::B,
            (CodeSet::C, CODE_CODE_A) => set = CodeSet::A,
            (CodeSet::C, _) => return Err(BarcodeError::format("invalid code in set C")),
            (CodeSet::A, 0..=63) | (CodeSet::B, 0..=95) => {
                out.push(lift(code as u8 + 32, fnc4_latch, &mut fnc4_next))
            }
            (CodeSet::A, 64..=95) => out.push(lift(code as u8 - 64, fnc4_latch, &mut fnc4_next)),
            (_, CODE_FNC_2 | CODE_FNC_3) => {}
            (_, CODE_SHIFT) => shift = true,
            (_, CODE_CODE_C) => set = CodeSet::C,
            (CodeSet::A, CODE_FNC_4_A) | (CodeSet::B, CODE_FNC_4_B) => {
                if was_fnc4 {
                    fnc4_latch = !fnc4_latch;
                    fnc4_next = false;
                } else {
                    fnc4_next = true;
                    last_was_fnc4 = true;
                }
            }
            (CodeSet::A, _) => set = CodeSet::B,
            (CodeSet::B, _) => set = CodeSet::A,
        }
    }
    Ok((out, gs1))
}

/// Apply a pending FNC4 shift or an active FNC4 latch.
fn lift(c: u8, latch: bool, next: &mut bool) -> u8 {
    if latch != std::mem::take(next) {
        c | 0x80
    } else {
        c
    }
}

pub(crate) fn decode(row: &Row, i: usize, _ctx: &DecodeContext) -> Option<Decoded> {
    let (codes, end, _) = read_codes(row, i)?;
    if codes.len() < 2 {
        return None;
    }
    let (check, body) = codes.split_last()?;
    let (start, data) = body.split_first()?;

    let (content, error) = match decode_codes(*start, data) {
        Ok((bytes, true)) => (Content::gs1(bytes, SymbologyIdentifier::new(b'C', b'1')), None),
        Ok((bytes, false)) => (Content::new(bytes, SymbologyIdentifier::new(b'C', b'0')), None),
        Err(e) => (Content::new(Vec::new(), SymbologyIdentifier::new(b'C', b'0')), Some(e)),
    };
    let error = error.or_else(|| {
        (checksum(body) != *check).then(|| BarcodeError::checksum("check character mismatch"))
    });

    let decoded = Decoded::new(BarcodeFormat::CODE128, content, i, end);
    Some(match error {
        Some(e) => decoded.with_error(e),
        None => decoded,
    })
}

// ============================================================================
// Encoding
// ============================================================================

struct Encoder {
    codes: Vec<usize>,
    set: Option<CodeSet>,
    gs1: bool,
}

impl Encoder {
    fn switch_to(&mut self, target: CodeSet) {
        if self.set == Some(target) {
            return;
        }
        let code = match (self.set, target) {
            (None, CodeSet::A) => CODE_START_A,
            (None, CodeSet::B) => CODE_START_B,
            (None, CodeSet::C) => CODE_START_C,
            (Some(_), CodeSet::A) => CODE_CODE_A,
            (Some(_), CodeSet::B) => CODE_CODE_B,
            (Some(_), CodeSet::C) => CODE_CODE_C,
        };
        let first = self.set.is_none();
        self.codes.push(code);
        self.set = Some(target);
        if first && self.gs1 {
            self.codes.push(CODE_FNC_1);
        }
    }

    /// Emit one byte in set A or B.
    fn push_char(&mut self, b: u8) {
        let c = b & 0x7F;
        let target = match (c, self.set) {
            (0..=31, _) => CodeSet::A,
            (96..=127, _) => CodeSet::B,
            (_, Some(CodeSet::A)) => CodeSet::A,
            _ => CodeSet::B,
        };
        self.switch_to(target);
        if b >= 0x80 {
            self.codes.push(match target {
                CodeSet::A => CODE_FNC_4_A,
                _ => CODE_FNC_4_B,
            });
        }
        self.codes.push(match (target, c) {
            (CodeSet::A, 0..=31) => c as usize + 64,
            _ => c as usize - 32,
        });
    }
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Encode raw bytes. With `gs1`, the symbol starts with FNC1 and every
/// `0x1D` in `bytes` becomes FNC1.
pub(crate) fn encode(bytes: &[u8], gs1: bool) -> Result<Encoded> {
    if bytes.is_empty() {
        return Err(Error::InvalidContent {
            format: BarcodeFormat::CODE128.name().to_string(),
            reason: "content must not be empty".to_string(),
        });
    }

    let mut enc = Encoder {
        codes: Vec::new(),
        set: None,
        gs1,
    };
    let mut p = 0;
    while p < bytes.len() {
        if gs1 && bytes[p] == GS {
            if enc.set.is_none() {
                enc.switch_to(CodeSet::B);
            }
            enc.codes.push(CODE_FNC_1);
            p += 1;
            continue;
        }
        let digits = digit_run(&bytes[p..]);
        if (enc.set == Some(CodeSet::C) && digits >= 2) || (digits >= 4 && digits % 2 == 0) {
            enc.switch_to(CodeSet::C);
            let pair = &bytes[p..p + 2];
            enc.codes.push(((pair[0] - b'0') * 10 + (pair[1] - b'0')) as usize);
            p += 2;
            continue;
        }
        enc.push_char(bytes[p]);
        p += 1;
    }

    let check = checksum(&enc.codes);
    enc.codes.push(check);

    let mut modules = Vec::with_capacity(enc.codes.len() * 11 + 13);
    for &code in &enc.codes {
        push_runs(&mut modules, &CODE_PATTERNS[code], true);
    }
    push_runs(&mut modules, &STOP_PATTERN, true);

    let content = if gs1 {
        Content::gs1(bytes.to_vec(), SymbologyIdentifier::new(b'C', b'1'))
    } else {
        Content::new(bytes.to_vec(), SymbologyIdentifier::new(b'C', b'0'))
    };
    Ok(Encoded {
        modules,
        hrt: content.text(crate::TextMode::HRI),
        content,
    })
}

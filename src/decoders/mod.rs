//! Barcode decoder implementations
//!
//! Each submodule decodes one linear symbology from a run-length encoded scan
//! line and encodes the same symbology into a row of modules. The run-length
//! helpers and pattern matching shared by all of them live here.

pub(crate) mod codabar;
pub(crate) mod code128;
pub(crate) mod code39;
pub(crate) mod ean;
pub(crate) mod i25;

use crate::{
    content::Content, error::BarcodeError, options::FormatOptions, BarcodeFormat, BarcodeFormats,
    EanAddOnSymbol, Error, ReaderOptions, Result,
};

// ============================================================================
// Scan lines
// ============================================================================

/// Run-length encoded scan line.
///
/// Even indices are light runs, odd indices dark runs. Run 0 is the light run
/// touching the left edge and may be empty.
#[derive(Debug, Clone, Default)]
pub(crate) struct Row {
    runs: Vec<u32>,
    starts: Vec<u32>,
}

impl Row {
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut runs = vec![0u32];
        let mut dark = false;
        for bit in bits {
            if bit != dark {
                runs.push(0);
                dark = bit;
            }
            if let Some(last) = runs.last_mut() {
                *last += 1;
            }
        }
        let mut starts = Vec::with_capacity(runs.len());
        let mut pos = 0;
        for &w in &runs {
            starts.push(pos);
            pos += w;
        }
        Self { runs, starts }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    #[inline]
    pub fn width(&self, i: usize) -> u32 {
        self.runs.get(i).copied().unwrap_or(0)
    }

    /// Pixel offset of run `i`.
    pub fn start(&self, i: usize) -> u32 {
        match self.starts.get(i) {
            Some(&s) => s,
            None => self.starts.last().map_or(0, |&s| s) + self.runs.last().map_or(0, |&w| w),
        }
    }

    /// `n` runs starting at `i`, if that many exist.
    #[inline]
    pub fn window(&self, i: usize, n: usize) -> Option<&[u32]> {
        self.runs.get(i..i + n)
    }

    pub fn sum(&self, i: usize, n: usize) -> u32 {
        self.window(i, n).map_or(0, |w| w.iter().sum())
    }

    /// Light run before bar `i` is wide enough, or touches the edge.
    pub fn quiet_before(&self, i: usize, min_width: f32) -> bool {
        i == 1 || (i > 1 && self.width(i - 1) as f32 >= min_width)
    }

    /// Light run `i` (following a symbol) is wide enough, or touches the edge.
    pub fn quiet_after(&self, i: usize, min_width: f32) -> bool {
        i + 1 >= self.runs.len() || self.width(i) as f32 >= min_width
    }
}

// ============================================================================
// Pattern matching
// ============================================================================

/// Average per-pixel deviation of `counters` from `pattern` (in modules),
/// or `f32::INFINITY` when any single element is off by more than
/// `max_individual` modules.
pub(crate) fn pattern_variance(counters: &[u32], pattern: &[u8], max_individual: f32) -> f32 {
    let total: u32 = counters.iter().sum();
    let pattern_len: u32 = pattern.iter().map(|&p| p as u32).sum();
    if total < pattern_len || pattern_len == 0 {
        return f32::INFINITY;
    }
    let unit = total as f32 / pattern_len as f32;
    let max_individual = max_individual * unit;
    let mut variance = 0.0;
    for (&c, &p) in counters.iter().zip(pattern) {
        let diff = (c as f32 - p as f32 * unit).abs();
        if diff > max_individual {
            return f32::INFINITY;
        }
        variance += diff;
    }
    variance / total as f32
}

/// Index of the best matching pattern below `max_variance`.
pub(crate) fn best_match<P: AsRef<[u8]>>(
    counters: &[u32],
    patterns: &[P],
    max_variance: f32,
    max_individual: f32,
) -> Option<usize> {
    let mut best = None;
    let mut best_variance = max_variance;
    for (i, pattern) in patterns.iter().enumerate() {
        let variance = pattern_variance(counters, pattern.as_ref(), max_individual);
        if variance < best_variance {
            best_variance = variance;
            best = Some(i);
        }
    }
    best
}

/// Classify a narrow/wide character as a bit pattern, most significant bit
/// first, 1 meaning wide. Narrow and wide must be clearly separated.
pub(crate) fn narrow_wide_bits(counters: &[u32]) -> Option<u32> {
    let min = *counters.iter().min()?;
    let max = *counters.iter().max()?;
    if max * 2 < min * 3 {
        return None;
    }
    let threshold = (min + max) as f32 / 2.0;
    Some(
        counters
            .iter()
            .fold(0, |bits, &c| (bits << 1) | (c as f32 > threshold) as u32),
    )
}

// ============================================================================
// Check digits
// ============================================================================

/// GS1 mod-10 check digit for `digits` (ASCII, without the check digit).
pub(crate) fn gtin_check_digit(digits: &[u8]) -> Option<u8> {
    let mut sum = 0u32;
    for (i, &d) in digits.iter().rev().enumerate() {
        if !d.is_ascii_digit() {
            return None;
        }
        let v = (d - b'0') as u32;
        sum += if i % 2 == 0 { 3 * v } else { v };
    }
    Some(b'0' + ((10 - sum % 10) % 10) as u8)
}

/// Whether the last digit of `digits` is its GS1 check digit.
pub(crate) fn has_valid_gtin_check(digits: &[u8]) -> bool {
    match digits.split_last() {
        Some((&check, body)) => gtin_check_digit(body) == Some(check),
        None => false,
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Reader settings relevant to a single scan line.
pub(crate) struct DecodeContext<'a> {
    pub formats: &'a BarcodeFormats,
    pub validate_optional_checksum: bool,
    pub ean_add_on: EanAddOnSymbol,
}

impl<'a> DecodeContext<'a> {
    pub fn new(opts: &'a ReaderOptions) -> Self {
        Self {
            formats: opts.formats(),
            validate_optional_checksum: opts.validate_optional_checksum(),
            ean_add_on: opts.ean_add_on_symbol(),
        }
    }

    /// Is any member of `formats` acceptable?
    pub fn wants_any(&self, formats: &[BarcodeFormat]) -> bool {
        formats.iter().any(|&f| self.formats.accepts(f))
    }

    pub fn accepts(&self, format: BarcodeFormat) -> bool {
        self.formats.accepts(format)
    }

    /// Format was asked for by name, not just through a family or aggregate.
    pub fn names(&self, format: BarcodeFormat) -> bool {
        self.formats.names_explicitly(format)
    }
}

/// A symbol found on one scan line.
#[derive(Debug, Clone)]
pub(crate) struct Decoded {
    pub format: BarcodeFormat,
    pub content: Content,
    pub error: BarcodeError,
    /// Run index of the first bar.
    pub begin: usize,
    /// Run index one past the last bar.
    pub end: usize,
    pub extra: Vec<(&'static str, String)>,
}

impl Decoded {
    pub fn new(format: BarcodeFormat, content: Content, begin: usize, end: usize) -> Self {
        Self {
            format,
            content,
            error: BarcodeError::default(),
            begin,
            end,
            extra: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: BarcodeError) -> Self {
        self.error = error;
        self
    }
}

type DecodeFn = fn(&Row, usize, &DecodeContext) -> Option<Decoded>;

const DECODERS: [(DecodeFn, &[BarcodeFormat]); 5] = [
    (
        ean::decode,
        &[
            BarcodeFormat::EAN13,
            BarcodeFormat::EAN8,
            BarcodeFormat::UPCA,
            BarcodeFormat::UPCE,
            BarcodeFormat::ISBN,
        ],
    ),
    (code128::decode, &[BarcodeFormat::CODE128]),
    (
        code39::decode,
        &[BarcodeFormat::CODE39_STD, BarcodeFormat::CODE39_EXT],
    ),
    (i25::decode, &[BarcodeFormat::ITF, BarcodeFormat::ITF14]),
    (codabar::decode, &[BarcodeFormat::CODABAR]),
];

/// Find every symbol on one scan line, left to right.
pub(crate) fn decode_row(row: &Row, ctx: &DecodeContext) -> Vec<Decoded> {
    let decoders: Vec<DecodeFn> = DECODERS
        .iter()
        .filter(|(_, formats)| ctx.wants_any(formats))
        .map(|&(f, _)| f)
        .collect();

    let mut found = Vec::new();
    let mut i = 1;
    while i < row.len() {
        match decoders.iter().find_map(|decode| decode(row, i, ctx)) {
            Some(d) if ctx.accepts(d.format) => {
                i = d.end.max(i + 2) | 1;
                found.push(d);
            }
            _ => i += 2,
        }
    }
    found
}

// ============================================================================
// Encoding
// ============================================================================

/// A symbol laid out as a single row of modules, true meaning dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Encoded {
    pub modules: Vec<bool>,
    pub content: Content,
    /// Human readable text printed below the bars.
    pub hrt: String,
}

/// Append alternating runs of the given widths, starting with `dark`.
pub(crate) fn push_runs(modules: &mut Vec<bool>, widths: &[u8], mut dark: bool) {
    for &w in widths {
        modules.extend(std::iter::repeat(dark).take(w as usize));
        dark = !dark;
    }
}

/// Wide to narrow element ratio from the `wide` creator option.
pub(crate) fn wide_ratio(opts: &FormatOptions) -> Result<u8> {
    match opts.int("wide") {
        None => Ok(3),
        Some(w @ 2..=3) => Ok(w as u8),
        Some(w) => Err(Error::InvalidOption {
            key: "wide".to_string(),
            reason: format!("must be 2 or 3, got {w}"),
        }),
    }
}

/// Lay out `data` as a symbol of the given elementary format.
pub(crate) fn encode(format: BarcodeFormat, data: &[u8], opts: &FormatOptions) -> Result<Encoded> {
    match format {
        BarcodeFormat::EAN13 | BarcodeFormat::EAN8 | BarcodeFormat::UPCA | BarcodeFormat::UPCE => {
            let text = std::str::from_utf8(data).map_err(|_| Error::InvalidContent {
                format: format.name().to_string(),
                reason: "only digits are allowed".to_string(),
            })?;
            ean::encode(format, text)
        }
        BarcodeFormat::CODE128 => code128::encode(data, opts.flag("gs1")),
        BarcodeFormat::CODE39_STD | BarcodeFormat::CODE39_EXT => code39::encode(format, data, opts),
        BarcodeFormat::ITF => i25::encode(data, opts),
        BarcodeFormat::CODABAR => codabar::encode(data, opts),
        _ => Err(Error::NotCreatable(format.to_string())),
    }
}

/// Append a narrow/wide character given as bits (MSB first, 1 = wide).
pub(crate) fn push_narrow_wide(modules: &mut Vec<bool>, bits: u32, count: u32, wide: u8) {
    let widths: Vec<u8> = (0..count)
        .rev()
        .map(|i| if bits >> i & 1 == 1 { wide } else { 1 })
        .collect();
    push_runs(modules, &widths, true);
}

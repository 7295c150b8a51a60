//! Barcode format tags
//!
//! A [`BarcodeFormat`] is a 16-bit tag built from two bytes: the low byte is
//! the *family* key shared by every member of a symbology, the high byte is
//! the *variant* key. The space variant (`' '`) is the family's base tag.
//! Aggregate filters use the reserved `'*'` family with one mnemonic variant
//! per filter kind. Membership in an aggregate is a lookup in the format
//! catalog, not bit arithmetic.
//!
//! ```
//! use zxbridge::BarcodeFormat;
//!
//! let ean8: BarcodeFormat = "EAN-8".parse().unwrap();
//! assert_eq!(ean8, BarcodeFormat::EAN8);
//! assert_eq!(ean8.value(), 0x3845);
//! assert_eq!(ean8.symbology(), BarcodeFormat::EAN_UPC);
//! assert!(BarcodeFormat::list(BarcodeFormat::ALL_LINEAR).contains(&ean8));
//! ```

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{Error, Result};

const AGGREGATE_FAMILY: u8 = b'*';
const BASE_VARIANT: u8 = b' ';

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BarcodeFormat(u16);

/// One row of the format catalog.
struct Entry {
    format: BarcodeFormat,
    name: &'static str,
    /// Classification keys, matched against an aggregate's variant byte.
    flags: &'static str,
}

macro_rules! barcode_formats {
    ($(
        $(#[$doc:meta])*
        $ident:ident = ($family:literal, $variant:literal, $flags:literal, $name:literal);
    )*) => {
        impl BarcodeFormat {
            $(
                $(#[$doc])*
                pub const $ident: Self = Self::from_keys($family, $variant);
            )*
        }

        static CATALOG: &[Entry] = &[
            $(Entry { format: BarcodeFormat::$ident, name: $name, flags: $flags },)*
        ];
    };
}

// Flag keys: l linear, s stacked, m matrix, G GS1, R retail, I industrial,
// r readable and w creatable by the built-in engine.
barcode_formats! {
    /// Matches every known format.
    ALL = (b'*', b'*', "", "All");
    ALL_READABLE = (b'*', b'r', "", "All Readable");
    ALL_CREATABLE = (b'*', b'w', "", "All Creatable");
    ALL_LINEAR = (b'*', b'l', "", "All Linear");
    ALL_MATRIX = (b'*', b'm', "", "All Matrix");
    ALL_GS1 = (b'*', b'G', "", "All GS1");
    ALL_RETAIL = (b'*', b'R', "", "All Retail");
    ALL_INDUSTRIAL = (b'*', b'I', "", "All Industrial");

    CODABAR = (b'F', b' ', "lIrw", "Codabar");

    CODE39 = (b'A', b' ', "lI", "Code 39");
    CODE39_STD = (b'A', b's', "lIrw", "Code 39 Standard");
    CODE39_EXT = (b'A', b'e', "lIrw", "Code 39 Extended");
    CODE32 = (b'A', b'2', "lI", "Code 32");
    PZN = (b'A', b'p', "lI", "PZN");

    CODE93 = (b'G', b' ', "lI", "Code 93");

    CODE128 = (b'C', b' ', "lGIrw", "Code 128");

    ITF = (b'I', b' ', "lIrw", "ITF");
    ITF14 = (b'I', b'4', "lGIr", "ITF-14");

    DATABAR = (b'e', b' ', "lGR", "DataBar");
    DATABAR_OMNI = (b'e', b'o', "lGR", "DataBar Omni");
    DATABAR_STK = (b'e', b's', "lsGR", "DataBar Stacked");
    DATABAR_STK_OMNI = (b'e', b'O', "lsGR", "DataBar Stacked Omni");
    DATABAR_LTD = (b'e', b'l', "lGR", "DataBar Limited");
    DATABAR_EXP = (b'e', b'e', "lGR", "DataBar Expanded");
    DATABAR_EXP_STK = (b'e', b'E', "lsGR", "DataBar Expanded Stacked");

    /// Base tag of the EAN/UPC family.
    EAN_UPC = (b'E', b' ', "lR", "EAN/UPC");
    EAN13 = (b'E', b'1', "lRrw", "EAN-13");
    EAN8 = (b'E', b'8', "lRrw", "EAN-8");
    EAN5 = (b'E', b'5', "lR", "EAN-5");
    EAN2 = (b'E', b'2', "lR", "EAN-2");
    ISBN = (b'E', b'i', "lRr", "ISBN");
    UPCA = (b'E', b'a', "lRrw", "UPC-A");
    UPCE = (b'E', b'e', "lRrw", "UPC-E");

    OTHER_BARCODE = (b'X', b' ', "", "Other Barcode");
    DX_FILM_EDGE = (b'X', b'x', "l", "DX Film Edge");

    PDF417 = (b'L', b' ', "sI", "PDF417");
    COMPACT_PDF417 = (b'L', b'c', "sI", "Compact PDF417");
    MICRO_PDF417 = (b'L', b'm', "sI", "MicroPDF417");

    AZTEC = (b'z', b' ', "mGI", "Aztec");
    AZTEC_CODE = (b'z', b'c', "mGI", "Aztec Code");
    AZTEC_RUNE = (b'z', b'r', "mI", "Aztec Rune");

    QR_CODE = (b'Q', b' ', "mGI", "QR Code");
    QR_CODE_MODEL1 = (b'Q', b'1', "mI", "QR Code Model 1");
    QR_CODE_MODEL2 = (b'Q', b'2', "mGI", "QR Code Model 2");
    MICRO_QR_CODE = (b'Q', b'm', "mI", "Micro QR Code");
    RMQR_CODE = (b'Q', b'r', "mGI", "rMQR Code");

    DATA_MATRIX = (b'd', b' ', "mGI", "Data Matrix");
    MAXICODE = (b'U', b' ', "mI", "MaxiCode");
}

impl BarcodeFormat {
    pub const NONE: Self = Self(0);
    /// Returned by lenient parsing when a name is not recognized.
    pub const INVALID: Self = Self(0xFFFF);

    pub const fn from_keys(family: u8, variant: u8) -> Self {
        Self(((variant as u16) << 8) | family as u16)
    }

    pub const fn from_value(value: u16) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn family(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn variant(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_aggregate(self) -> bool {
        self.family() == AGGREGATE_FAMILY && self.entry().is_some()
    }

    /// True for every catalog entry that is not an aggregate filter.
    pub fn is_elementary(self) -> bool {
        self.family() != AGGREGATE_FAMILY && self.entry().is_some()
    }

    /// Base tag of the family, e.g. any EAN/UPC variant maps to [`Self::EAN_UPC`].
    ///
    /// `NONE`, `INVALID` and aggregate filters map to themselves.
    pub fn symbology(self) -> Self {
        if self.variant() == 0 || self == Self::INVALID || self.family() == AGGREGATE_FAMILY {
            return self;
        }
        Self::from_keys(self.family(), BASE_VARIANT)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NONE => "None",
            Self::INVALID => "Invalid",
            _ => self.entry().map_or("Unknown", |e| e.name),
        }
    }

    /// Two-character `]SV` form of the tag, e.g. `]E8` for EAN-8.
    pub fn id_str(self) -> String {
        format!("]{}{}", self.family() as char, self.variant() as char)
    }

    pub fn is_readable(self) -> bool {
        self.has_flag(b'r')
    }

    pub fn is_creatable(self) -> bool {
        self.has_flag(b'w')
    }

    pub fn is_linear(self) -> bool {
        self.has_flag(b'l')
    }

    pub fn is_matrix(self) -> bool {
        self.has_flag(b'm')
    }

    /// Does `self` belong to the set described by `filter`?
    ///
    /// `NONE` and `ALL` match every elementary format. Other aggregates are
    /// resolved through the catalog flags, a family base tag matches all of
    /// its variants, and an elementary tag matches itself.
    pub fn matches(self, filter: BarcodeFormat) -> bool {
        if !self.is_elementary() {
            return false;
        }
        if filter == Self::NONE || filter == Self::ALL {
            return true;
        }
        if filter.family() == AGGREGATE_FAMILY {
            return self.has_flag(filter.variant());
        }
        self == filter
            || (filter.variant() == BASE_VARIANT && self.family() == filter.family())
    }

    /// Elementary formats matching `filter`, in catalog order.
    pub fn list(filter: BarcodeFormat) -> Vec<BarcodeFormat> {
        CATALOG
            .iter()
            .map(|e| e.format)
            .filter(|f| f.matches(filter))
            .collect()
    }

    /// Parse like [`FromStr`], but map unknown names to [`Self::INVALID`].
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Self::INVALID)
    }

    fn entry(self) -> Option<&'static Entry> {
        CATALOG.iter().find(|e| e.format == self)
    }

    fn has_flag(self, key: u8) -> bool {
        self.family() != AGGREGATE_FAMILY
            && self.entry().is_some_and(|e| e.flags.as_bytes().contains(&key))
    }
}

/// Compare ignoring ASCII case and the separator characters ` -_/`.
fn is_equal_ignore_case_and(a: &str, b: &str) -> bool {
    let strip = |s: &str| {
        s.chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_' | '/'))
            .map(|c| c.to_ascii_lowercase())
            .collect::<String>()
    };
    strip(a) == strip(b)
}

impl FromStr for BarcodeFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // the base variant is a space, so look for `]SV` before trimming
        let bytes = s.as_bytes();
        if bytes.len() == 3 && bytes[0] == b']' {
            let format = Self::from_keys(bytes[1], bytes[2]);
            if format.entry().is_some() {
                return Ok(format);
            }
        }
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::NONE);
        }
        if is_equal_ignore_case_and(s, "None") {
            return Ok(Self::NONE);
        }
        CATALOG
            .iter()
            .find(|e| is_equal_ignore_case_and(s, e.name))
            .map(|e| e.format)
            .ok_or_else(|| Error::InvalidFormat(s.to_string()))
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BarcodeFormat({}, {:#06x})", self.name(), self.0)
    }
}

impl PartialOrd for BarcodeFormat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BarcodeFormat {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.family(), self.variant()).cmp(&(other.family(), other.variant()))
    }
}

impl From<BarcodeFormat> for u16 {
    fn from(value: BarcodeFormat) -> Self {
        value.0
    }
}

impl From<u16> for BarcodeFormat {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

// ============================================================================
// Format sets
// ============================================================================

/// Sorted, duplicate free set of format tags, as used for reader filters.
///
/// An empty set means "no restriction".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BarcodeFormats(Vec<BarcodeFormat>);

impl BarcodeFormats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = BarcodeFormat> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[BarcodeFormat] {
        &self.0
    }

    pub fn insert(&mut self, format: BarcodeFormat) {
        self.0.push(format);
        self.normalize();
    }

    /// Does `format` pass this filter? Empty sets accept everything.
    pub fn accepts(&self, format: BarcodeFormat) -> bool {
        self.0.is_empty() || self.0.iter().any(|&filter| format.matches(filter))
    }

    /// Is `format` itself (not merely its family or an aggregate) part of the set?
    pub fn names_explicitly(&self, format: BarcodeFormat) -> bool {
        self.0.contains(&format)
    }

    /// Expand all aggregates and family tags into elementary formats.
    pub fn list(&self) -> BarcodeFormats {
        if self.0.is_empty() {
            return BarcodeFormat::list(BarcodeFormat::NONE).into_iter().collect();
        }
        self.0
            .iter()
            .flat_map(|&f| BarcodeFormat::list(f))
            .collect()
    }

    fn normalize(&mut self) {
        self.0.retain(|f| !f.is_none());
        self.0.sort();
        self.0.dedup();
    }
}

impl FromIterator<BarcodeFormat> for BarcodeFormats {
    fn from_iter<T: IntoIterator<Item = BarcodeFormat>>(iter: T) -> Self {
        let mut formats = Self(iter.into_iter().collect());
        formats.normalize();
        formats
    }
}

impl From<BarcodeFormat> for BarcodeFormats {
    fn from(value: BarcodeFormat) -> Self {
        std::iter::once(value).collect()
    }
}

impl From<&[BarcodeFormat]> for BarcodeFormats {
    fn from(value: &[BarcodeFormat]) -> Self {
        value.iter().copied().collect()
    }
}

impl FromStr for BarcodeFormats {
    type Err = Error;

    /// Accepts a run of `]SV` identifiers followed by names separated by
    /// `,` or `|`, e.g. `"]E8]C  QR Code, ITF|EAN-13"`.
    fn from_str(s: &str) -> Result<Self> {
        let mut formats = Vec::new();
        let mut rest = s.trim_start();
        while rest.starts_with(']') {
            let Some(id) = rest.get(..3) else {
                return Err(Error::InvalidFormat(rest.to_string()));
            };
            formats.push(id.parse()?);
            rest = &rest[3..];
        }
        let rest = rest.trim_matches(|c: char| c.is_whitespace() || c == '[' || c == ']');
        for token in rest.split([',', '|']).map(str::trim) {
            if !token.is_empty() {
                formats.push(token.parse()?);
            }
        }
        Ok(formats.into_iter().collect())
    }
}

impl fmt::Display for BarcodeFormats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, format) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(format.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elementary() -> Vec<BarcodeFormat> {
        CATALOG
            .iter()
            .map(|e| e.format)
            .filter(|f| f.is_elementary())
            .collect()
    }

    #[test]
    fn test_tag_values() {
        assert_eq!(BarcodeFormat::EAN8.value(), 0x3845);
        assert_eq!(BarcodeFormat::ALL.value(), 0x2A2A);
        assert_eq!(BarcodeFormat::ALL_GS1.value(), 0x472A);
        assert_eq!(BarcodeFormat::CODE128.value(), 0x2043);
        assert_eq!(BarcodeFormat::RMQR_CODE.value(), 0x7251);
        assert_eq!(BarcodeFormat::DATABAR_STK_OMNI.value(), 0x4F65);
        assert_eq!(BarcodeFormat::EAN8.family(), b'E');
        assert_eq!(BarcodeFormat::EAN8.variant(), b'8');
    }

    #[test]
    fn test_name_round_trip() {
        for f in elementary() {
            assert_eq!(f.to_string().parse::<BarcodeFormat>().unwrap(), f, "{f:?}");
            assert_eq!(f.id_str().parse::<BarcodeFormat>().unwrap(), f, "{f:?}");
        }
        assert_eq!("None".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::NONE);
    }

    #[test]
    fn test_parse_is_lenient_about_case_and_separators() {
        for s in ["EAN-8", "ean8", "Ean_8", " ean 8 "] {
            assert_eq!(s.parse::<BarcodeFormat>().unwrap(), BarcodeFormat::EAN8);
        }
        assert_eq!("qrcode".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::QR_CODE);
        assert_eq!("EANUPC".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::EAN_UPC);
        assert_eq!("all-linear".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::ALL_LINEAR);
    }

    #[test]
    fn test_parse_empty_and_unknown() {
        assert_eq!("".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::NONE);
        assert!(matches!(
            "Code 11".parse::<BarcodeFormat>(),
            Err(Error::InvalidFormat(_))
        ));
        assert_eq!(BarcodeFormat::parse_lenient("nope"), BarcodeFormat::INVALID);
    }

    #[test]
    fn test_symbology() {
        for f in [
            BarcodeFormat::EAN13,
            BarcodeFormat::EAN8,
            BarcodeFormat::UPCE,
            BarcodeFormat::ISBN,
            BarcodeFormat::EAN_UPC,
        ] {
            assert_eq!(f.symbology(), BarcodeFormat::EAN_UPC);
        }
        assert_eq!(BarcodeFormat::CODE39_EXT.symbology(), BarcodeFormat::CODE39);
        assert_eq!(BarcodeFormat::NONE.symbology(), BarcodeFormat::NONE);
        assert_eq!(BarcodeFormat::ALL_LINEAR.symbology(), BarcodeFormat::ALL_LINEAR);
    }

    #[test]
    fn test_aggregate_lists_are_elementary_and_consistent() {
        let aggregates = CATALOG.iter().map(|e| e.format).filter(|f| f.is_aggregate());
        for g in aggregates {
            let members = BarcodeFormat::list(g);
            assert!(!members.is_empty(), "{g:?}");
            for m in members {
                assert!(m.is_elementary(), "{m:?} in {g:?}");
                match g {
                    BarcodeFormat::ALL_LINEAR => assert!(m.is_linear() && !m.is_matrix()),
                    BarcodeFormat::ALL_MATRIX => assert!(m.is_matrix() && !m.is_linear()),
                    BarcodeFormat::ALL_READABLE => assert!(m.is_readable()),
                    BarcodeFormat::ALL_CREATABLE => assert!(m.is_creatable()),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_creatable_formats_are_readable() {
        for f in BarcodeFormat::list(BarcodeFormat::ALL_CREATABLE) {
            assert!(f.is_readable(), "{f:?}");
        }
    }

    #[test]
    fn test_list_family_and_elementary() {
        let ean = BarcodeFormat::list(BarcodeFormat::EAN_UPC);
        assert_eq!(ean.len(), 8);
        assert!(ean.iter().all(|f| f.family() == b'E'));
        assert_eq!(BarcodeFormat::list(BarcodeFormat::EAN8), vec![BarcodeFormat::EAN8]);
        assert!(BarcodeFormat::list(BarcodeFormat::INVALID).is_empty());
        assert_eq!(
            BarcodeFormat::list(BarcodeFormat::NONE),
            BarcodeFormat::list(BarcodeFormat::ALL)
        );
    }

    #[test]
    fn test_format_set_parsing() {
        let formats: BarcodeFormats = "EAN-8, QR Code|code128".parse().unwrap();
        assert_eq!(
            formats.as_slice(),
            &[BarcodeFormat::CODE128, BarcodeFormat::EAN8, BarcodeFormat::QR_CODE]
        );
        assert_eq!(formats.to_string(), "Code 128, EAN-8, QR Code");

        let ids: BarcodeFormats = "]E8]C ".parse().unwrap();
        assert_eq!(ids.as_slice(), &[BarcodeFormat::CODE128, BarcodeFormat::EAN8]);

        assert!("EAN-8, Foo".parse::<BarcodeFormats>().is_err());

        // identifiers must name a catalog entry and be whole characters
        assert!(matches!("]ZZ".parse::<BarcodeFormats>(), Err(Error::InvalidFormat(_))));
        assert!(matches!("]E8]ZZ".parse::<BarcodeFormats>(), Err(Error::InvalidFormat(_))));
        assert!(matches!("]a\u{E9}".parse::<BarcodeFormats>(), Err(Error::InvalidFormat(_))));
        assert!("]\u{E9}8".parse::<BarcodeFormats>().is_err());
        assert!("]E".parse::<BarcodeFormats>().is_err());
        assert!("".parse::<BarcodeFormats>().unwrap().is_empty());
    }

    #[test]
    fn test_format_set_accepts() {
        let filter: BarcodeFormats = "EAN/UPC".parse().unwrap();
        assert!(filter.accepts(BarcodeFormat::UPCA));
        assert!(!filter.accepts(BarcodeFormat::CODE128));
        assert!(BarcodeFormats::new().accepts(BarcodeFormat::CODE128));
        assert_eq!(filter.list().len(), 8);
    }
}

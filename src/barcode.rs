//! Barcode results
//!
//! A [`Barcode`] is either found by the reader or produced by the writer
//! from text or bytes. Reader results carry their position in the image and
//! the number of scan lines that confirmed them; created barcodes carry the
//! module layout the renderer draws.

use std::fmt;

use serde_json::{Map, Value};

use crate::{
    content::Content,
    decoders::{Decoded, Encoded},
    error::{BarcodeError, ErrorType},
    BarcodeFormat, ContentType, Error, Result, TextMode,
};

/// Integer pixel coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointI {
    pub x: i32,
    pub y: i32,
}

impl PointI {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for PointI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Corners of a symbol, clockwise from the top left as the symbol reads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub top_left: PointI,
    pub top_right: PointI,
    pub bottom_right: PointI,
    pub bottom_left: PointI,
}

impl Position {
    pub const fn new(
        top_left: PointI,
        top_right: PointI,
        bottom_right: PointI,
        bottom_left: PointI,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    pub fn corners(&self) -> [PointI; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// Direction of the reading axis in radians, 0 for left to right.
    pub fn orientation(&self) -> f64 {
        let (tl, tr, br, bl) = (self.top_left, self.top_right, self.bottom_right, self.bottom_left);
        let dx = (tr.x + br.x - tl.x - bl.x) as f64;
        let dy = (tr.y + br.y - tl.y - bl.y) as f64;
        if dx == 0.0 && dy == 0.0 {
            return 0.0;
        }
        dy.atan2(dx)
    }

    pub(crate) fn scaled(&self, factor: i32) -> Self {
        let s = |p: PointI| PointI::new(p.x * factor, p.y * factor);
        Self::new(s(self.top_left), s(self.top_right), s(self.bottom_right), s(self.bottom_left))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.top_left, self.top_right, self.bottom_right, self.bottom_left
        )
    }
}

/// Membership in a multi-symbol message. Linear symbols never take part in
/// one, so the built-in engine always reports the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredAppend {
    pub index: i32,
    pub count: i32,
    pub id: String,
}

impl Default for StructuredAppend {
    fn default() -> Self {
        Self {
            index: -1,
            count: -1,
            id: String::new(),
        }
    }
}

/// Module layout of a created barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Symbol {
    pub modules: Vec<bool>,
    pub hrt: String,
}

/// A decoded or created barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barcode {
    format: BarcodeFormat,
    content: Content,
    error: BarcodeError,
    position: Position,
    line_count: i32,
    is_inverted: bool,
    is_mirrored: bool,
    structured_append: StructuredAppend,
    extra: Vec<(&'static str, String)>,
    text_mode: TextMode,
    symbol: Option<Symbol>,
}

impl Barcode {
    pub(crate) fn from_decoded(
        decoded: Decoded,
        position: Position,
        line_count: i32,
        text_mode: TextMode,
    ) -> Self {
        Self {
            format: decoded.format,
            content: decoded.content,
            error: decoded.error,
            position,
            line_count,
            is_inverted: false,
            is_mirrored: false,
            structured_append: StructuredAppend::default(),
            extra: decoded.extra,
            text_mode,
            symbol: None,
        }
    }

    pub(crate) fn from_encoded(format: BarcodeFormat, encoded: Encoded) -> Self {
        let right = encoded.modules.len().saturating_sub(1) as i32;
        let position = Position::new(
            PointI::new(0, 0),
            PointI::new(right, 0),
            PointI::new(right, 0),
            PointI::new(0, 0),
        );
        Self {
            format,
            content: encoded.content,
            error: BarcodeError::default(),
            position,
            line_count: 0,
            is_inverted: false,
            is_mirrored: false,
            structured_append: StructuredAppend::default(),
            extra: Vec::new(),
            text_mode: TextMode::default(),
            symbol: Some(Symbol {
                modules: encoded.modules,
                hrt: encoded.hrt,
            }),
        }
    }

    pub(crate) fn set_inverted(&mut self, inverted: bool) {
        self.is_inverted = inverted;
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn symbol(&self) -> Option<&Symbol> {
        self.symbol.as_ref()
    }

    /// Found or created without error
    pub fn is_valid(&self) -> bool {
        !self.format.is_none() && self.error.is_none()
    }

    /// Get the per-result decoding error, `ErrorType::None` when valid
    pub fn error(&self) -> &BarcodeError {
        &self.error
    }

    pub fn error_type(&self) -> ErrorType {
        self.error.kind()
    }

    /// Get the elementary format
    pub fn format(&self) -> BarcodeFormat {
        self.format
    }

    /// Get the base tag of the format's family
    pub fn symbology(&self) -> BarcodeFormat {
        self.format.symbology()
    }

    pub fn content_type(&self) -> ContentType {
        self.content.content_type()
    }

    /// Get the decoded data as bytes
    pub fn bytes(&self) -> &[u8] {
        self.content.bytes()
    }

    /// Payload with the symbology identifier prepended and ECI escaping
    /// applied
    pub fn bytes_eci(&self) -> Vec<u8> {
        self.content.bytes_eci()
    }

    /// Text rendered with the reader's text mode
    pub fn text(&self) -> String {
        self.content.text(self.text_mode)
    }

    pub fn text_with(&self, mode: TextMode) -> String {
        self.content.text(mode)
    }

    /// Linear symbols have no error correction, so this is always empty.
    pub fn ec_level(&self) -> &str {
        ""
    }

    /// ISO/IEC 15424 identifier such as `]E4`
    pub fn symbology_identifier(&self) -> String {
        self.content.symbology().to_string()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Clockwise rotation of the symbol in whole degrees, `0..360`.
    pub fn orientation(&self) -> i32 {
        (self.position.orientation().to_degrees().round() as i32).rem_euclid(360)
    }

    pub fn has_eci(&self) -> bool {
        self.content.has_eci()
    }

    pub fn is_inverted(&self) -> bool {
        self.is_inverted
    }

    pub fn is_mirrored(&self) -> bool {
        self.is_mirrored
    }

    /// Number of scan lines the symbol was found on
    pub fn line_count(&self) -> i32 {
        self.line_count
    }

    pub fn sequence_index(&self) -> i32 {
        self.structured_append.index
    }

    pub fn sequence_size(&self) -> i32 {
        self.structured_append.count
    }

    pub fn sequence_id(&self) -> &str {
        &self.structured_append.id
    }

    pub fn structured_append(&self) -> &StructuredAppend {
        &self.structured_append
    }

    /// Format specific metadata as a JSON object, empty when there is none.
    pub fn extra(&self) -> String {
        if self.extra.is_empty() {
            return String::new();
        }
        let map: Map<String, Value> = self
            .extra
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        Value::Object(map).to_string()
    }

    pub fn extra_value(&self, key: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Results of one read
///
/// Individual results can be moved out by index; the remaining ones stay
/// addressable at their original positions.
#[derive(Debug, Clone, Default)]
pub struct Barcodes {
    items: Vec<Option<Barcode>>,
}

impl Barcodes {
    /// Get the number of results, moved ones included
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrow the result at `index`.
    pub fn get(&self, index: usize) -> Result<&Barcode> {
        match self.items.get(index) {
            Some(Some(barcode)) => Ok(barcode),
            Some(None) => Err(Error::AlreadyMoved(index)),
            None => Err(Error::IndexOutOfRange {
                index,
                size: self.items.len(),
            }),
        }
    }

    /// Move the result at `index` out of the collection.
    pub fn take(&mut self, index: usize) -> Result<Barcode> {
        let size = self.items.len();
        match self.items.get_mut(index) {
            Some(slot) => slot.take().ok_or(Error::AlreadyMoved(index)),
            None => Err(Error::IndexOutOfRange { index, size }),
        }
    }

    /// Iterate over the results still in the collection
    pub fn iter(&self) -> impl Iterator<Item = &Barcode> {
        self.items.iter().flatten()
    }
}

impl FromIterator<Barcode> for Barcodes {
    fn from_iter<T: IntoIterator<Item = Barcode>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().map(Some).collect(),
        }
    }
}

impl IntoIterator for Barcodes {
    type Item = Barcode;
    type IntoIter = std::iter::Flatten<std::vec::IntoIter<Option<Barcode>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SymbologyIdentifier;

    fn decoded(text: &str) -> Decoded {
        Decoded::new(
            BarcodeFormat::EAN8,
            Content::new(text.as_bytes().to_vec(), SymbologyIdentifier::new(b'E', b'4')),
            1,
            44,
        )
    }

    fn horizontal() -> Position {
        Position::new(
            PointI::new(10, 5),
            PointI::new(110, 5),
            PointI::new(110, 45),
            PointI::new(10, 45),
        )
    }

    #[test]
    fn test_accessors() {
        let b = Barcode::from_decoded(decoded("96385074"), horizontal(), 7, TextMode::HRI);
        assert!(b.is_valid());
        assert_eq!(b.format(), BarcodeFormat::EAN8);
        assert_eq!(b.symbology(), BarcodeFormat::EAN_UPC);
        assert_eq!(b.text(), "96385074");
        assert_eq!(b.symbology_identifier(), "]E4");
        assert_eq!(b.bytes_eci(), b"]E496385074".to_vec());
        assert_eq!(b.content_type(), ContentType::Text);
        assert_eq!(b.line_count(), 7);
        assert_eq!(b.orientation(), 0);
        assert_eq!(b.ec_level(), "");
        assert_eq!(b.sequence_index(), -1);
        assert_eq!(b.sequence_size(), -1);
        assert_eq!(b.sequence_id(), "");
        assert!(!b.has_eci());
        assert_eq!(b.extra(), "");
    }

    #[test]
    fn test_error_makes_invalid() {
        let d = decoded("96385075").with_error(BarcodeError::checksum("check digit mismatch"));
        let b = Barcode::from_decoded(d, horizontal(), 2, TextMode::HRI);
        assert!(!b.is_valid());
        assert_eq!(b.error_type(), ErrorType::Checksum);
        assert_eq!(b.error().to_string(), "ChecksumError: check digit mismatch");
    }

    #[test]
    fn test_extra_json() {
        let mut d = decoded("01234565");
        d.extra.push(("UPC-A", "012345000065".to_string()));
        let b = Barcode::from_decoded(d, horizontal(), 2, TextMode::HRI);
        assert_eq!(b.extra(), r#"{"UPC-A":"012345000065"}"#);
        assert_eq!(b.extra_value("UPC-A"), Some("012345000065"));
        assert_eq!(b.extra_value("AddOn"), None);
    }

    #[test]
    fn test_position() {
        let p = horizontal();
        assert_eq!(p.to_string(), "10x5 110x5 110x45 10x45");
        assert_eq!(p.orientation(), 0.0);
        let rotated = Position::new(
            PointI::new(45, 10),
            PointI::new(45, 110),
            PointI::new(5, 110),
            PointI::new(5, 10),
        );
        assert!((rotated.orientation() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_eq!(Position::default().orientation(), 0.0);
        assert_eq!(p.scaled(2).top_right, PointI::new(220, 10));
    }

    #[test]
    fn test_barcodes_move_out() {
        let mut list: Barcodes = (0..2)
            .map(|_| Barcode::from_decoded(decoded("96385074"), horizontal(), 2, TextMode::HRI))
            .collect();
        assert_eq!(list.len(), 2);
        assert!(list.take(0).is_ok());
        assert_eq!(list.take(0), Err(Error::AlreadyMoved(0)));
        assert_eq!(list.get(0).err(), Some(Error::AlreadyMoved(0)));
        assert!(list.get(1).is_ok());
        assert_eq!(list.take(5), Err(Error::IndexOutOfRange { index: 5, size: 2 }));
        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().count(), 1);
        assert_eq!(list.into_iter().count(), 1);
    }
}

//! Reader, writer and creator configuration
//!
//! All three are plain value objects. Every field has a getter, an in-place
//! setter and a consuming `with_*` builder, so options can be assembled the
//! same way the decoder configuration is:
//!
//! ```
//! use zxbridge::{BarcodeFormat, Binarizer, ReaderOptions};
//!
//! let opts = ReaderOptions::new()
//!     .with_formats(BarcodeFormat::ALL_LINEAR.into())
//!     .with_try_rotate(false)
//!     .with_binarizer(Binarizer::FixedThreshold)
//!     .with_max_number_of_symbols(1);
//! assert!(opts.try_harder());
//! assert_eq!(opts.min_line_count(), 2);
//! ```

use std::{collections::BTreeMap, fmt};

use log::warn;

use crate::{BarcodeFormat, BarcodeFormats, Error, Result};

macro_rules! property {
    ($(#[$doc:meta])* $field:ident: $ty:ty, $setter:ident, $builder:ident) => {
        $(#[$doc])*
        pub fn $field(&self) -> $ty {
            self.$field
        }

        pub fn $setter(&mut self, value: $ty) -> &mut Self {
            self.$field = value;
            self
        }

        pub fn $builder(mut self, value: $ty) -> Self {
            self.$field = value;
            self
        }
    };
}

macro_rules! c_enum {
    ($(#[$doc:meta])* $name:ident { $($(#[$vdoc:meta])* $variant:ident = $value:literal,)* }) => {
        $(#[$doc])*
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            $($(#[$vdoc])* $variant = $value,)*
        }

        impl TryFrom<i32> for $name {
            type Error = Error;

            fn try_from(value: i32) -> Result<Self> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    _ => Err(Error::InvalidArgument(format!(
                        "{value} is not a valid {}",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

c_enum! {
    /// How grey levels are split into dark and light modules.
    Binarizer {
        /// Threshold from the average of the surrounding blocks.
        #[default]
        LocalAverage = 0,
        /// One threshold for the whole image, taken from its histogram.
        GlobalHistogram = 1,
        /// Dark means a luminance of at most 127.
        FixedThreshold = 2,
        /// Only 0 is dark; for images that are already binary.
        BoolCast = 3,
    }
}

c_enum! {
    /// Handling of EAN-2/EAN-5 add-on symbols next to EAN/UPC codes.
    EanAddOnSymbol {
        #[default]
        Ignore = 0,
        /// Append the add-on when present.
        Read = 1,
        /// Drop EAN/UPC symbols without an add-on.
        Require = 2,
    }
}

c_enum! {
    /// How decoded bytes are turned into [`Barcode::text`](crate::Barcode::text).
    TextMode {
        /// Bytes transcoded to UTF-8, nothing else.
        Plain = 0,
        /// ECI protocol: symbology identifier, then the payload with `\` escaped.
        ECI = 1,
        /// Human readable interpretation, e.g. GS1 `(01)...` element strings.
        #[default]
        HRI = 2,
        /// Space separated upper case hex bytes.
        Hex = 3,
        /// Plain text with control characters written as `<GS>`, `<NUL>`, ...
        Escaped = 4,
    }
}

// ============================================================================
// Reader Options
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    formats: BarcodeFormats,
    try_harder: bool,
    try_rotate: bool,
    try_invert: bool,
    try_downscale: bool,
    is_pure: bool,
    return_errors: bool,
    validate_optional_checksum: bool,
    binarizer: Binarizer,
    ean_add_on_symbol: EanAddOnSymbol,
    text_mode: TextMode,
    min_line_count: u8,
    max_number_of_symbols: u8,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            formats: BarcodeFormats::new(),
            try_harder: true,
            try_rotate: true,
            try_invert: true,
            try_downscale: true,
            is_pure: false,
            return_errors: false,
            validate_optional_checksum: false,
            binarizer: Binarizer::LocalAverage,
            ean_add_on_symbol: EanAddOnSymbol::Ignore,
            text_mode: TextMode::HRI,
            min_line_count: 2,
            max_number_of_symbols: 0xFF,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats to look for; empty means all readable formats.
    pub fn formats(&self) -> &BarcodeFormats {
        &self.formats
    }

    pub fn set_formats(&mut self, formats: BarcodeFormats) -> &mut Self {
        self.formats = formats;
        self
    }

    pub fn with_formats(mut self, formats: BarcodeFormats) -> Self {
        self.formats = formats;
        self
    }

    property!(
        /// Spend more time on scan lines and candidates.
        try_harder: bool, set_try_harder, with_try_harder
    );
    property!(
        /// Also look for symbols rotated by 90 degrees.
        try_rotate: bool, set_try_rotate, with_try_rotate
    );
    property!(
        /// Also look for light-on-dark symbols.
        try_invert: bool, set_try_invert, with_try_invert
    );
    property!(
        /// Also search a downscaled copy of large images.
        try_downscale: bool, set_try_downscale, with_try_downscale
    );
    property!(
        /// Assume a single, axis aligned, computer generated symbol.
        is_pure: bool, set_is_pure, with_is_pure
    );
    property!(
        /// Report detections that failed to decode instead of dropping them.
        return_errors: bool, set_return_errors, with_return_errors
    );
    property!(
        /// Check optional check digits (Code 39, ITF) and fail on mismatch.
        validate_optional_checksum: bool,
        set_validate_optional_checksum,
        with_validate_optional_checksum
    );
    property!(binarizer: Binarizer, set_binarizer, with_binarizer);
    property!(ean_add_on_symbol: EanAddOnSymbol, set_ean_add_on_symbol, with_ean_add_on_symbol);
    property!(text_mode: TextMode, set_text_mode, with_text_mode);
    property!(
        /// Number of scan lines a linear symbol must be seen on.
        min_line_count: u8, set_min_line_count, with_min_line_count
    );
    property!(max_number_of_symbols: u8, set_max_number_of_symbols, with_max_number_of_symbols);
}

// ============================================================================
// Writer Options
// ============================================================================

/// Rendering controls for [`write_barcode_to_image`](crate::write_barcode_to_image)
/// and [`write_barcode_to_svg`](crate::write_barcode_to_svg).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    scale: i32,
    rotate: i32,
    add_hrt: bool,
    add_quiet_zones: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            scale: 0,
            rotate: 0,
            add_hrt: false,
            add_quiet_zones: true,
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    property!(
        /// `> 0`: pixels per module, `< 0`: target width in pixels, `0`: default.
        scale: i32, set_scale, with_scale
    );
    property!(
        /// Clockwise rotation in degrees, a multiple of 90.
        rotate: i32, set_rotate, with_rotate
    );
    property!(
        /// Add the human readable text below linear symbols.
        add_hrt: bool, set_add_hrt, with_add_hrt
    );
    property!(add_quiet_zones: bool, set_add_quiet_zones, with_add_quiet_zones);
}

// ============================================================================
// Creator Options
// ============================================================================

/// What to encode: the format and a free-form `key[=value], ...` string with
/// format specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreatorOptions {
    format: BarcodeFormat,
    options: String,
}

impl CreatorOptions {
    pub fn new(format: BarcodeFormat) -> Self {
        Self {
            format,
            options: String::new(),
        }
    }

    property!(format: BarcodeFormat, set_format, with_format);

    pub fn options(&self) -> &str {
        &self.options
    }

    pub fn set_options(&mut self, options: impl Into<String>) -> &mut Self {
        self.options = options.into();
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    /// Parse the option string against the allow-list of the chosen format.
    ///
    /// Unknown keys are logged and skipped; values of the wrong kind fail.
    pub fn format_options(&self) -> Result<FormatOptions> {
        FormatOptions::parse(self.format, &self.options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionKind {
    Bool,
    Int,
}

fn allowed_keys(format: BarcodeFormat) -> &'static [(&'static str, OptionKind)] {
    match format {
        BarcodeFormat::CODE128 => &[("gs1", OptionKind::Bool)],
        BarcodeFormat::CODE39_STD | BarcodeFormat::CODE39_EXT | BarcodeFormat::ITF => {
            &[("checksum", OptionKind::Bool), ("wide", OptionKind::Int)]
        }
        BarcodeFormat::CODABAR => &[("wide", OptionKind::Int)],
        _ => &[],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Typed view of a creator option string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatOptions(BTreeMap<String, OptionValue>);

impl FormatOptions {
    pub fn parse(format: BarcodeFormat, options: &str) -> Result<Self> {
        let allowed = allowed_keys(format);
        let mut map = BTreeMap::new();

        for item in options.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k.trim().to_ascii_lowercase(), Some(v.trim())),
                None => (item.to_ascii_lowercase(), None),
            };
            let Some(&(_, kind)) = allowed.iter().find(|(k, _)| *k == key) else {
                warn!("ignoring unknown option '{key}' for {format}");
                continue;
            };
            let value = parse_value(&key, kind, value)?;
            map.insert(key, value);
        }

        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(OptionValue::Bool(true)))
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(OptionValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

fn parse_value(key: &str, kind: OptionKind, value: Option<&str>) -> Result<OptionValue> {
    let invalid = |reason: &str| Error::InvalidOption {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    match (kind, value) {
        (OptionKind::Bool, None) => Ok(OptionValue::Bool(true)),
        (OptionKind::Bool, Some(v)) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(OptionValue::Bool(true)),
            "false" | "0" | "off" | "no" => Ok(OptionValue::Bool(false)),
            _ => Err(invalid("expected a boolean")),
        },
        (OptionKind::Int, Some(v)) => v
            .parse()
            .map(OptionValue::Int)
            .map_err(|_| invalid("expected an integer")),
        (OptionKind::Int, None) => Err(invalid("missing value")),
    }
}

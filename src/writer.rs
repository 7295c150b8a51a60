//! Barcode creation and rendering
//!
//! ```
//! use zxbridge::{
//!     create_barcode_from_text, read_barcode, write_barcode_to_image, BarcodeFormat,
//!     CreatorOptions, ReaderOptions, WriterOptions,
//! };
//!
//! let barcode = create_barcode_from_text("96385074", &CreatorOptions::new(BarcodeFormat::EAN8))?;
//! let image = write_barcode_to_image(&barcode, &WriterOptions::default())?;
//! let found = read_barcode(&image.view()?, &ReaderOptions::default()).unwrap();
//! assert_eq!(found.text(), "96385074");
//! # Ok::<(), zxbridge::Error>(())
//! ```

use std::{borrow::Cow, fmt::Write as _};

use log::debug;

use crate::{
    barcode::Symbol, decoders, options::FormatOptions, Barcode, BarcodeFormat, ContentType,
    CreatorOptions, Error, Image, Result, WriterOptions,
};

const QUIET_ZONE: usize = 10;
/// Height of linear symbols, in modules.
const SYMBOL_HEIGHT: usize = 50;
const DEFAULT_MODULE_SIZE: usize = 2;
/// Extra height below the bars reserved for the human readable text.
const HRT_HEIGHT: usize = 10;

const DARK: u8 = 0x00;
const LIGHT: u8 = 0xFF;

/// Encode `text`, given as Unicode, into a symbol of `opts.format()`.
///
/// Characters are mapped to ISO-8859-1; anything outside of it can not be
/// encoded by the linear symbologies.
pub fn create_barcode_from_text(text: &str, opts: &CreatorOptions) -> Result<Barcode> {
    if !encoding_rs::mem::is_str_latin1(text) {
        return Err(Error::InvalidContent {
            format: opts.format().to_string(),
            reason: "characters outside of ISO-8859-1".to_string(),
        });
    }
    create_barcode_from_bytes(&encoding_rs::mem::encode_latin1_lossy(text), opts)
}

/// Encode raw bytes into a symbol of `opts.format()`.
pub fn create_barcode_from_bytes(bytes: &[u8], opts: &CreatorOptions) -> Result<Barcode> {
    let format = opts.format();
    if !format.is_elementary() || !format.is_creatable() {
        return Err(Error::NotCreatable(format.to_string()));
    }
    let format_options = opts.format_options()?;
    let encoded = decoders::encode(format, bytes, &format_options)?;
    debug!("created {format} with {} modules", encoded.modules.len());
    Ok(Barcode::from_encoded(format, encoded))
}

/// Modules of a created barcode, or of a read one encoded again from its
/// payload.
fn symbol_of(barcode: &Barcode) -> Result<Cow<'_, Symbol>> {
    if let Some(symbol) = barcode.symbol() {
        return Ok(Cow::Borrowed(symbol));
    }
    let format = match barcode.format() {
        BarcodeFormat::ISBN => BarcodeFormat::EAN13,
        BarcodeFormat::ITF14 => BarcodeFormat::ITF,
        format => format,
    };
    let options = if barcode.content_type() == ContentType::GS1 { "gs1" } else { "" };
    let options = FormatOptions::parse(format, options)?;
    let encoded = decoders::encode(format, barcode.bytes(), &options)?;
    debug!("encoded read {format} again with {} modules", encoded.modules.len());
    Ok(Cow::Owned(Symbol {
        modules: encoded.modules,
        hrt: encoded.hrt,
    }))
}

/// Module row of a renderable barcode, with quiet zones when requested.
fn layout<'a>(barcode: &'a Barcode, opts: &WriterOptions) -> Result<(Cow<'a, Symbol>, Vec<bool>)> {
    if !barcode.is_valid() {
        return Err(Error::InvalidBarcode);
    }
    let symbol = symbol_of(barcode)?;
    if !matches!(opts.rotate(), 0 | 90 | 180 | 270) {
        return Err(Error::InvalidRotation(opts.rotate()));
    }

    let quiet = if opts.add_quiet_zones() { QUIET_ZONE } else { 0 };
    let mut modules = vec![false; quiet];
    modules.extend_from_slice(&symbol.modules);
    modules.resize(modules.len() + quiet, false);
    Ok((symbol, modules))
}

fn module_size(scale: i32, modules: usize) -> usize {
    match scale {
        0 => DEFAULT_MODULE_SIZE,
        s if s > 0 => s as usize,
        s => (s.unsigned_abs() as usize / modules.max(1)).max(1),
    }
}

/// Pixel dimensions of `modules` by `rows` at `size` pixels per module.
///
/// Both sides and the pixel count must fit in an `i32`.
fn raster_size(modules: usize, rows: usize, size: usize) -> Result<(usize, usize)> {
    let limit = i32::MAX as usize;
    let width = modules.checked_mul(size).filter(|&w| w <= limit);
    let height = rows.checked_mul(size).filter(|&h| h <= limit);
    match (width, height) {
        (Some(w), Some(h)) if w.checked_mul(h).is_some_and(|n| n <= limit) => Ok((w, h)),
        _ => Err(Error::InvalidArgument(format!(
            "a {modules}x{rows} module image at scale {size} is too large"
        ))),
    }
}

/// Render a barcode as a luminance raster.
///
/// `add_hrt` is ignored; the raster only carries the bars.
pub fn write_barcode_to_image(barcode: &Barcode, opts: &WriterOptions) -> Result<Image> {
    let (_, modules) = layout(barcode, opts)?;
    let size = module_size(opts.scale(), modules.len());
    let (width, height) = raster_size(modules.len(), SYMBOL_HEIGHT, size)?;

    let row: Vec<u8> = modules
        .iter()
        .flat_map(|&dark| std::iter::repeat(if dark { DARK } else { LIGHT }).take(size))
        .collect();
    let image = Image::new(width, height, row.repeat(height));
    Ok(image.rotated(opts.rotate()))
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Render a barcode as an SVG document, one `<rect>` per bar.
///
/// Coordinates are in modules; the `width`/`height` attributes carry the
/// pixel size implied by `scale`.
pub fn write_barcode_to_svg(barcode: &Barcode, opts: &WriterOptions) -> Result<String> {
    let (symbol, modules) = layout(barcode, opts)?;
    let size = module_size(opts.scale(), modules.len());
    let hrt = opts.add_hrt() && !symbol.hrt.is_empty();
    let w = modules.len();
    let h = SYMBOL_HEIGHT + if hrt { HRT_HEIGHT } else { 0 };
    raster_size(w, h, size)?;

    let (view_w, view_h, transform) = match opts.rotate() {
        90 => (h, w, format!(" transform=\"translate({h} 0) rotate(90)\"")),
        180 => (w, h, format!(" transform=\"translate({w} {h}) rotate(180)\"")),
        270 => (h, w, format!(" transform=\"translate(0 {w}) rotate(270)\"")),
        _ => (w, h, String::new()),
    };

    let mut svg = String::new();
    // writing to a String can not fail
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = write!(svg, r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" "#);
    let _ = writeln!(
        svg,
        r#"viewBox="0 0 {view_w} {view_h}" width="{}" height="{}">"#,
        view_w * size,
        view_h * size
    );
    let _ = writeln!(svg, r##"<rect width="100%" height="100%" fill="#FFFFFF"/>"##);
    let _ = writeln!(svg, r##"<g fill="#000000"{transform}>"##);

    let mut x = 0;
    for run in modules.chunk_by(|a, b| a == b) {
        if run[0] {
            let _ = writeln!(
                svg,
                r#"<rect x="{x}" y="0" width="{}" height="{SYMBOL_HEIGHT}"/>"#,
                run.len()
            );
        }
        x += run.len();
    }
    if hrt {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" "#,
            w as f32 / 2.0,
            SYMBOL_HEIGHT + HRT_HEIGHT - 2
        );
        let _ = writeln!(
            svg,
            r#"font-family="monospace" font-size="8">{}</text>"#,
            escape_xml(&symbol.hrt)
        );
    }
    svg.push_str("</g>\n</svg>\n");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BarcodeFormat, ReaderOptions};

    fn ean8() -> Barcode {
        create_barcode_from_text("96385074", &CreatorOptions::new(BarcodeFormat::EAN8)).unwrap()
    }

    #[test]
    fn test_create() {
        let b = ean8();
        assert!(b.is_valid());
        assert_eq!(b.format(), BarcodeFormat::EAN8);
        assert_eq!(b.text(), "96385074");
        assert_eq!(b.symbol().map(|s| s.modules.len()), Some(67));
    }

    #[test]
    fn test_create_rejects() {
        let aggregate = CreatorOptions::new(BarcodeFormat::ALL_LINEAR);
        assert!(matches!(create_barcode_from_text("1", &aggregate), Err(Error::NotCreatable(_))));
        let qr = CreatorOptions::new(BarcodeFormat::QR_CODE);
        assert!(matches!(create_barcode_from_text("1", &qr), Err(Error::NotCreatable(_))));
        let ean = CreatorOptions::new(BarcodeFormat::EAN8);
        assert!(matches!(create_barcode_from_text("abc", &ean), Err(Error::InvalidContent { .. })));
        let code128 = CreatorOptions::new(BarcodeFormat::CODE128);
        assert!(create_barcode_from_text("\u{20AC}", &code128).is_err());
        let bad_option = CreatorOptions::new(BarcodeFormat::CODE128).with_options("gs1=maybe");
        assert!(create_barcode_from_text("123", &bad_option).is_err());
    }

    #[test]
    fn test_latin1_text() {
        let code128 = CreatorOptions::new(BarcodeFormat::CODE128);
        let b = create_barcode_from_text("Gr\u{FC}\u{DF}e", &code128).unwrap();
        assert_eq!(b.bytes(), b"Gr\xFC\xDFe");
        assert_eq!(b.text(), "Gr\u{FC}\u{DF}e");
    }

    #[test]
    fn test_image_size() {
        let b = ean8();
        let img = write_barcode_to_image(&b, &WriterOptions::default()).unwrap();
        assert_eq!(img.width(), (67 + 20) * 2);
        assert_eq!(img.height(), 100);
        assert_eq!(img.data()[0], LIGHT);
        assert_eq!(img.data()[20], DARK);

        let opts = WriterOptions::default().with_scale(3).with_add_quiet_zones(false);
        let img = write_barcode_to_image(&b, &opts).unwrap();
        assert_eq!((img.width(), img.height()), (67 * 3, 150));
        assert_eq!(img.data()[0], DARK);

        let opts = WriterOptions::default().with_scale(-400);
        let img = write_barcode_to_image(&b, &opts).unwrap();
        assert_eq!(img.width(), 87 * 4);

        let opts = WriterOptions::default().with_rotate(90);
        let img = write_barcode_to_image(&b, &opts).unwrap();
        assert_eq!((img.width(), img.height()), (100, 174));
    }

    #[test]
    fn test_invalid_rotation() {
        let opts = WriterOptions::default().with_rotate(45);
        assert!(matches!(write_barcode_to_image(&ean8(), &opts), Err(Error::InvalidRotation(45))));
        assert!(write_barcode_to_svg(&ean8(), &opts).is_err());
    }

    #[test]
    fn test_read_back_rotated() {
        let b = ean8();
        for rotate in [0, 90, 180, 270] {
            let opts = WriterOptions::default().with_rotate(rotate);
            let img = write_barcode_to_image(&b, &opts).unwrap();
            let found =
                crate::read_barcode(&img.view().unwrap(), &ReaderOptions::default()).unwrap();
            assert_eq!(found.text(), "96385074", "{rotate}");
            assert_eq!(found.orientation(), rotate);
        }
    }

    #[test]
    fn test_huge_scale_is_rejected() {
        let b = ean8();
        for scale in [i32::MAX, i32::MIN, 1 << 20] {
            let opts = WriterOptions::default().with_scale(scale);
            let image = write_barcode_to_image(&b, &opts);
            assert!(matches!(image, Err(Error::InvalidArgument(_))), "{scale}");
            let svg = write_barcode_to_svg(&b, &opts);
            assert!(matches!(svg, Err(Error::InvalidArgument(_))), "{scale}");
        }
        assert!(raster_size(87, 50, 2).is_ok());
        assert!(raster_size(usize::MAX, 50, 2).is_err());
    }

    fn read_back(barcode: &Barcode, opts: &ReaderOptions) -> Barcode {
        let img = write_barcode_to_image(barcode, &WriterOptions::default()).unwrap();
        crate::read_barcode(&img.view().unwrap(), opts).unwrap()
    }

    #[test]
    fn test_write_read_result() {
        let cases = [
            (BarcodeFormat::CODE39_STD, "CODE 39", ""),
            (BarcodeFormat::EAN13, "590123412345", ""),
            (BarcodeFormat::UPCE, "0123456", ""),
            (BarcodeFormat::CODE128, "0109501101530003\u{1D}10AB", "gs1"),
            (BarcodeFormat::CODABAR, "A40156B", ""),
        ];
        for (format, text, options) in cases {
            let opts = CreatorOptions::new(format).with_options(options);
            let created = create_barcode_from_text(text, &opts).unwrap();
            let found = read_back(&created, &ReaderOptions::default());
            assert!(found.is_valid() && found.symbol().is_none());

            let again = read_back(&found, &ReaderOptions::default());
            assert_eq!(again.format(), format);
            assert_eq!(again.bytes(), created.bytes());
            assert!(write_barcode_to_svg(&found, &WriterOptions::default()).is_ok());
        }

        // filter-only formats are drawn as their base symbology
        let ean13 = CreatorOptions::new(BarcodeFormat::EAN13);
        let isbn = create_barcode_from_text("978020137962", &ean13).unwrap();
        let only_isbn = ReaderOptions::default().with_formats(BarcodeFormat::ISBN.into());
        let found = read_back(&isbn, &only_isbn);
        assert_eq!(found.format(), BarcodeFormat::ISBN);
        assert_eq!(read_back(&found, &only_isbn).text(), "9780201379624");
    }

    #[test]
    fn test_invalid_result_is_not_written() {
        // the last data character is not the mod 43 check character
        let code39 = CreatorOptions::new(BarcodeFormat::CODE39_STD);
        let created = create_barcode_from_text("CODE39X", &code39).unwrap();
        let strict = ReaderOptions::default()
            .with_formats(BarcodeFormat::CODE39_STD.into())
            .with_validate_optional_checksum(true)
            .with_return_errors(true);
        let found = read_back(&created, &strict);
        assert!(!found.is_valid());

        let opts = WriterOptions::default();
        assert!(matches!(write_barcode_to_image(&found, &opts), Err(Error::InvalidBarcode)));
        assert!(matches!(write_barcode_to_svg(&found, &opts), Err(Error::InvalidBarcode)));
    }

    #[test]
    fn test_svg() {
        let b = ean8();
        let svg = write_barcode_to_svg(&b, &WriterOptions::default()).unwrap();
        assert!(svg.contains(r#"viewBox="0 0 87 50""#));
        assert!(svg.contains(r#"width="174" height="100""#));
        assert!(svg.contains(r#"<rect x="10" y="0" width="1" height="50"/>"#));
        assert!(!svg.contains("<text"));

        let svg = write_barcode_to_svg(&b, &WriterOptions::default().with_add_hrt(true)).unwrap();
        assert!(svg.contains(">96385074</text>"));
        assert!(svg.contains(r#"viewBox="0 0 87 60""#));

        let svg = write_barcode_to_svg(&b, &WriterOptions::default().with_rotate(90)).unwrap();
        assert!(svg.contains(r#"viewBox="0 0 50 87""#));
        assert!(svg.contains("rotate(90)"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c'\u{1D}"), "a&lt;b&gt;&amp;&quot;c&apos;");
    }
}

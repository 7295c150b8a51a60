//! Barcode reading and writing behind a C-callable boundary
//!
//! The crate has two faces. The Rust API ([`read_barcodes`],
//! [`create_barcode_from_text`], [`write_barcode_to_image`], ...) works on
//! borrowed [`ImageView`]s and plain option values. The `zxb_*` functions
//! wrap the same operations for C and other host languages, using opaque
//! handles, `malloc`'d strings released with `zxb_free` and a thread-local
//! last error message. See `include/zxbridge.h`.
//!
//! The built-in engine reads and writes the common linear symbologies:
//! EAN/UPC (with add-ons), Code 128, Code 39, ITF and Codabar.
//!
//! ```
//! use zxbridge::{
//!     create_barcode_from_text, read_barcodes, write_barcode_to_image, BarcodeFormat,
//!     ContentType, CreatorOptions, ReaderOptions, WriterOptions,
//! };
//!
//! let created = create_barcode_from_text("96385074", &CreatorOptions::new(BarcodeFormat::EAN8))?;
//! let image = write_barcode_to_image(&created, &WriterOptions::default())?;
//!
//! let found = read_barcodes(&image.view()?, &ReaderOptions::default());
//! assert_eq!(found.len(), 1);
//! let barcode = found.get(0)?;
//! assert_eq!(barcode.format(), BarcodeFormat::EAN8);
//! assert_eq!(barcode.text(), "96385074");
//! assert_eq!(barcode.content_type(), ContentType::Text);
//! # Ok::<(), zxbridge::Error>(())
//! ```

mod barcode;
mod binarize;
mod content;
mod decoders;
pub mod error;
mod format;
mod image;
mod image_view;
mod options;
mod reader;
mod writer;

pub mod barcode_ffi;
pub mod ffi;
pub mod image_ffi;
pub mod options_ffi;

#[cfg(test)]
mod proptests;

pub use barcode::{Barcode, Barcodes, PointI, Position, StructuredAppend};
pub use content::ContentType;
pub use error::{BarcodeError, Error, ErrorType, Result};
pub use format::{BarcodeFormat, BarcodeFormats};
pub use image::Image;
pub use image_view::{rgb_to_lum, ImageFormat, ImageView};
pub use options::{
    Binarizer, CreatorOptions, EanAddOnSymbol, FormatOptions, OptionValue, ReaderOptions, TextMode,
    WriterOptions,
};
pub use reader::{read_barcode, read_barcodes};
pub use writer::{
    create_barcode_from_bytes, create_barcode_from_text, write_barcode_to_image,
    write_barcode_to_svg,
};

//! Non-owning views of caller supplied pixel buffers

use std::{fmt, sync::Arc};

use crate::{Error, Result};

/// Pixel layout, packed as `0xPPRRGGBB`: bytes per pixel followed by the
/// byte index of the red, green and blue channels inside one pixel.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageFormat(u32);

impl ImageFormat {
    pub const NONE: Self = Self(0);
    pub const LUM: Self = Self(0x0100_0000);
    pub const LUM_A: Self = Self(0x0200_0000);
    pub const RGB: Self = Self(0x0300_0102);
    pub const BGR: Self = Self(0x0302_0100);
    pub const RGBA: Self = Self(0x0400_0102);
    pub const RGBX: Self = Self::RGBA;
    pub const ARGB: Self = Self(0x0401_0203);
    pub const XRGB: Self = Self::ARGB;
    pub const BGRA: Self = Self(0x0402_0100);
    pub const BGRX: Self = Self::BGRA;
    pub const ABGR: Self = Self(0x0403_0201);
    pub const XBGR: Self = Self::ABGR;

    const KNOWN: [Self; 8] = [
        Self::LUM,
        Self::LUM_A,
        Self::RGB,
        Self::BGR,
        Self::RGBA,
        Self::ARGB,
        Self::BGRA,
        Self::ABGR,
    ];

    pub const fn value(self) -> u32 {
        self.0
    }

    pub const fn pix_stride(self) -> usize {
        ((self.0 >> 24) & 0xFF) as usize
    }

    pub const fn red_index(self) -> usize {
        ((self.0 >> 16) & 0xFF) as usize
    }

    pub const fn green_index(self) -> usize {
        ((self.0 >> 8) & 0xFF) as usize
    }

    pub const fn blue_index(self) -> usize {
        (self.0 & 0xFF) as usize
    }

    fn is_gray(self) -> bool {
        self.red_index() == self.green_index() && self.green_index() == self.blue_index()
    }
}

impl TryFrom<u32> for ImageFormat {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::KNOWN
            .into_iter()
            .find(|f| f.0 == value)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown image format {value:#010x}")))
    }
}

impl fmt::Debug for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::NONE => "None",
            Self::LUM => "Lum",
            Self::LUM_A => "LumA",
            Self::RGB => "RGB",
            Self::BGR => "BGR",
            Self::RGBA => "RGBA",
            Self::ARGB => "ARGB",
            Self::BGRA => "BGRA",
            Self::ABGR => "ABGR",
            _ => return write!(f, "ImageFormat({:#010x})", self.0),
        };
        f.write_str(name)
    }
}

/// ITU-R BT.601 luma in 10 bit fixed point, rounded.
#[inline]
pub fn rgb_to_lum(r: u8, g: u8, b: u8) -> u8 {
    ((306 * r as u32 + 601 * g as u32 + 117 * b as u32 + 0x200) >> 10) as u8
}

#[derive(Clone)]
enum Pixels<'a> {
    Borrowed(&'a [u8]),
    /// Keeps a short-lived source (e.g. a conversion buffer) alive for as
    /// long as any view refers to it.
    Retained(Arc<dyn AsRef<[u8]> + Send + Sync>),
}

impl Pixels<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Borrowed(data) => data,
            Self::Retained(source) => (**source).as_ref(),
        }
    }
}

/// A window onto a pixel buffer owned by someone else.
///
/// The view never copies or modifies the pixels. Cropping and rotation only
/// change the origin and the (possibly negative) strides. Every constructor
/// validates that all addressable pixels lie inside the buffer, so reading
/// through a view can never go out of bounds.
#[derive(Clone)]
pub struct ImageView<'a> {
    pixels: Pixels<'a>,
    origin: usize,
    width: usize,
    height: usize,
    row_stride: isize,
    pix_stride: isize,
    format: ImageFormat,
}

impl<'a> ImageView<'a> {
    /// Tightly packed view, strides derived from `width` and `format`.
    pub fn new(data: &'a [u8], width: usize, height: usize, format: ImageFormat) -> Result<Self> {
        Self::with_strides(data, width, height, format, 0, 0)
    }

    /// View with explicit strides; a stride of 0 means "derive it".
    ///
    /// Fails unless `data.len() >= height * row_stride`.
    pub fn with_strides(
        data: &'a [u8],
        width: usize,
        height: usize,
        format: ImageFormat,
        row_stride: usize,
        pix_stride: usize,
    ) -> Result<Self> {
        Self::build(Pixels::Borrowed(data), width, height, format, row_stride, pix_stride)
    }

    fn build(
        pixels: Pixels<'a>,
        width: usize,
        height: usize,
        format: ImageFormat,
        row_stride: usize,
        pix_stride: usize,
    ) -> Result<Self> {
        if format == ImageFormat::NONE || format.pix_stride() == 0 {
            return Err(Error::InvalidArgument("image format must not be None".into()));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        let overflow = || {
            Error::InvalidArgument(format!(
                "image of {width}x{height} with strides {row_stride}/{pix_stride} \
                 exceeds the address space"
            ))
        };
        let pix_stride = if pix_stride == 0 { format.pix_stride() } else { pix_stride };
        let row_stride = match row_stride {
            0 => width.checked_mul(pix_stride).ok_or_else(overflow)?,
            n => n,
        };

        let last_pixel = (height - 1)
            .checked_mul(row_stride)
            .and_then(|rows| Some(rows.checked_add((width - 1).checked_mul(pix_stride)?)?))
            .and_then(|offset| offset.checked_add(format.pix_stride()))
            .ok_or_else(overflow)?;
        let required = height.checked_mul(row_stride).ok_or_else(overflow)?.max(last_pixel);
        let actual = pixels.bytes().len();
        if actual < required {
            return Err(Error::OutOfBounds { required, actual });
        }

        Ok(Self {
            pixels,
            origin: 0,
            width,
            height,
            row_stride: row_stride as isize,
            pix_stride: pix_stride as isize,
            format,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn row_stride(&self) -> isize {
        self.row_stride
    }

    pub fn pix_stride(&self) -> isize {
        self.pix_stride
    }

    /// Whether the view keeps its pixel source alive itself.
    pub fn is_retaining(&self) -> bool {
        matches!(self.pixels, Pixels::Retained(_))
    }

    fn offset(&self, x: usize, y: usize) -> usize {
        let offset =
            self.origin as isize + y as isize * self.row_stride + x as isize * self.pix_stride;
        offset as usize
    }

    /// Raw bytes of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates lie outside the view.
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) outside view");
        let start = self.offset(x, y);
        &self.pixels.bytes()[start..start + self.format.pix_stride()]
    }

    pub fn luminance(&self, x: usize, y: usize) -> u8 {
        let p = self.pixel(x, y);
        if self.format.is_gray() {
            return p[self.format.red_index()];
        }
        rgb_to_lum(
            p[self.format.red_index()],
            p[self.format.green_index()],
            p[self.format.blue_index()],
        )
    }

    /// Row-major luminance copy of the whole view.
    pub fn to_luminance(&self) -> Vec<u8> {
        let mut lum = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            lum.extend((0..self.width).map(|x| self.luminance(x, y)));
        }
        lum
    }

    /// Narrow the view to a sub-rectangle.
    ///
    /// Negative `left`/`top` are clamped to 0. A non-positive `width` or
    /// `height` means "up to the edge", larger values are clamped to it.
    pub fn cropped(&self, left: i32, top: i32, width: i32, height: i32) -> Result<Self> {
        let left = left.max(0) as usize;
        let top = top.max(0) as usize;
        if left >= self.width || top >= self.height {
            return Err(Error::InvalidArgument(format!(
                "crop origin ({left}, {top}) outside {}x{} view",
                self.width, self.height
            )));
        }
        let clamp = |requested: i32, available: usize| {
            if requested <= 0 {
                available
            } else {
                (requested as usize).min(available)
            }
        };
        Ok(Self {
            origin: self.offset(left, top),
            width: clamp(width, self.width - left),
            height: clamp(height, self.height - top),
            ..self.clone()
        })
    }

    /// Rotate clockwise by a multiple of 90 degrees; negative angles allowed.
    pub fn rotated(&self, degrees: i32) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(Error::InvalidRotation(degrees));
        }
        let (w, h) = (self.width, self.height);
        let (row, pix) = (self.row_stride, self.pix_stride);
        let rotated = match degrees.rem_euclid(360) {
            90 => Self {
                origin: self.offset(0, h - 1),
                width: h,
                height: w,
                row_stride: pix,
                pix_stride: -row,
                ..self.clone()
            },
            180 => Self {
                origin: self.offset(w - 1, h - 1),
                row_stride: -row,
                pix_stride: -pix,
                ..self.clone()
            },
            270 => Self {
                origin: self.offset(w - 1, 0),
                width: h,
                height: w,
                row_stride: -pix,
                pix_stride: row,
                ..self.clone()
            },
            _ => self.clone(),
        };
        Ok(rotated)
    }
}

impl ImageView<'static> {
    /// View that owns a reference to its pixel source.
    ///
    /// Use this when the buffer would otherwise die before the view, e.g.
    /// for a buffer produced by a format conversion.
    pub fn retaining<S>(
        source: S,
        width: usize,
        height: usize,
        format: ImageFormat,
        row_stride: usize,
        pix_stride: usize,
    ) -> Result<Self>
    where
        S: AsRef<[u8]> + Send + Sync + 'static,
    {
        Self::build(
            Pixels::Retained(Arc::new(source)),
            width,
            height,
            format,
            row_stride,
            pix_stride,
        )
    }
}

impl fmt::Debug for ImageView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageView")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("row_stride", &self.row_stride)
            .field("pix_stride", &self.pix_stride)
            .field("retaining", &self.is_retaining())
            .finish()
    }
}

#[cfg(feature = "image")]
mod image_support {
    use super::*;
    use image::{GrayImage, RgbImage, RgbaImage};

    impl<'a> TryFrom<&'a GrayImage> for ImageView<'a> {
        type Error = Error;

        fn try_from(img: &'a GrayImage) -> Result<Self> {
            let (w, h) = img.dimensions();
            ImageView::new(img.as_raw(), w as usize, h as usize, ImageFormat::LUM)
        }
    }

    impl<'a> TryFrom<&'a RgbImage> for ImageView<'a> {
        type Error = Error;

        fn try_from(img: &'a RgbImage) -> Result<Self> {
            let (w, h) = img.dimensions();
            ImageView::new(img.as_raw(), w as usize, h as usize, ImageFormat::RGB)
        }
    }

    impl<'a> TryFrom<&'a RgbaImage> for ImageView<'a> {
        type Error = Error;

        fn try_from(img: &'a RgbaImage) -> Result<Self> {
            let (w, h) = img.dimensions();
            ImageView::new(img.as_raw(), w as usize, h as usize, ImageFormat::RGBA)
        }
    }

    impl ImageView<'static> {
        /// Convert any decoded image to luminance and keep the result alive.
        pub fn from_dynamic(img: &image::DynamicImage) -> Result<Self> {
            let gray = img.to_luma8();
            let (w, h) = gray.dimensions();
            ImageView::retaining(gray.into_raw(), w as usize, h as usize, ImageFormat::LUM, 0, 0)
        }
    }
}

//! Owned pixel buffers produced by the writer

use std::fmt;

use crate::{ImageFormat, ImageView, Result};

/// A tightly packed 8-bit luminance image.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Image {
    pub(crate) fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Always [`ImageFormat::LUM`].
    pub fn format(&self) -> ImageFormat {
        ImageFormat::LUM
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Borrow the pixels as an [`ImageView`], e.g. to read the image back.
    pub fn view(&self) -> Result<ImageView<'_>> {
        ImageView::new(&self.data, self.width, self.height, ImageFormat::LUM)
    }

    /// Rotate clockwise by a multiple of 90 degrees.
    pub(crate) fn rotated(self, degrees: i32) -> Self {
        let (w, h) = (self.width, self.height);
        match degrees.rem_euclid(360) {
            90 => {
                let mut data = Vec::with_capacity(self.data.len());
                for y in 0..w {
                    data.extend((0..h).map(|x| self.data[(h - 1 - x) * w + y]));
                }
                Self::new(h, w, data)
            }
            180 => {
                let mut data = self.data;
                data.reverse();
                Self::new(w, h, data)
            }
            270 => {
                let mut data = Vec::with_capacity(self.data.len());
                for y in 0..w {
                    data.extend((0..h).map(|x| self.data[x * w + (w - 1 - y)]));
                }
                Self::new(h, w, data)
            }
            _ => self,
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "image")]
mod image_support {
    use image::GrayImage;

    use super::Image;
    use crate::{Error, Result};

    impl Image {
        pub fn to_gray_image(&self) -> Result<GrayImage> {
            let (w, h) = (self.width as u32, self.height as u32);
            GrayImage::from_raw(w, h, self.data.clone()).ok_or(Error::OutOfBounds {
                required: self.width * self.height,
                actual: self.data.len(),
            })
        }
    }

    impl From<&GrayImage> for Image {
        fn from(img: &GrayImage) -> Self {
            let (w, h) = img.dimensions();
            Image::new(w as usize, h as usize, img.as_raw().clone())
        }
    }
}

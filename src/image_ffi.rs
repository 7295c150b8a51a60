//! C boundary for image views and rendered images

use std::ptr::null;

use libc::{c_int, c_uint};

use crate::{
    ffi::{check, handle, handle_mut, into_handle},
    Error, Image, ImageFormat, ImageView, Result,
};

fn non_negative(value: c_int, name: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{name} must not be negative, got {value}")))
}

/// Describe a caller owned pixel buffer of `size` bytes.
///
/// The buffer must outlive the view. Fails (NULL plus last error) when the
/// buffer is too small for the given dimensions and strides. Strides of 0
/// are derived from `width` and `format`.
#[no_mangle]
pub unsafe extern "C" fn zxb_image_view_new(
    data: *const u8,
    size: c_int,
    width: c_int,
    height: c_int,
    format: c_uint,
    row_stride: c_int,
    pix_stride: c_int,
) -> *mut ImageView<'static> {
    let view = (|| {
        let size = non_negative(size, "size")?;
        let data: &'static [u8] = match (data.is_null(), size) {
            (true, 0) => &[],
            (true, _) => return Err(Error::NullPointer("data")),
            (false, n) => std::slice::from_raw_parts(data, n),
        };
        ImageView::with_strides(
            data,
            non_negative(width, "width")?,
            non_negative(height, "height")?,
            ImageFormat::try_from(format)?,
            non_negative(row_stride, "row stride")?,
            non_negative(pix_stride, "pixel stride")?,
        )
    })();
    into_handle(check(view))
}

#[no_mangle]
pub unsafe extern "C" fn zxb_image_view_delete(iv: *mut ImageView<'static>) {
    if !iv.is_null() {
        drop(Box::from_raw(iv));
    }
}

/// Narrow the view to a sub-rectangle, clamped to the current view.
#[no_mangle]
pub unsafe extern "C" fn zxb_image_view_crop(
    iv: *mut ImageView<'static>,
    left: c_int,
    top: c_int,
    width: c_int,
    height: c_int,
) -> bool {
    let cropped = handle_mut(iv, "image view").and_then(|iv| {
        *iv = iv.cropped(left, top, width, height)?;
        Ok(())
    });
    check(cropped).is_some()
}

/// Rotate the view clockwise; false plus last error unless `degrees` is a
/// multiple of 90.
#[no_mangle]
pub unsafe extern "C" fn zxb_image_view_rotate(
    iv: *mut ImageView<'static>,
    degrees: c_int,
) -> bool {
    let rotated = handle_mut(iv, "image view").and_then(|iv| {
        *iv = iv.rotated(degrees)?;
        Ok(())
    });
    check(rotated).is_some()
}

#[no_mangle]
pub unsafe extern "C" fn zxb_image_delete(img: *mut Image) {
    if !img.is_null() {
        drop(Box::from_raw(img));
    }
}

/// Pixels of `img`, `width * height` bytes owned by the image.
#[no_mangle]
pub unsafe extern "C" fn zxb_image_data(img: *const Image) -> *const u8 {
    check(handle(img, "image")).map_or(null(), |img| img.data().as_ptr())
}

#[no_mangle]
pub unsafe extern "C" fn zxb_image_width(img: *const Image) -> c_int {
    check(handle(img, "image")).map_or(0, |img| img.width() as c_int)
}

#[no_mangle]
pub unsafe extern "C" fn zxb_image_height(img: *const Image) -> c_int {
    check(handle(img, "image")).map_or(0, |img| img.height() as c_int)
}

#[no_mangle]
pub unsafe extern "C" fn zxb_image_format(img: *const Image) -> c_uint {
    check(handle(img, "image")).map_or(0, |img| img.format().value())
}

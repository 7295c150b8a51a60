//! C boundary: last error, memory protocol, format tags and the read/write
//! entry points
//!
//! Every string or buffer returned by a `zxb_*` function is allocated with
//! `malloc` and must be released exactly once with [`zxb_free`]. Handles
//! (`*mut ReaderOptions`, `*mut Barcode`, ...) are released with their own
//! `*_delete` function. Failures return NULL (or a sentinel) and leave a
//! message in a thread-local slot read by [`zxb_last_error_msg`].

use std::{
    cell::RefCell,
    ffi::CStr,
    ptr::{self, null_mut},
};

use libc::{c_char, c_int, c_void};
use log::debug;

use crate::{
    create_barcode_from_bytes, create_barcode_from_text, read_barcode, read_barcodes,
    write_barcode_to_image, write_barcode_to_svg, Barcode, BarcodeFormat, BarcodeFormats, Barcodes,
    CreatorOptions, Error, Image, ImageView, ReaderOptions, Result, WriterOptions,
};

// ============================================================================
// Last error
// ============================================================================

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(error: &Error) {
    debug!("boundary call failed: {error}");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(error.to_string()));
}

/// Unwrap `result`, recording the error in the last error slot.
pub(crate) fn check<T>(result: Result<T>) -> Option<T> {
    result.map_err(|e| set_last_error(&e)).ok()
}

/// Message of the last failed call on this thread, or NULL.
///
/// Reading the message clears it. The returned string must be released
/// with [`zxb_free`].
#[no_mangle]
pub unsafe extern "C" fn zxb_last_error_msg() -> *mut c_char {
    match LAST_ERROR.with(|slot| slot.borrow_mut().take()) {
        Some(msg) => copy_str(&msg),
        None => null_mut(),
    }
}

// ============================================================================
// Memory protocol
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn zxb_free(ptr: *mut c_void) {
    libc::free(ptr);
}

/// `malloc`'d, NUL terminated copy of `bytes`.
pub(crate) unsafe fn copy_bytes(bytes: &[u8]) -> *mut u8 {
    let buf = libc::malloc(bytes.len() + 1) as *mut u8;
    if buf.is_null() {
        return buf;
    }
    ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len());
    *buf.add(bytes.len()) = 0;
    buf
}

pub(crate) unsafe fn copy_str(s: &str) -> *mut c_char {
    copy_bytes(s.as_bytes()) as *mut c_char
}

/// `malloc`'d array of `items`, its length written to `count` if not NULL.
pub(crate) unsafe fn copy_array<T: Copy>(items: &[T], count: *mut c_int) -> *mut T {
    if !count.is_null() {
        *count = items.len() as c_int;
    }
    let buf = libc::malloc(std::mem::size_of_val(items).max(1)) as *mut T;
    if !buf.is_null() {
        ptr::copy_nonoverlapping(items.as_ptr(), buf, items.len());
    }
    buf
}

/// Borrow a handle passed in by the caller.
pub(crate) unsafe fn handle<'a, T>(ptr: *const T, name: &'static str) -> Result<&'a T> {
    ptr.as_ref().ok_or(Error::NullPointer(name))
}

pub(crate) unsafe fn handle_mut<'a, T>(ptr: *mut T, name: &'static str) -> Result<&'a mut T> {
    ptr.as_mut().ok_or(Error::NullPointer(name))
}

/// Borrow a NUL terminated UTF-8 string.
pub(crate) unsafe fn str_arg<'a>(s: *const c_char, name: &'static str) -> Result<&'a str> {
    if s.is_null() {
        return Err(Error::NullPointer(name));
    }
    CStr::from_ptr(s)
        .to_str()
        .map_err(|e| Error::InvalidArgument(format!("{name} is not valid UTF-8: {e}")))
}

/// Borrow `size` bytes at `data`; a `size` of 0 means NUL terminated.
unsafe fn data_arg<'a>(data: *const c_void, size: c_int) -> Result<&'a [u8]> {
    if data.is_null() {
        return Err(Error::NullPointer("data"));
    }
    match size {
        0 => Ok(CStr::from_ptr(data as *const c_char).to_bytes()),
        n if n > 0 => Ok(std::slice::from_raw_parts(data as *const u8, n as usize)),
        n => Err(Error::InvalidArgument(format!("size must not be negative, got {n}"))),
    }
}

pub(crate) fn into_handle<T>(value: Option<T>) -> *mut T {
    value.map_or(null_mut(), |v| Box::into_raw(Box::new(v)))
}

#[no_mangle]
pub unsafe extern "C" fn zxb_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ============================================================================
// Format tags
// ============================================================================

/// Parse a format name, `INVALID` (0xFFFF) plus last error if unknown.
#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_format_from_string(name: *const c_char) -> u16 {
    check(str_arg(name, "name").and_then(str::parse::<BarcodeFormat>))
        .unwrap_or(BarcodeFormat::INVALID)
        .value()
}

#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_format_to_string(format: u16) -> *mut c_char {
    copy_str(&BarcodeFormat::from_value(format).to_string())
}

#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_format_symbology(format: u16) -> u16 {
    BarcodeFormat::from_value(format).symbology().value()
}

/// Elementary formats matching `filter`, a `malloc`'d array of `*count` tags.
#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_formats_list(filter: u16, count: *mut c_int) -> *mut u16 {
    let tags: Vec<u16> = BarcodeFormat::list(BarcodeFormat::from_value(filter))
        .into_iter()
        .map(BarcodeFormat::value)
        .collect();
    copy_array(&tags, count)
}

/// Parse a list of format names, NULL plus last error on an unknown name.
#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_formats_from_string(
    names: *const c_char,
    count: *mut c_int,
) -> *mut u16 {
    match check(str_arg(names, "names").and_then(str::parse::<BarcodeFormats>)) {
        Some(formats) => {
            let tags: Vec<u16> = formats.iter().map(BarcodeFormat::value).collect();
            copy_array(&tags, count)
        }
        None => null_mut(),
    }
}

pub(crate) unsafe fn formats_arg(tags: *const u16, count: c_int) -> Result<BarcodeFormats> {
    match count {
        0 => Ok(BarcodeFormats::new()),
        n if n < 0 => Err(Error::InvalidArgument(format!("count must not be negative, got {n}"))),
        _ if tags.is_null() => Err(Error::NullPointer("formats")),
        n => Ok(std::slice::from_raw_parts(tags, n as usize)
            .iter()
            .map(|&t| BarcodeFormat::from_value(t))
            .collect()),
    }
}

#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_formats_to_string(
    tags: *const u16,
    count: c_int,
) -> *mut c_char {
    match check(formats_arg(tags, count)) {
        Some(formats) => copy_str(&formats.to_string()),
        None => null_mut(),
    }
}

// ============================================================================
// Entry points
// ============================================================================

unsafe fn reader_options(opts: *const ReaderOptions) -> ReaderOptions {
    opts.as_ref().cloned().unwrap_or_default()
}

/// Read all barcodes. A NULL `opts` means the defaults.
///
/// Returns an empty collection when nothing was found, NULL only on misuse.
#[no_mangle]
pub unsafe extern "C" fn zxb_read_barcodes(
    iv: *const ImageView<'static>,
    opts: *const ReaderOptions,
) -> *mut Barcodes {
    let opts = reader_options(opts);
    into_handle(check(handle(iv, "image view").map(|iv| read_barcodes(iv, &opts))))
}

/// Read the first barcode, NULL when none was found.
#[no_mangle]
pub unsafe extern "C" fn zxb_read_barcode(
    iv: *const ImageView<'static>,
    opts: *const ReaderOptions,
) -> *mut Barcode {
    let opts = reader_options(opts);
    into_handle(check(handle(iv, "image view")).and_then(|iv| read_barcode(iv, &opts)))
}

/// Encode UTF-8 text; `size` 0 means NUL terminated.
#[no_mangle]
pub unsafe extern "C" fn zxb_create_barcode_from_text(
    data: *const c_char,
    size: c_int,
    opts: *const CreatorOptions,
) -> *mut Barcode {
    let created = data_arg(data as *const c_void, size).and_then(|bytes| {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::InvalidArgument(format!("text is not valid UTF-8: {e}")))?;
        create_barcode_from_text(text, handle(opts, "creator options")?)
    });
    into_handle(check(created))
}

#[no_mangle]
pub unsafe extern "C" fn zxb_create_barcode_from_bytes(
    data: *const c_void,
    size: c_int,
    opts: *const CreatorOptions,
) -> *mut Barcode {
    let created = data_arg(data, size)
        .and_then(|bytes| create_barcode_from_bytes(bytes, handle(opts, "creator options")?));
    into_handle(check(created))
}

unsafe fn writer_options(opts: *const WriterOptions) -> WriterOptions {
    opts.as_ref().copied().unwrap_or_default()
}

/// Render a created or read barcode. A NULL `opts` means the defaults.
#[no_mangle]
pub unsafe extern "C" fn zxb_write_barcode_to_image(
    barcode: *const Barcode,
    opts: *const WriterOptions,
) -> *mut Image {
    let opts = writer_options(opts);
    into_handle(check(handle(barcode, "barcode").and_then(|b| write_barcode_to_image(b, &opts))))
}

#[no_mangle]
pub unsafe extern "C" fn zxb_write_barcode_to_svg(
    barcode: *const Barcode,
    opts: *const WriterOptions,
) -> *mut c_char {
    let opts = writer_options(opts);
    match check(handle(barcode, "barcode").and_then(|b| write_barcode_to_svg(b, &opts))) {
        Some(svg) => copy_str(&svg),
        None => null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    unsafe fn take_string(ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let s = CStr::from_ptr(ptr).to_string_lossy().into_owned();
        zxb_free(ptr as *mut c_void);
        Some(s)
    }

    #[test]
    fn test_last_error_is_taken_once() {
        unsafe {
            assert!(zxb_last_error_msg().is_null());
            let name = CString::new("NoSuchFormat").unwrap();
            assert_eq!(zxb_barcode_format_from_string(name.as_ptr()), 0xFFFF);
            let msg = take_string(zxb_last_error_msg()).unwrap();
            assert!(msg.contains("NoSuchFormat"), "{msg}");
            assert!(zxb_last_error_msg().is_null());
        }
    }

    #[test]
    fn test_last_error_is_thread_local() {
        unsafe {
            assert_eq!(zxb_barcode_format_from_string(ptr::null()), 0xFFFF);
            let other = std::thread::spawn(|| zxb_last_error_msg().is_null()).join().unwrap();
            assert!(other);
            assert!(take_string(zxb_last_error_msg()).is_some());
        }
    }

    #[test]
    fn test_format_strings() {
        unsafe {
            let empty = CString::new("").unwrap();
            assert_eq!(zxb_barcode_format_from_string(empty.as_ptr()), 0);
            assert_eq!(take_string(zxb_barcode_format_to_string(0x3845)).as_deref(), Some("EAN-8"));
            assert_eq!(zxb_barcode_format_symbology(0x3845), BarcodeFormat::EAN_UPC.value());

            let mut count = 0;
            let list = zxb_barcode_formats_list(BarcodeFormat::EAN_UPC.value(), &mut count);
            assert_eq!(count, 8);
            assert_eq!(*list, BarcodeFormat::EAN_UPC.value());
            zxb_free(list as *mut c_void);

            let names = CString::new("EAN-8, Code128").unwrap();
            let tags = zxb_barcode_formats_from_string(names.as_ptr(), &mut count);
            assert_eq!(count, 2);
            let text = take_string(zxb_barcode_formats_to_string(tags, count)).unwrap();
            assert_eq!(text, "Code 128, EAN-8");
            zxb_free(tags as *mut c_void);
        }
    }

    #[test]
    fn test_formats_from_bad_identifiers() {
        unsafe {
            for names in ["]a\u{E9}", "]ZZ", "]E8]Z"] {
                let names = CString::new(names).unwrap();
                let mut count = -1;
                assert!(zxb_barcode_formats_from_string(names.as_ptr(), &mut count).is_null());
                assert_eq!(count, -1);
                assert!(take_string(zxb_last_error_msg()).is_some());
            }
        }
    }

    #[test]
    fn test_null_arguments() {
        unsafe {
            assert!(zxb_read_barcodes(ptr::null(), ptr::null()).is_null());
            assert!(take_string(zxb_last_error_msg()).unwrap().contains("image view"));
            assert!(zxb_write_barcode_to_svg(ptr::null(), ptr::null()).is_null());
            assert!(zxb_create_barcode_from_bytes(ptr::null(), 3, ptr::null()).is_null());
            assert!(take_string(zxb_last_error_msg()).is_some());
        }
    }

    #[test]
    fn test_version() {
        unsafe {
            let version = CStr::from_ptr(zxb_version()).to_str().unwrap();
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }
}

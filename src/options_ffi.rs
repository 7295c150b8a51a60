//! C boundary for reader, writer and creator options
//!
//! Getters on a NULL handle return 0/false, setters on a NULL handle do
//! nothing; both leave a last error.

use std::ptr::null_mut;

use libc::{c_char, c_int};

use crate::{
    ffi::{check, copy_array, copy_str, formats_arg, handle, handle_mut, str_arg},
    BarcodeFormat, Binarizer, CreatorOptions, EanAddOnSymbol, Error, ReaderOptions, Result,
    TextMode, WriterOptions,
};

macro_rules! accessors {
    (
        $opts:ty, $name:ident, $get:ident, $set:ident,
        $getter:ident, $setter:ident, bool $(,)?
    ) => {
        #[no_mangle]
        pub unsafe extern "C" fn $get(opts: *const $opts) -> bool {
            check(handle(opts, $name)).is_some_and(|o| o.$getter())
        }

        #[no_mangle]
        pub unsafe extern "C" fn $set(opts: *mut $opts, value: bool) {
            if let Some(o) = check(handle_mut(opts, $name)) {
                o.$setter(value);
            }
        }
    };
    (
        $opts:ty, $name:ident, $get:ident, $set:ident,
        $getter:ident, $setter:ident, $conv:ident $(,)?
    ) => {
        #[no_mangle]
        pub unsafe extern "C" fn $get(opts: *const $opts) -> c_int {
            check(handle(opts, $name)).map_or(0, |o| o.$getter() as c_int)
        }

        /// Invalid values keep the current setting and leave a last error.
        #[no_mangle]
        pub unsafe extern "C" fn $set(opts: *mut $opts, value: c_int) {
            let set = handle_mut(opts, $name).and_then(|o| {
                o.$setter($conv(value, stringify!($getter))?);
                Ok(())
            });
            check(set);
        }
    };
}

fn enum_arg<T: TryFrom<i32, Error = Error>>(value: c_int, _name: &str) -> Result<T> {
    T::try_from(value)
}

fn count_arg(value: c_int, name: &str) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{name} must be in 0..=255, got {value}")))
}

fn int_arg(value: c_int, _name: &str) -> Result<i32> {
    Ok(value)
}

// ============================================================================
// Reader Options
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn zxb_reader_options_new() -> *mut ReaderOptions {
    Box::into_raw(Box::default())
}

#[no_mangle]
pub unsafe extern "C" fn zxb_reader_options_delete(opts: *mut ReaderOptions) {
    if !opts.is_null() {
        drop(Box::from_raw(opts));
    }
}

const READER: &str = "reader options";

accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_try_harder,
    zxb_reader_options_set_try_harder,
    try_harder,
    set_try_harder,
    bool,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_try_rotate,
    zxb_reader_options_set_try_rotate,
    try_rotate,
    set_try_rotate,
    bool,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_try_invert,
    zxb_reader_options_set_try_invert,
    try_invert,
    set_try_invert,
    bool,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_try_downscale,
    zxb_reader_options_set_try_downscale,
    try_downscale,
    set_try_downscale,
    bool,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_is_pure,
    zxb_reader_options_set_is_pure,
    is_pure,
    set_is_pure,
    bool,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_return_errors,
    zxb_reader_options_set_return_errors,
    return_errors,
    set_return_errors,
    bool,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_validate_optional_checksum,
    zxb_reader_options_set_validate_optional_checksum,
    validate_optional_checksum,
    set_validate_optional_checksum,
    bool,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_binarizer,
    zxb_reader_options_set_binarizer,
    binarizer,
    set_binarizer,
    enum_arg,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_ean_add_on_symbol,
    zxb_reader_options_set_ean_add_on_symbol,
    ean_add_on_symbol,
    set_ean_add_on_symbol,
    enum_arg,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_text_mode,
    zxb_reader_options_set_text_mode,
    text_mode,
    set_text_mode,
    enum_arg,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_min_line_count,
    zxb_reader_options_set_min_line_count,
    min_line_count,
    set_min_line_count,
    count_arg,
);
accessors!(
    ReaderOptions,
    READER,
    zxb_reader_options_get_max_number_of_symbols,
    zxb_reader_options_set_max_number_of_symbols,
    max_number_of_symbols,
    set_max_number_of_symbols,
    count_arg,
);

/// Restrict the search to `count` format tags; 0 means all formats.
#[no_mangle]
pub unsafe extern "C" fn zxb_reader_options_set_formats(
    opts: *mut ReaderOptions,
    formats: *const u16,
    count: c_int,
) {
    let set = handle_mut(opts, READER).and_then(|o| {
        o.set_formats(formats_arg(formats, count)?);
        Ok(())
    });
    check(set);
}

/// Format filter as a `malloc`'d array of `*count` tags.
#[no_mangle]
pub unsafe extern "C" fn zxb_reader_options_get_formats(
    opts: *const ReaderOptions,
    count: *mut c_int,
) -> *mut u16 {
    match check(handle(opts, READER)) {
        Some(o) => {
            let tags: Vec<u16> = o.formats().iter().map(BarcodeFormat::value).collect();
            copy_array(&tags, count)
        }
        None => null_mut(),
    }
}

// ============================================================================
// Writer Options
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn zxb_writer_options_new() -> *mut WriterOptions {
    Box::into_raw(Box::default())
}

#[no_mangle]
pub unsafe extern "C" fn zxb_writer_options_delete(opts: *mut WriterOptions) {
    if !opts.is_null() {
        drop(Box::from_raw(opts));
    }
}

const WRITER: &str = "writer options";

accessors!(
    WriterOptions,
    WRITER,
    zxb_writer_options_get_scale,
    zxb_writer_options_set_scale,
    scale,
    set_scale,
    int_arg,
);
accessors!(
    WriterOptions,
    WRITER,
    zxb_writer_options_get_rotate,
    zxb_writer_options_set_rotate,
    rotate,
    set_rotate,
    int_arg,
);
accessors!(
    WriterOptions,
    WRITER,
    zxb_writer_options_get_add_hrt,
    zxb_writer_options_set_add_hrt,
    add_hrt,
    set_add_hrt,
    bool,
);
accessors!(
    WriterOptions,
    WRITER,
    zxb_writer_options_get_add_quiet_zones,
    zxb_writer_options_set_add_quiet_zones,
    add_quiet_zones,
    set_add_quiet_zones,
    bool,
);

// ============================================================================
// Creator Options
// ============================================================================

const CREATOR: &str = "creator options";

#[no_mangle]
pub unsafe extern "C" fn zxb_creator_options_new(format: u16) -> *mut CreatorOptions {
    Box::into_raw(Box::new(CreatorOptions::new(BarcodeFormat::from_value(format))))
}

#[no_mangle]
pub unsafe extern "C" fn zxb_creator_options_delete(opts: *mut CreatorOptions) {
    if !opts.is_null() {
        drop(Box::from_raw(opts));
    }
}

#[no_mangle]
pub unsafe extern "C" fn zxb_creator_options_get_format(opts: *const CreatorOptions) -> u16 {
    check(handle(opts, CREATOR)).map_or(BarcodeFormat::NONE, |o| o.format()).value()
}

#[no_mangle]
pub unsafe extern "C" fn zxb_creator_options_set_format(opts: *mut CreatorOptions, format: u16) {
    if let Some(o) = check(handle_mut(opts, CREATOR)) {
        o.set_format(BarcodeFormat::from_value(format));
    }
}

/// The option string, `malloc`'d.
#[no_mangle]
pub unsafe extern "C" fn zxb_creator_options_get_options(
    opts: *const CreatorOptions,
) -> *mut c_char {
    match check(handle(opts, CREATOR)) {
        Some(o) => copy_str(o.options()),
        None => null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn zxb_creator_options_set_options(
    opts: *mut CreatorOptions,
    options: *const c_char,
) {
    let set = handle_mut(opts, CREATOR).and_then(|o| {
        o.set_options(str_arg(options, "options")?);
        Ok(())
    });
    check(set);
}

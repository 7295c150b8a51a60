//! C boundary for barcode results and result collections

use std::ptr::{null, null_mut};

use libc::{c_char, c_int};

use crate::{
    error::ErrorType,
    ffi::{check, copy_bytes, copy_str, handle, handle_mut, into_handle, str_arg},
    Barcode, BarcodeFormat, Barcodes, ContentType, Error, Position, Result,
};

const BARCODE: &str = "barcode";
const BARCODES: &str = "barcodes";

fn index_arg(i: c_int) -> Result<usize> {
    usize::try_from(i)
        .map_err(|_| Error::InvalidArgument(format!("index must not be negative, got {i}")))
}

// ============================================================================
// Collections
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn zxb_barcodes_delete(barcodes: *mut Barcodes) {
    if !barcodes.is_null() {
        drop(Box::from_raw(barcodes));
    }
}

#[no_mangle]
pub unsafe extern "C" fn zxb_barcodes_size(barcodes: *const Barcodes) -> c_int {
    check(handle(barcodes, BARCODES)).map_or(0, |b| b.len() as c_int)
}

/// Borrow result `i`; the pointer is valid until the collection is deleted.
#[no_mangle]
pub unsafe extern "C" fn zxb_barcodes_at(barcodes: *const Barcodes, i: c_int) -> *const Barcode {
    let at = handle(barcodes, BARCODES).and_then(|b| b.get(index_arg(i)?));
    check(at).map_or(null(), |b| b as *const Barcode)
}

/// Move result `i` out of the collection. The caller owns the returned
/// handle and releases it with [`zxb_barcode_delete`]; a second move of the
/// same index fails.
#[no_mangle]
pub unsafe extern "C" fn zxb_barcodes_move(barcodes: *mut Barcodes, i: c_int) -> *mut Barcode {
    into_handle(check(handle_mut(barcodes, BARCODES).and_then(|b| b.take(index_arg(i)?))))
}

// ============================================================================
// Single results
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_delete(barcode: *mut Barcode) {
    if !barcode.is_null() {
        drop(Box::from_raw(barcode));
    }
}

/// Independent deep copy, released separately.
#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_duplicate(barcode: *const Barcode) -> *mut Barcode {
    into_handle(check(handle(barcode, BARCODE)).cloned())
}

macro_rules! value_accessor {
    ($fn:ident -> $ty:ty, $default:expr, |$b:ident| $body:expr) => {
        #[no_mangle]
        pub unsafe extern "C" fn $fn(barcode: *const Barcode) -> $ty {
            match check(handle(barcode, BARCODE)) {
                Some($b) => $body,
                None => $default,
            }
        }
    };
}

macro_rules! string_accessor {
    ($(#[$doc:meta])* $fn:ident, |$b:ident| $body:expr) => {
        $(#[$doc])*
        #[no_mangle]
        pub unsafe extern "C" fn $fn(barcode: *const Barcode) -> *mut c_char {
            match check(handle(barcode, BARCODE)) {
                Some($b) => copy_str(&$body),
                None => null_mut(),
            }
        }
    };
}

value_accessor!(zxb_barcode_is_valid -> bool, false, |b| b.is_valid());
value_accessor!(zxb_barcode_error_type -> c_int, ErrorType::None as c_int, |b| {
    b.error_type() as c_int
});
value_accessor!(zxb_barcode_format -> u16, BarcodeFormat::NONE.value(), |b| b.format().value());
value_accessor!(zxb_barcode_symbology -> u16, BarcodeFormat::NONE.value(), |b| {
    b.symbology().value()
});
value_accessor!(zxb_barcode_content_type -> c_int, ContentType::Text as c_int, |b| {
    b.content_type() as c_int
});
value_accessor!(zxb_barcode_position -> Position, Position::default(), |b| b.position());
value_accessor!(zxb_barcode_orientation -> c_int, 0, |b| b.orientation());
value_accessor!(zxb_barcode_has_eci -> bool, false, |b| b.has_eci());
value_accessor!(zxb_barcode_is_inverted -> bool, false, |b| b.is_inverted());
value_accessor!(zxb_barcode_is_mirrored -> bool, false, |b| b.is_mirrored());
value_accessor!(zxb_barcode_line_count -> c_int, 0, |b| b.line_count());
value_accessor!(zxb_barcode_sequence_index -> c_int, -1, |b| b.sequence_index());
value_accessor!(zxb_barcode_sequence_size -> c_int, -1, |b| b.sequence_size());

string_accessor!(
    /// Error message, empty when valid.
    zxb_barcode_error_msg, |b| b.error().message()
);
string_accessor!(zxb_barcode_text, |b| b.text());
string_accessor!(zxb_barcode_ec_level, |b| b.ec_level());
string_accessor!(
    /// ISO/IEC 15424 identifier such as `]E4`.
    zxb_barcode_symbology_identifier, |b| b.symbology_identifier()
);
string_accessor!(zxb_barcode_sequence_id, |b| b.sequence_id());

/// Payload bytes, `malloc`'d; the length goes to `len`. The buffer is also
/// NUL terminated.
#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_bytes(barcode: *const Barcode, len: *mut c_int) -> *mut u8 {
    bytes_out(barcode, len, |b| b.bytes().to_vec())
}

/// Payload bytes in the ECI protocol, `malloc`'d.
#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_bytes_eci(
    barcode: *const Barcode,
    len: *mut c_int,
) -> *mut u8 {
    bytes_out(barcode, len, Barcode::bytes_eci)
}

unsafe fn bytes_out(
    barcode: *const Barcode,
    len: *mut c_int,
    bytes: impl Fn(&Barcode) -> Vec<u8>,
) -> *mut u8 {
    let Some(b) = check(handle(barcode, BARCODE)) else {
        return null_mut();
    };
    let bytes = bytes(b);
    if !len.is_null() {
        *len = bytes.len() as c_int;
    }
    copy_bytes(&bytes)
}

/// Format specific metadata: the JSON object of all entries when `key` is
/// NULL or empty, otherwise the value for `key` (empty if absent).
#[no_mangle]
pub unsafe extern "C" fn zxb_barcode_extra(
    barcode: *const Barcode,
    key: *const c_char,
) -> *mut c_char {
    let extra = handle(barcode, BARCODE).and_then(|b| {
        if key.is_null() {
            return Ok(b.extra());
        }
        Ok(match str_arg(key, "key")? {
            "" => b.extra(),
            key => b.extra_value(key).unwrap_or_default().to_string(),
        })
    });
    match check(extra) {
        Some(s) => copy_str(&s),
        None => null_mut(),
    }
}

// ============================================================================
// Enum helpers
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn zxb_content_type_to_string(content_type: c_int) -> *mut c_char {
    let name = match content_type {
        0 => ContentType::Text,
        1 => ContentType::Binary,
        2 => ContentType::Mixed,
        3 => ContentType::GS1,
        4 => ContentType::ISO15434,
        5 => ContentType::UnknownECI,
        n => {
            let msg = format!("{n} is not a valid ContentType");
            crate::ffi::set_last_error(&Error::InvalidArgument(msg));
            return null_mut();
        }
    };
    copy_str(&name.to_string())
}

#[no_mangle]
pub unsafe extern "C" fn zxb_position_to_string(position: Position) -> *mut c_char {
    copy_str(&position.to_string())
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;
    use crate::{
        create_barcode_from_text,
        ffi::{zxb_free, zxb_last_error_msg},
        CreatorOptions,
    };

    unsafe fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_string_lossy().into_owned();
        zxb_free(ptr.cast());
        s
    }

    fn ean8() -> Barcode {
        create_barcode_from_text("96385074", &CreatorOptions::new(BarcodeFormat::EAN8)).unwrap()
    }

    #[test]
    fn test_accessors() {
        unsafe {
            let b = Box::into_raw(Box::new(ean8()));
            assert!(zxb_barcode_is_valid(b));
            assert_eq!(zxb_barcode_format(b), 0x3845);
            assert_eq!(zxb_barcode_symbology(b), BarcodeFormat::EAN_UPC.value());
            assert_eq!(take(zxb_barcode_text(b)), "96385074");
            assert_eq!(take(zxb_barcode_symbology_identifier(b)), "]E4");
            assert_eq!(take(zxb_barcode_error_msg(b)), "");
            assert_eq!(zxb_barcode_error_type(b), 0);

            let mut len = 0;
            let bytes = zxb_barcode_bytes(b, &mut len);
            assert_eq!(std::slice::from_raw_parts(bytes, len as usize), b"96385074");
            zxb_free(bytes.cast());

            let copy = zxb_barcode_duplicate(b);
            zxb_barcode_delete(b);
            assert_eq!(take(zxb_barcode_text(copy)), "96385074");
            zxb_barcode_delete(copy);
        }
    }

    #[test]
    fn test_collection_move() {
        unsafe {
            let list: Barcodes = vec![ean8()].into_iter().collect();
            let list = Box::into_raw(Box::new(list));
            assert_eq!(zxb_barcodes_size(list), 1);
            assert!(!zxb_barcodes_at(list, 0).is_null());

            let moved = zxb_barcodes_move(list, 0);
            assert!(!moved.is_null());
            assert!(zxb_barcodes_move(list, 0).is_null());
            assert!(take(zxb_last_error_msg()).contains("moved"));
            assert!(zxb_barcodes_at(list, 0).is_null());
            assert!(zxb_barcodes_at(list, -1).is_null());
            assert!(take(zxb_last_error_msg()).contains("negative"));

            zxb_barcodes_delete(list);
            assert_eq!(take(zxb_barcode_text(moved)), "96385074");
            zxb_barcode_delete(moved);
        }
    }

    #[test]
    fn test_helpers() {
        unsafe {
            assert_eq!(take(zxb_content_type_to_string(3)), "GS1");
            assert!(zxb_content_type_to_string(9).is_null());
            let position = ean8().position();
            assert_eq!(take(zxb_position_to_string(position)), position.to_string());
            assert!(zxb_barcode_extra(null(), null()).is_null());
            assert!(take(zxb_last_error_msg()).contains("barcode"));
        }
    }
}

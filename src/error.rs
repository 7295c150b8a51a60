//! Error types and handling
//!
//! Two kinds of failure exist. [`Error`] covers construction failures and
//! caller misuse; at the C boundary it becomes a NULL return plus the
//! thread-local last error. [`BarcodeError`] is carried by a decoded
//! [`Barcode`](crate::Barcode) when a symbol was found but could not be
//! decoded cleanly, and is only surfaced with `return_errors` enabled.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} must not be NULL")]
    NullPointer(&'static str),

    #[error(
        "image view parameters are inconsistent (out of bounds): \
         {required} bytes required, {actual} supplied"
    )]
    OutOfBounds { required: usize, actual: usize },

    #[error("invalid barcode format: '{0}'")]
    InvalidFormat(String),

    #[error("barcode format {0} can not be created")]
    NotCreatable(String),

    #[error("invalid {format} content: {reason}")]
    InvalidContent { format: String, reason: String },

    #[error("invalid creator option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("rotation must be a multiple of 90 degrees, got {0}")]
    InvalidRotation(i32),

    #[error("can not write an invalid barcode")]
    InvalidBarcode,

    #[error("index {index} out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("barcode at index {0} has already been moved out")]
    AlreadyMoved(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classification of a per-result decoding failure.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorType {
    #[default]
    None = 0,
    Format = 1,
    Checksum = 2,
    Unsupported = 3,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "None",
                Self::Format => "FormatError",
                Self::Checksum => "ChecksumError",
                Self::Unsupported => "Unsupported",
            }
        )
    }
}

impl From<i32> for ErrorType {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Format,
            2 => Self::Checksum,
            3 => Self::Unsupported,
            _ => Self::None,
        }
    }
}

/// Error attached to an individual decoded symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BarcodeError {
    kind: ErrorType,
    message: String,
}

impl BarcodeError {
    pub fn new(kind: ErrorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Format, message)
    }

    pub fn checksum(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Checksum, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Unsupported, message)
    }

    pub fn kind(&self) -> ErrorType {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_none(&self) -> bool {
        self.kind == ErrorType::None
    }
}

impl fmt::Display for BarcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_message() {
        let err = Error::OutOfBounds {
            required: 1,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "image view parameters are inconsistent (out of bounds): 1 bytes required, 0 supplied"
        );
    }

    #[test]
    fn test_barcode_error_display() {
        assert_eq!(BarcodeError::default().to_string(), "None");
        assert_eq!(
            BarcodeError::checksum("check digit mismatch").to_string(),
            "ChecksumError: check digit mismatch"
        );
        assert!(BarcodeError::default().is_none());
        assert_eq!(ErrorType::from(2), ErrorType::Checksum);
        assert_eq!(ErrorType::from(42), ErrorType::None);
    }
}

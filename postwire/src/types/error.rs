use std::{borrow::Cow, fmt, str::Utf8Error, string::FromUtf8Error};

use crate::postgres::{Oid, TypeTable};

/// An error when converting value from or to postgres wire value.
///
/// Conversion error is local, the connection stays usable.
pub enum ConversionError {
    /// Value is `NULL` but target type is not nullable.
    Null,
    /// Postgres type is not supported by target type.
    Mismatch {
        target: &'static str,
        found: Oid,
    },
    /// Binary payload length is not valid for the type.
    InvalidLength {
        target: &'static str,
        expected: usize,
        found: usize,
    },
    /// Value does not fit in target type.
    OutOfRange {
        target: &'static str,
    },
    /// Payload is not valid for the type.
    Invalid(Cow<'static, str>),
    /// Text payload is not valid utf8.
    Utf8(Utf8Error),
    /// Column requested not found.
    ColumnNotFound(Cow<'static, str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Failed to serialize or deserialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::Error),
}

impl ConversionError {
    pub(crate) fn mismatch(target: &'static str, found: Oid) -> Self {
        Self::Mismatch { target, found }
    }

    pub(crate) fn length(target: &'static str, expected: usize, found: usize) -> Self {
        Self::InvalidLength { target, expected, found }
    }

    pub(crate) fn range(target: &'static str) -> Self {
        Self::OutOfRange { target }
    }

    pub(crate) fn invalid(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Invalid(reason.into())
    }
}

impl std::error::Error for ConversionError { }

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to convert value, ")?;
        match self {
            Self::Null => write!(f, "unexpected NULL value"),
            Self::Mismatch { target, found } => write!(
                f,
                "cannot convert postgres `{}` to `{target}`",
                TypeTable::builtin().name(*found),
            ),
            Self::InvalidLength { target, expected, found } => {
                write!(f, "expected {expected} bytes for `{target}`, found {found}")
            },
            Self::OutOfRange { target } => write!(f, "value out of range for `{target}`"),
            Self::Invalid(reason) => f.write_str(reason),
            Self::Utf8(e) => write!(f, "{e}"),
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Debug for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for ConversionError {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

from!(<Utf8Error>e => Self::Utf8(e));
from!(<FromUtf8Error>e => Self::Utf8(e.utf8_error()));
#[cfg(feature = "json")]
from!(<serde_json::Error>e => Self::Json(e));

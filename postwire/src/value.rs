//! Postgres wire value.
use bytes::Bytes;
use std::fmt;

use crate::{
    common::ByteStr,
    ext::FmtExt,
    postgres::{Oid, PgFormat, TypeTable},
    types::ConversionError,
};

/// A single postgres value as it is transmitted.
///
/// The type [`Oid`] is always present, even when the value is `NULL`.
#[derive(Clone, PartialEq, Eq)]
pub struct WireValue {
    oid: Oid,
    storage: Storage,
}

/// Storage of a [`WireValue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// `NULL` value.
    Null,
    /// Text format.
    ///
    /// Payload received from the server is checked as utf8 only when the value is decoded, so a
    /// malformed column does not fail the whole row.
    Text(Bytes),
    /// Binary format.
    Binary(Bytes),
}

/// Non null [`Storage`].
pub(crate) enum Payload {
    Text(ByteStr),
    Binary(Bytes),
}

impl WireValue {
    /// Create `NULL` value of given type.
    pub const fn null(oid: Oid) -> Self {
        Self { oid, storage: Storage::Null }
    }

    /// Create text format value.
    pub fn text(oid: Oid, text: impl Into<ByteStr>) -> Self {
        let text: ByteStr = text.into();
        Self { oid, storage: Storage::Text(text.into_bytes()) }
    }

    /// Create binary format value.
    pub fn binary(oid: Oid, bytes: impl Into<Bytes>) -> Self {
        Self { oid, storage: Storage::Binary(bytes.into()) }
    }

    /// Create value from a column of `DataRow`.
    pub fn from_column(oid: Oid, format: PgFormat, value: Option<Bytes>) -> Self {
        let storage = match (value, format) {
            (None, _) => Storage::Null,
            (Some(bytes), PgFormat::Text) => Storage::Text(bytes),
            (Some(bytes), PgFormat::Binary) => Storage::Binary(bytes),
        };
        Self { oid, storage }
    }

    /// Returns the type [`Oid`].
    pub const fn oid(&self) -> Oid {
        self.oid
    }

    /// Returns the value storage.
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Consume self into its storage.
    pub fn into_storage(self) -> Storage {
        self.storage
    }

    /// Returns `true` if value is `NULL`.
    pub const fn is_null(&self) -> bool {
        matches!(self.storage, Storage::Null)
    }

    /// Returns the transmission format.
    ///
    /// `NULL` value does not have a payload, it is reported as binary.
    pub const fn format(&self) -> PgFormat {
        match self.storage {
            Storage::Text(_) => PgFormat::Text,
            Storage::Null | Storage::Binary(_) => PgFormat::Binary,
        }
    }

    /// Returns the payload bytes, [`None`] if value is `NULL`.
    pub fn to_bytes(&self) -> Option<Bytes> {
        match &self.storage {
            Storage::Null => None,
            Storage::Text(bytes) | Storage::Binary(bytes) => Some(bytes.clone()),
        }
    }

    /// Returns the payload as slice, [`None`] if value is `NULL`.
    pub fn as_slice(&self) -> Option<&[u8]> {
        match &self.storage {
            Storage::Null => None,
            Storage::Text(bytes) | Storage::Binary(bytes) => Some(bytes),
        }
    }

    /// Check the type and take the non null payload.
    ///
    /// Text payload is validated as utf8 here.
    pub(crate) fn payload(self, accept: &[Oid], target: &'static str) -> Result<(Oid, Payload), ConversionError> {
        if !accept.contains(&self.oid) {
            return Err(ConversionError::mismatch(target, self.oid));
        }
        match self.storage {
            Storage::Null => Err(ConversionError::Null),
            Storage::Text(text) => Ok((self.oid, Payload::Text(ByteStr::from_utf8(text)?))),
            Storage::Binary(bytes) => Ok((self.oid, Payload::Binary(bytes))),
        }
    }
}

impl fmt::Debug for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = TypeTable::builtin().name(self.oid);
        match &self.storage {
            Storage::Null => write!(f, "NULL::{name}"),
            Storage::Text(text) => match std::str::from_utf8(text) {
                Ok(text) => write!(f, "{text:?}::{name}"),
                Err(_) => write!(f, "{:?}::{name}", text.lossy()),
            },
            Storage::Binary(bytes) => write!(f, "{:?}::{name}", bytes.lossy()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::postgres::oid;

    #[test]
    fn from_column() {
        let text = WireValue::from_column(oid::TEXT, PgFormat::Text, Some(Bytes::from_static(b"foo")));
        assert_eq!(text, WireValue::text(oid::TEXT, "foo"));
        assert_eq!(text.format(), PgFormat::Text);

        let null = WireValue::from_column(oid::INT4, PgFormat::Binary, None);
        assert!(null.is_null());
        assert_eq!(null.oid(), oid::INT4);
        assert_eq!(null.to_bytes(), None);
    }

    #[test]
    fn debug() {
        let value = WireValue::binary(oid::INT4, Bytes::from_static(&[0, 0, 0, 1]));
        assert_eq!(format!("{value:?}"), r#"b"\x00\x00\x00\x01"::int4"#);
        assert_eq!(format!("{:?}", WireValue::null(oid::TEXT)), "NULL::text");
        assert_eq!(format!("{:?}", WireValue::text(oid::TEXT, "a")), r#""a"::text"#);
    }

    #[test]
    fn malformed_text() {
        let bytes = Bytes::from_static(&[0xff, 0xfe]);
        let value = WireValue::from_column(oid::TEXT, PgFormat::Text, Some(bytes));
        assert_eq!(value.as_slice(), Some(&[0xff, 0xfe][..]));
        assert!(matches!(
            value.payload(&[oid::TEXT], "String"),
            Err(ConversionError::Utf8(_))
        ));
    }
}

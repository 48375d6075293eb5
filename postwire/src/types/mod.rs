//! Conversion between rust types and postgres wire values.
//!
//! - [`Encode`], rust value into [`WireValue`]
//! - [`Decode`], [`WireValue`] into rust value
//! - [`PgType`], static type information
//!
//! Builtin support:
//!
//! | rust | postgres |
//! |------|----------|
//! | `bool` | `bool` |
//! | `i8`, `i16`, `i32`, `i64` | `"char"`, `int2`, `int4`, `int8` |
//! | `u8`, `u16`, `u32`, `u64` | narrowest signed integer that holds every value |
//! | `f32`, `f64` | `float4`, `float8` |
//! | `String`, `str` | `text`, `varchar`, `bpchar`, `name` |
//! | [`Bytes`][bytes::Bytes], `[u8]`, `Vec<u8>` | `bytea` |
//! | [`Numeric`] | `numeric` |
//! | [`Point`], [`Polygon`] | `point`, `polygon` |
//! | [`Inet`], [`Cidr`], [`MacAddr`], [`MacAddr8`] | `inet`, `cidr`, `macaddr`, `macaddr8` |
//! | `Vec<T>`, `[T]` | one dimensional array of `T` |
//! | `Option<T>` | nullable `T` |
//! | [`Value`] | any of the above |
//!
//! With features:
//!
//! - [`serde`]'s [`Deserialize`][sd] and [`Serialize`][ss] via [`Json`], requires `json` feature
//! - [`time`][::time]'s `Date`, `Time`, `PrimitiveDateTime`, `OffsetDateTime`, requires `time` feature
//! - [`uuid`][::uuid]'s `Uuid`, requires `uuid` feature
//!
//! [sd]: serde::Deserialize
//! [ss]: serde::Serialize
use crate::{
    postgres::{Oid, PgType},
    value::WireValue,
};

mod error;
mod primitive;
mod numeric;
mod geometric;
mod network;
mod array;
mod dynamic;

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "json")]
mod record;

#[cfg(feature = "time")]
mod time;

#[cfg(feature = "uuid")]
mod uuid;

pub use error::ConversionError;
pub use numeric::Numeric;
pub use geometric::{Point, Polygon};
pub use network::{Cidr, Inet, MacAddr, MacAddr8};
pub use array::ArrayElement;
pub use dynamic::Value;

#[cfg(feature = "json")]
pub use json::Json;
#[cfg(feature = "json")]
pub use record::{RecordDecoder, RecordEncoder};

/// A type that can be converted into [`WireValue`].
pub trait Encode {
    /// Convert self into wire value.
    fn encode(&self) -> Result<WireValue, ConversionError>;
}

/// A type that can be constructed from [`WireValue`].
pub trait Decode: Sized {
    /// Try convert wire value into self.
    fn decode(value: WireValue) -> Result<Self, ConversionError>;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        T::encode(self)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        T::encode(self)
    }
}

impl<T: PgType> PgType for Option<T> {
    const OID: Oid = T::OID;
    const ARRAY_OID: Oid = T::ARRAY_OID;
}

impl<T: Encode + PgType> Encode for Option<T> {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        match self {
            Some(value) => value.encode(),
            None => Ok(WireValue::null(T::OID)),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.is_null() {
            true => Ok(None),
            false => T::decode(value).map(Some),
        }
    }
}

impl Encode for WireValue {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        Ok(self.clone())
    }
}

impl Decode for WireValue {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

/// Take exactly `N` bytes of binary payload.
pub(crate) fn fixed<const N: usize>(bytes: &[u8], target: &'static str) -> Result<[u8; N], ConversionError> {
    bytes.try_into().map_err(|_| ConversionError::length(target, N, bytes.len()))
}

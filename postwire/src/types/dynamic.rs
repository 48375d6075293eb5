use bytes::Bytes;

use super::{
    Cidr, ConversionError, Decode, Encode, Inet, MacAddr, MacAddr8, Numeric, Point, Polygon,
    array::{decode_array, encode_array},
};
use crate::{
    postgres::{TypeTable, oid},
    value::WireValue,
};

/// Dynamically typed postgres value.
///
/// Decoding dispatch on the value [`Oid`][crate::postgres::Oid], type that is not known
/// is kept as [`Value::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// `"char"`
    Char(i8),
    /// `int2`, `int4`, `int8` or `oid`
    Int(i64),
    /// `float4` or `float8`
    Float(f64),
    /// `text`, `varchar`, `bpchar`, `name` or `unknown`
    Text(String),
    Bytes(Bytes),
    Numeric(Numeric),
    Point(Point),
    Polygon(Polygon),
    Inet(Inet),
    Cidr(Cidr),
    MacAddr(MacAddr),
    MacAddr8(MacAddr8),
    #[cfg(feature = "uuid")]
    Uuid(::uuid::Uuid),
    #[cfg(feature = "time")]
    Date(::time::Date),
    #[cfg(feature = "time")]
    Time(::time::Time),
    #[cfg(feature = "time")]
    Timestamp(::time::PrimitiveDateTime),
    #[cfg(feature = "time")]
    TimestampTz(::time::OffsetDateTime),
    /// `json` or `jsonb`
    #[cfg(feature = "json")]
    Json(serde_json::Value),
    /// One dimensional array.
    Array(Vec<Value>),
    /// Type not supported by this crate.
    Unknown(WireValue),
}

impl Decode for Value {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let decoded = match value.oid() {
            oid::BOOL => Value::Bool(Decode::decode(value)?),
            oid::CHAR => Value::Char(Decode::decode(value)?),
            oid::INT2 | oid::INT4 | oid::INT8 | oid::OID => Value::Int(Decode::decode(value)?),
            oid::FLOAT4 | oid::FLOAT8 => Value::Float(Decode::decode(value)?),
            oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::NAME | oid::UNKNOWN => {
                Value::Text(Decode::decode(value)?)
            },
            oid::BYTEA => Value::Bytes(Decode::decode(value)?),
            oid::NUMERIC => Value::Numeric(Decode::decode(value)?),
            oid::POINT => Value::Point(Decode::decode(value)?),
            oid::POLYGON => Value::Polygon(Decode::decode(value)?),
            oid::INET => Value::Inet(Decode::decode(value)?),
            oid::CIDR => Value::Cidr(Decode::decode(value)?),
            oid::MACADDR => Value::MacAddr(Decode::decode(value)?),
            oid::MACADDR8 => Value::MacAddr8(Decode::decode(value)?),
            #[cfg(feature = "uuid")]
            oid::UUID => Value::Uuid(Decode::decode(value)?),
            #[cfg(feature = "time")]
            oid::DATE => Value::Date(Decode::decode(value)?),
            #[cfg(feature = "time")]
            oid::TIME => Value::Time(Decode::decode(value)?),
            #[cfg(feature = "time")]
            oid::TIMESTAMP => Value::Timestamp(Decode::decode(value)?),
            #[cfg(feature = "time")]
            oid::TIMESTAMPTZ => Value::TimestampTz(Decode::decode(value)?),
            #[cfg(feature = "json")]
            oid::JSON | oid::JSONB => Value::Json(Decode::decode(value)?),
            array if TypeTable::builtin().is_array(array) => Value::Array(decode_array(value)?),
            _ => Value::Unknown(value),
        };

        Ok(decoded)
    }
}

impl Encode for Value {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        match self {
            Value::Null => Ok(WireValue::null(oid::UNSPECIFIED)),
            Value::Bool(v) => v.encode(),
            Value::Char(v) => v.encode(),
            Value::Int(v) => v.encode(),
            Value::Float(v) => v.encode(),
            Value::Text(v) => v.encode(),
            Value::Bytes(v) => v.encode(),
            Value::Numeric(v) => v.encode(),
            Value::Point(v) => v.encode(),
            Value::Polygon(v) => v.encode(),
            Value::Inet(v) => v.encode(),
            Value::Cidr(v) => v.encode(),
            Value::MacAddr(v) => v.encode(),
            Value::MacAddr8(v) => v.encode(),
            #[cfg(feature = "uuid")]
            Value::Uuid(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::Date(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::Time(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::Timestamp(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::TimestampTz(v) => v.encode(),
            #[cfg(feature = "json")]
            Value::Json(v) => v.encode(),
            Value::Array(items) => {
                let items = items.iter().map(Value::encode).collect::<Result<Vec<_>, _>>()?;

                let mut oids = items.iter().filter(|e| !e.is_null()).map(WireValue::oid);
                let Some(element_oid) = oids.next() else {
                    return Err(ConversionError::invalid("cannot infer element type of array"));
                };
                if oids.any(|oid| oid != element_oid) {
                    return Err(ConversionError::invalid("array elements have different types"));
                }
                let Some(array_oid) = TypeTable::builtin().array_of(element_oid) else {
                    return Err(ConversionError::mismatch("array element", element_oid));
                };

                encode_array(element_oid, array_oid, &items)
            },
            Value::Unknown(value) => Ok(value.clone()),
        }
    }
}

macro_rules! from {
    ($($ty:ty => $variant:ident,)*) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value.into())
            }
        }
    )*};
}

from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => Text,
    &str => Text,
    Bytes => Bytes,
    Numeric => Numeric,
}

use bytes::Bytes;

use super::{ConversionError, Decode, Encode, fixed};
use crate::{
    common::ByteStr,
    postgres::{Oid, PgType, oid},
    value::{Payload, WireValue},
};

macro_rules! pg_type {
    ($($ty:ty => $oid:ident, $array:ident;)*) => {$(
        impl PgType for $ty {
            const OID: Oid = oid::$oid;
            const ARRAY_OID: Oid = oid::$array;
        }
    )*};
}

pg_type! {
    bool => BOOL, BOOL_ARRAY;
    i8 => CHAR, CHAR_ARRAY;
    i16 => INT2, INT2_ARRAY;
    i32 => INT4, INT4_ARRAY;
    i64 => INT8, INT8_ARRAY;
    u8 => INT2, INT2_ARRAY;
    u16 => INT4, INT4_ARRAY;
    u32 => INT8, INT8_ARRAY;
    u64 => INT8, INT8_ARRAY;
    f32 => FLOAT4, FLOAT4_ARRAY;
    f64 => FLOAT8, FLOAT8_ARRAY;
    str => TEXT, TEXT_ARRAY;
    String => TEXT, TEXT_ARRAY;
    ByteStr => TEXT, TEXT_ARRAY;
    [u8] => BYTEA, BYTEA_ARRAY;
    Vec<u8> => BYTEA, BYTEA_ARRAY;
    Bytes => BYTEA, BYTEA_ARRAY;
}

// ===== Integer =====

const INTEGERS: &[Oid] = &[oid::CHAR, oid::INT2, oid::INT4, oid::INT8, oid::OID];

/// Decode any integer column, the caller range check into target width.
fn decode_int(value: WireValue, target: &'static str) -> Result<i64, ConversionError> {
    let (ty, payload) = value.payload(INTEGERS, target)?;
    match payload {
        Payload::Binary(b) => Ok(match ty {
            oid::CHAR => i8::from_be_bytes(fixed(&b, target)?).into(),
            oid::INT2 => i16::from_be_bytes(fixed(&b, target)?).into(),
            oid::INT4 => i32::from_be_bytes(fixed(&b, target)?).into(),
            oid::OID => u32::from_be_bytes(fixed(&b, target)?).into(),
            _ => i64::from_be_bytes(fixed(&b, target)?),
        }),
        Payload::Text(t) if ty == oid::CHAR => decode_char_text(&t).map(Into::into),
        Payload::Text(t) => t
            .parse()
            .map_err(|_| ConversionError::invalid(format!("invalid integer {:?}", t.as_str()))),
    }
}

/// `"char"` text output is the byte itself, or octal escaped for non printable.
fn decode_char_text(text: &str) -> Result<i8, ConversionError> {
    let byte = match text.as_bytes() {
        [] => 0,
        [b] => *b,
        [b'\\', digits @ ..] if digits.len() == 3 => {
            let digits = std::str::from_utf8(digits)?;
            u8::from_str_radix(digits, 8)
                .map_err(|_| ConversionError::invalid("invalid \"char\" escape"))?
        },
        _ => return Err(ConversionError::invalid("invalid \"char\" value")),
    };
    Ok(byte as i8)
}

macro_rules! integer {
    ($($ty:ty => $pg:ty;)*) => {$(
        impl Encode for $ty {
            fn encode(&self) -> Result<WireValue, ConversionError> {
                let value = <$pg>::try_from(*self)
                    .map_err(|_| ConversionError::range(stringify!($pg)))?;
                Ok(WireValue::binary(
                    <$ty>::OID,
                    Bytes::copy_from_slice(&value.to_be_bytes()),
                ))
            }
        }

        impl Decode for $ty {
            fn decode(value: WireValue) -> Result<Self, ConversionError> {
                let value = decode_int(value, stringify!($ty))?;
                <$ty>::try_from(value).map_err(|_| ConversionError::range(stringify!($ty)))
            }
        }
    )*};
}

integer! {
    i8 => i8;
    i16 => i16;
    i32 => i32;
    i64 => i64;
    u8 => i16;
    u16 => i32;
    u32 => i64;
    u64 => i64;
}

// ===== Float =====

macro_rules! float {
    ($($ty:ty, $accept:expr;)*) => {$(
        impl Encode for $ty {
            fn encode(&self) -> Result<WireValue, ConversionError> {
                Ok(WireValue::binary(<$ty>::OID, Bytes::copy_from_slice(&self.to_be_bytes())))
            }
        }

        impl Decode for $ty {
            fn decode(value: WireValue) -> Result<Self, ConversionError> {
                const TARGET: &str = stringify!($ty);
                let (ty, payload) = value.payload($accept, TARGET)?;
                match payload {
                    Payload::Binary(b) if ty == oid::FLOAT4 => {
                        Ok(f32::from_be_bytes(fixed(&b, TARGET)?).into())
                    },
                    Payload::Binary(b) => Ok(<$ty>::from_be_bytes(fixed(&b, TARGET)?)),
                    Payload::Text(t) => match t.as_str() {
                        "NaN" => Ok(<$ty>::NAN),
                        "Infinity" => Ok(<$ty>::INFINITY),
                        "-Infinity" => Ok(<$ty>::NEG_INFINITY),
                        t => t
                            .parse()
                            .map_err(|_| ConversionError::invalid(format!("invalid float {t:?}"))),
                    },
                }
            }
        }
    )*};
}

// float8 into f32 would lose precision
float! {
    f32, &[oid::FLOAT4];
    f64, &[oid::FLOAT4, oid::FLOAT8];
}

// ===== Bool =====

impl Encode for bool {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        Ok(WireValue::binary(bool::OID, Bytes::from_static(match self {
            true => &[1],
            false => &[0],
        })))
    }
}

impl Decode for bool {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::BOOL], "bool")?.1 {
            Payload::Binary(b) => Ok(fixed::<1>(&b, "bool")?[0] != 0),
            Payload::Text(t) => match t.as_str() {
                "t" | "true" => Ok(true),
                "f" | "false" => Ok(false),
                t => Err(ConversionError::invalid(format!("invalid bool {t:?}"))),
            },
        }
    }
}

// ===== Text =====

const TEXTS: &[Oid] = &[oid::TEXT, oid::VARCHAR, oid::BPCHAR, oid::NAME, oid::UNKNOWN];

impl Encode for str {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        Ok(WireValue::text(str::OID, ByteStr::copy_from_str(self)))
    }
}

impl Encode for String {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        self.as_str().encode()
    }
}

impl Encode for ByteStr {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        Ok(WireValue::text(ByteStr::OID, self.clone()))
    }
}

impl Decode for ByteStr {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(TEXTS, "String")?.1 {
            Payload::Text(t) => Ok(t),
            // binary representation of text is the text itself
            Payload::Binary(b) => Ok(ByteStr::from_utf8(b)?),
        }
    }
}

impl Decode for String {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        ByteStr::decode(value).map(|e| e.as_str().to_owned())
    }
}

// ===== Bytea =====

impl Encode for [u8] {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        Ok(WireValue::binary(<[u8]>::OID, Bytes::copy_from_slice(self)))
    }
}

impl Encode for Vec<u8> {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        self.as_slice().encode()
    }
}

impl Encode for Bytes {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        Ok(WireValue::binary(Bytes::OID, self.clone()))
    }
}

impl Decode for Bytes {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::BYTEA], "Bytes")?.1 {
            Payload::Binary(b) => Ok(b),
            Payload::Text(t) => decode_hex(&t).map(Into::into),
        }
    }
}

impl Decode for Vec<u8> {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        Bytes::decode(value).map(Into::into)
    }
}

/// Decode bytea hex format, `\x` followed by hex pairs.
fn decode_hex(text: &str) -> Result<Vec<u8>, ConversionError> {
    let Some(hex) = text.strip_prefix("\\x") else {
        return Err(ConversionError::invalid("bytea text is not in hex format"));
    };
    if hex.len() % 2 != 0 {
        return Err(ConversionError::invalid("bytea hex has odd length"));
    }
    hex.as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair)?;
            u8::from_str_radix(pair, 16).map_err(|_| ConversionError::invalid("invalid bytea hex digit"))
        })
        .collect()
}

//! One dimensional array.
//!
//! Binary layout:
//!
//! ```text
//! ndim: i32, has_null: i32, element_oid: u32,
//! // for each dimension
//! len: i32, lower_bound: i32,
//! // for each element, -1 length is NULL
//! len: i32, value: [u8; len]
//! ```
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::{iter::Peekable, str::Chars};

use super::{ConversionError, Decode, Encode};
use crate::{
    common::ByteStr,
    postgres::{Oid, PgType, TypeTable},
    value::{Payload, WireValue},
};

/// A type that can be an element of one dimensional array.
///
/// `u8` is not an element, `Vec<u8>` and `[u8]` are `bytea`.
pub trait ArrayElement: PgType { }

macro_rules! element {
    ($($ty:ty),* $(,)?) => {
        $(impl ArrayElement for $ty { })*
    };
}

element! {
    bool, i8, i16, i32, i64, u16, u32, u64, f32, f64,
    str, String, ByteStr, Bytes, Vec<u8>,
    super::Numeric, super::Point, super::Polygon,
    super::Inet, super::Cidr, super::MacAddr, super::MacAddr8, std::net::IpAddr,
}

impl<T: ArrayElement + ?Sized> ArrayElement for &T { }

impl<T: ArrayElement> ArrayElement for Option<T> { }

impl<T: ArrayElement> PgType for [T] {
    const OID: Oid = T::ARRAY_OID;
    // multi dimensional array is not supported
    const ARRAY_OID: Oid = 0;
}

impl<T: ArrayElement> PgType for Vec<T> {
    const OID: Oid = T::ARRAY_OID;
    const ARRAY_OID: Oid = 0;
}

impl<T: ArrayElement + Encode> Encode for [T] {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let items = self.iter().map(T::encode).collect::<Result<Vec<_>, _>>()?;
        encode_array(T::OID, <[T]>::OID, &items)
    }
}

/// Pack encoded elements into one dimensional array.
pub(super) fn encode_array(
    element_oid: Oid,
    array_oid: Oid,
    items: &[WireValue],
) -> Result<WireValue, ConversionError> {
    let mut buf = BytesMut::with_capacity(20 + items.len() * 8);

    if items.is_empty() {
        buf.put_i32(0);
        buf.put_i32(0);
        buf.put_u32(element_oid);
        return Ok(WireValue::binary(array_oid, buf.freeze()));
    }

    buf.put_i32(1);
    buf.put_i32(items.iter().any(WireValue::is_null).into());
    buf.put_u32(element_oid);
    buf.put_i32(wire_len(items.len())?);
    buf.put_i32(1);

    for item in items {
        // text storage only comes from textual types, which binary form is the text itself
        match item.as_slice() {
            Some(value) => {
                buf.put_i32(wire_len(value.len())?);
                buf.put_slice(value);
            },
            None => buf.put_i32(-1),
        }
    }

    Ok(WireValue::binary(array_oid, buf.freeze()))
}

/// Array dimension and element length are `int4` on the wire.
fn wire_len(len: usize) -> Result<i32, ConversionError> {
    i32::try_from(len).map_err(|_| ConversionError::range("array"))
}

impl<T: ArrayElement + Encode> Encode for Vec<T> {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        self.as_slice().encode()
    }
}

impl<T: ArrayElement + Decode> Decode for Vec<T> {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        decode_array(value)
    }
}

/// Unpack one dimensional array of any known array type.
pub(super) fn decode_array<T: Decode>(value: WireValue) -> Result<Vec<T>, ConversionError> {
    let array_oid = value.oid();
    let Some(element_oid) = TypeTable::builtin().element_of(array_oid) else {
        return Err(ConversionError::mismatch("Vec", array_oid));
    };
    match value.payload(&[array_oid], "Vec")?.1 {
        Payload::Binary(b) => decode_binary(b),
        Payload::Text(t) => parse_text(&t)?
            .into_iter()
            .map(|item| match item {
                Some(text) => T::decode(WireValue::text(element_oid, text)),
                None => T::decode(WireValue::null(element_oid)),
            })
            .collect(),
    }
}

fn decode_binary<T: Decode>(mut b: Bytes) -> Result<Vec<T>, ConversionError> {
    let truncated = || ConversionError::invalid("array payload truncated");

    if b.len() < 12 {
        return Err(ConversionError::length("Vec", 12, b.len()));
    }

    let ndim = b.get_i32();
    let _has_null = b.get_i32();
    let element_oid = b.get_u32();

    match ndim {
        0 => return Ok(vec![]),
        1 => {},
        ndim if ndim > 1 => {
            return Err(ConversionError::invalid("multi dimensional array is not supported"));
        },
        _ => return Err(ConversionError::invalid("negative array dimension")),
    }

    if b.len() < 8 {
        return Err(truncated());
    }
    let len = b.get_i32();
    let _lower_bound = b.get_i32();

    let len = usize::try_from(len).map_err(|_| ConversionError::invalid("negative array length"))?;
    let mut items = Vec::with_capacity(len.min(b.len() / 4));

    for _ in 0..len {
        if b.len() < 4 {
            return Err(truncated());
        }
        let item = match b.get_i32() {
            -1 => WireValue::null(element_oid),
            n => {
                let n = usize::try_from(n).map_err(|_| ConversionError::invalid("negative element length"))?;
                if b.len() < n {
                    return Err(truncated());
                }
                WireValue::binary(element_oid, b.split_to(n))
            },
        };
        items.push(T::decode(item)?);
    }

    if !b.is_empty() {
        return Err(ConversionError::invalid("array payload has trailing bytes"));
    }

    Ok(items)
}

/// Parse text array literal, e.g. `{1,NULL,"a \"b\""}`.
fn parse_text(text: &str) -> Result<Vec<Option<String>>, ConversionError> {
    let invalid = || ConversionError::invalid(format!("invalid array literal {text:?}"));

    // optional dimension decoration, `[0:1]={1,2}`
    let literal = match text.starts_with('[') {
        true => text.split_once('=').ok_or_else(invalid)?.1,
        false => text,
    };

    let inner = literal
        .trim()
        .strip_prefix('{')
        .and_then(|e| e.strip_suffix('}'))
        .ok_or_else(invalid)?;

    let mut items = vec![];
    if inner.trim().is_empty() {
        return Ok(items);
    }

    let mut chars = inner.chars().peekable();
    loop {
        skip_whitespace(&mut chars);
        let item = match chars.peek() {
            Some('{') => {
                return Err(ConversionError::invalid("multi dimensional array is not supported"));
            },
            Some('"') => {
                chars.next();
                let mut item = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => item.push(chars.next().ok_or_else(invalid)?),
                        Some('"') => break,
                        Some(ch) => item.push(ch),
                        None => return Err(invalid()),
                    }
                }
                Some(item)
            },
            _ => {
                let mut item = String::new();
                while let Some(&ch) = chars.peek() {
                    match ch {
                        ',' => break,
                        '"' | '{' | '}' => return Err(invalid()),
                        '\\' => {
                            chars.next();
                            item.push(chars.next().ok_or_else(invalid)?);
                            continue;
                        },
                        _ => item.push(ch),
                    }
                    chars.next();
                }
                let item = item.trim_end();
                match item {
                    "" => return Err(invalid()),
                    null if null.eq_ignore_ascii_case("NULL") => None,
                    item => Some(item.to_owned()),
                }
            },
        };
        items.push(item);

        skip_whitespace(&mut chars);
        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(_) => return Err(invalid()),
        }
    }

    Ok(items)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|ch| ch.is_whitespace()).is_some() { }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::postgres::oid;

    #[test]
    fn binary_round_trip() {
        let value = vec![1i32, 2, 3].encode().unwrap();
        assert_eq!(value.oid(), oid::INT4_ARRAY);
        assert_eq!(
            value.as_slice().map(|e| e[..20].to_vec()),
            Some(vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 23, 0, 0, 0, 3, 0, 0, 0, 1]),
        );
        assert_eq!(Vec::<i32>::decode(value).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn oversized_length() {
        assert_eq!(wire_len(16).unwrap(), 16);
        assert_eq!(wire_len(i32::MAX as usize).unwrap(), i32::MAX);
        assert!(matches!(
            wire_len(i32::MAX as usize + 1),
            Err(ConversionError::OutOfRange { target: "array" })
        ));
    }

    #[test]
    fn empty_array() {
        let value = Vec::<String>::new().encode().unwrap();
        assert_eq!(value.oid(), oid::TEXT_ARRAY);
        assert_eq!(value.as_slice(), Some(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 25][..]));
        assert!(Vec::<String>::decode(value).unwrap().is_empty());
    }

    #[test]
    fn nullable_elements() {
        let items = vec![Some("a".to_owned()), None];
        let value = items.encode().unwrap();
        // has_null
        assert_eq!(value.as_slice().map(|e| e[7]), Some(1));
        assert_eq!(Vec::<Option<String>>::decode(value.clone()).unwrap(), items);
        assert!(Vec::<String>::decode(value).is_err());
    }

    #[test]
    fn multi_dimension() {
        let header: &[u8] = &[0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 23];
        let value = WireValue::binary(oid::INT4_ARRAY, Bytes::from_static(header));
        assert!(Vec::<i32>::decode(value).is_err());

        let value = WireValue::text(oid::INT4_ARRAY, "{{1,2},{3,4}}");
        assert!(Vec::<i32>::decode(value).is_err());
    }

    #[test]
    fn text_literal() {
        let value = WireValue::text(oid::TEXT_ARRAY, r#"{a,"b,c",NULL,"d \"e\"","NULL"}"#);
        assert_eq!(
            Vec::<Option<String>>::decode(value).unwrap(),
            vec![
                Some("a".to_owned()),
                Some("b,c".to_owned()),
                None,
                Some("d \"e\"".to_owned()),
                Some("NULL".to_owned()),
            ],
        );

        let value = WireValue::text(oid::INT8_ARRAY, "{}");
        assert!(Vec::<i64>::decode(value).unwrap().is_empty());

        let value = WireValue::text(oid::INT2_ARRAY, "[0:1]={4, 5}");
        assert_eq!(Vec::<i16>::decode(value).unwrap(), vec![4, 5]);

        assert!(Vec::<i32>::decode(WireValue::text(oid::INT4, "{1}")).is_err());
    }
}

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{ArrayElement, ConversionError, Decode, Encode};
use crate::{
    postgres::{Oid, PgType, oid},
    value::{Payload, WireValue},
};

/// `jsonb` binary format version.
const JSONB_VERSION: u8 = 1;

/// Decode and Encode postgres json value.
///
/// Decoding accepts both `json` and `jsonb`, encoding always produce `jsonb`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Consume self into the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> PgType for Json<T> {
    /// jsonb, Binary JSON
    const OID: Oid = oid::JSONB;
    const ARRAY_OID: Oid = oid::JSONB_ARRAY;
}

impl<T> ArrayElement for Json<T> { }

/// Serialize into `jsonb` wire value.
pub(crate) fn to_jsonb<T: Serialize + ?Sized>(value: &T) -> Result<WireValue, ConversionError> {
    let mut buf = BytesMut::with_capacity(64).writer();
    buf.get_mut().put_u8(JSONB_VERSION);
    serde_json::to_writer(&mut buf, value)?;
    Ok(WireValue::binary(oid::JSONB, buf.into_inner().freeze()))
}

/// Take the json text of `json` or `jsonb` wire value.
pub(crate) fn json_text(value: WireValue, target: &'static str) -> Result<Bytes, ConversionError> {
    match value.payload(&[oid::JSON, oid::JSONB], target)? {
        (_, Payload::Text(t)) => Ok(t.into_bytes()),
        (oid::JSONB, Payload::Binary(b)) => match b.first() {
            Some(&JSONB_VERSION) => Ok(b.slice(1..)),
            _ => Err(ConversionError::invalid("unsupported jsonb version")),
        },
        (_, Payload::Binary(b)) => Ok(b),
    }
}

impl<T: Serialize> Encode for Json<T> {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        to_jsonb(&self.0)
    }
}

impl<T: DeserializeOwned> Decode for Json<T> {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        let text = json_text(value, "Json")?;
        Ok(Json(serde_json::from_slice(&text)?))
    }
}

impl PgType for serde_json::Value {
    const OID: Oid = oid::JSONB;
    const ARRAY_OID: Oid = oid::JSONB_ARRAY;
}

impl ArrayElement for serde_json::Value { }

impl Encode for serde_json::Value {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        to_jsonb(self)
    }
}

impl Decode for serde_json::Value {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        Json::decode(value).map(Json::into_inner)
    }
}

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Json<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self(T::deserialize(deserializer)?))
    }
}

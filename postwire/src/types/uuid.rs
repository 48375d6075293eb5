use bytes::Bytes;
use ::uuid::Uuid;

use super::{ArrayElement, ConversionError, Decode, Encode};
use crate::{
    postgres::{Oid, PgType, oid},
    value::{Payload, WireValue},
};

impl PgType for Uuid {
    const OID: Oid = oid::UUID;
    const ARRAY_OID: Oid = oid::UUID_ARRAY;
}

impl ArrayElement for Uuid { }

impl Encode for Uuid {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        Ok(WireValue::binary(Self::OID, Bytes::copy_from_slice(self.as_bytes())))
    }
}

impl Decode for Uuid {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::UUID], "Uuid")?.1 {
            Payload::Binary(b) => {
                Uuid::from_slice(&b).map_err(|_| ConversionError::length("Uuid", 16, b.len()))
            },
            Payload::Text(t) => Uuid::parse_str(&t)
                .map_err(|err| ConversionError::invalid(format!("invalid uuid {:?}: {err}", t.as_str()))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uuid() {
        let text = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let uuid = Uuid::decode(WireValue::text(oid::UUID, text)).unwrap();
        assert_eq!(uuid.to_string(), text);

        let value = uuid.encode().unwrap();
        assert_eq!(value.as_slice().map(<[u8]>::len), Some(16));
        assert_eq!(Uuid::decode(value).unwrap(), uuid);

        let short = WireValue::binary(oid::UUID, Bytes::from_static(&[1, 2, 3]));
        assert!(Uuid::decode(short).is_err());
    }
}

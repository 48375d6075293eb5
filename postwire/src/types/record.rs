//! Structured record as a single `jsonb` value.
//!
//! Used by `#[derive(Encode, Decode)]` for struct with more than one field.
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use super::{
    ConversionError,
    json::{json_text, to_jsonb},
};
use crate::value::WireValue;

/// Accumulate record fields into one `jsonb` [`WireValue`].
///
/// ```
/// use postwire::types::RecordEncoder;
///
/// # fn app() -> Result<(), postwire::types::ConversionError> {
/// let value = RecordEncoder::new()
///     .field("id", &1)?
///     .field("name", "foo")?
///     .finish()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RecordEncoder {
    fields: Map<String, Value>,
}

impl RecordEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn field<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Result<Self, ConversionError> {
        self.fields.insert(name.to_owned(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Finish the record.
    pub fn finish(self) -> Result<WireValue, ConversionError> {
        to_jsonb(&self.fields)
    }
}

/// Read record fields from a `json` or `jsonb` [`WireValue`].
#[derive(Debug)]
pub struct RecordDecoder {
    fields: Map<String, Value>,
}

impl RecordDecoder {
    /// Parse the record, returns error if the value is not a json object.
    pub fn new(value: WireValue) -> Result<Self, ConversionError> {
        let text = json_text(value, "record")?;
        match serde_json::from_slice(&text)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ConversionError::invalid("record is not a json object")),
        }
    }

    /// Take a field, missing field is read as json `null`.
    pub fn field<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, ConversionError> {
        let value = self.fields.remove(name).unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|err| {
            ConversionError::invalid(format!("failed to decode record field {name:?}: {err}"))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::postgres::oid;

    #[test]
    fn record_fields() {
        let value = RecordEncoder::new()
            .field("id", &7)
            .and_then(|e| e.field("tags", &["a", "b"]))
            .and_then(RecordEncoder::finish)
            .unwrap();
        assert_eq!(value.oid(), oid::JSONB);

        let mut record = RecordDecoder::new(value).unwrap();
        assert_eq!(record.field::<i32>("id").unwrap(), 7);
        assert_eq!(record.field::<Vec<String>>("tags").unwrap(), ["a", "b"]);
        assert_eq!(record.field::<Option<i32>>("missing").unwrap(), None);
        assert!(record.field::<i32>("id").is_err());
    }

    #[test]
    fn not_an_object() {
        let value = WireValue::text(oid::JSON, "[1]");
        assert!(RecordDecoder::new(value).is_err());
    }
}

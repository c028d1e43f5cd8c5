//! Payloads that carry their own Avro schema.

use super::{SchemaCodecError, SchemaCodecResult};
use apache_avro::{Schema, types::Value};

/// A payload that knows its Avro schema.
///
/// Encoding such a payload registers its schema directly instead of looking
/// one up or inferring it.
pub trait SelfDescribing {
    /// Returns the writer schema.
    fn schema(&self) -> &Schema;

    /// Returns the payload as an Avro value conforming to [`Self::schema`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCodecError`] when the payload cannot be represented.
    fn to_avro_value(&self) -> SchemaCodecResult<Value>;
}

/// Record built field by field against an explicit schema.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    schema: Schema,
    fields: Vec<(String, Value)>,
}

impl GenericRecord {
    /// Creates an empty record for a record schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCodecError::UnnamedSchema`] when `schema` is not a
    /// record.
    pub fn new(schema: Schema) -> SchemaCodecResult<Self> {
        if !matches!(schema, Schema::Record(_)) {
            return Err(SchemaCodecError::UnnamedSchema);
        }
        Ok(Self {
            schema,
            fields: Vec::new(),
        })
    }

    /// Builds a record from a decoded Avro value.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCodecError::UnnamedSchema`] when `schema` is not a
    /// record, or [`SchemaCodecError::NotARecord`] when `value` is not a
    /// record.
    pub fn from_value(schema: Schema, value: Value) -> SchemaCodecResult<Self> {
        let mut record = Self::new(schema)?;
        match value {
            Value::Record(fields) => {
                record.fields = fields;
                Ok(record)
            }
            other => Err(SchemaCodecError::NotARecord(format!("{other:?}"))),
        }
    }

    /// Sets a field, replacing any previous value.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let field_name = name.into();
        let field_value = value.into();
        if let Some((_, existing)) = self
            .fields
            .iter_mut()
            .find(|(existing_name, _)| *existing_name == field_name)
        {
            *existing = field_value;
            return;
        }
        self.fields.push((field_name, field_value));
    }

    /// Returns this record with one more field set.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(name, value);
        self
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value)
    }
}

impl SelfDescribing for GenericRecord {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn to_avro_value(&self) -> SchemaCodecResult<Value> {
        Ok(Value::Record(self.fields.clone()))
    }
}

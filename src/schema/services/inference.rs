//! Record schema inference from the serde shape of a payload.
//!
//! Used only when dynamic schema generation is enabled and no schema is
//! known for the payload type. `None` fields and empty collections cannot
//! reveal their inner type; they are guessed as strings and the result is
//! marked provisional so it is never cached for the type.

use super::{SchemaCodecError, SchemaCodecResult};
use apache_avro::{Schema, types::Value};
use serde_json::json;

/// Returns the dotted name of `T` without its crate prefix.
///
/// `my_app::demo::Foo` becomes `demo.Foo`; generic arguments are dropped.
pub(super) fn type_full_name<T: ?Sized>() -> String {
    let raw = std::any::type_name::<T>();
    let path = raw.split('<').next().unwrap_or(raw);
    let segments: Vec<&str> = path.split("::").collect();
    let skip = usize::from(segments.len() > 1);
    segments
        .iter()
        .skip(skip)
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

/// A schema inferred from one payload value.
#[derive(Debug)]
pub(super) struct InferredSchema {
    pub(super) schema: Schema,
    /// `false` when some element type was guessed from a `None` or an empty
    /// collection, so another value of the same type may need a different
    /// schema.
    pub(super) complete: bool,
}

/// Builds a record schema named `full_name` matching `value`.
pub(super) fn infer_record_schema(
    full_name: &str,
    value: &Value,
) -> SchemaCodecResult<InferredSchema> {
    let failure = |reason: String| SchemaCodecError::SchemaInference {
        type_name: full_name.to_owned(),
        reason,
    };
    let Value::Record(fields) = value else {
        return Err(failure("payload does not serialize as a struct".to_owned()));
    };
    let (namespace, name) = full_name
        .rsplit_once('.')
        .map_or((None, full_name), |(namespace, name)| (Some(namespace), name));

    let mut guessed = false;
    let definition = record_definition(name, namespace, fields, &mut guessed).map_err(failure)?;
    let schema = Schema::parse(&definition).map_err(SchemaCodecError::avro)?;
    Ok(InferredSchema {
        schema,
        complete: !guessed,
    })
}

fn record_definition(
    name: &str,
    namespace: Option<&str>,
    fields: &[(String, Value)],
    guessed: &mut bool,
) -> Result<serde_json::Value, String> {
    let field_definitions = fields
        .iter()
        .map(|(field_name, field_value)| {
            type_definition(field_name, field_value, guessed)
                .map(|field_type| json!({ "name": field_name, "type": field_type }))
        })
        .collect::<Result<Vec<_>, String>>()?;

    let mut definition = json!({
        "type": "record",
        "name": name,
        "fields": field_definitions,
    });
    if let (Some(ns), Some(object)) = (namespace, definition.as_object_mut()) {
        object.insert("namespace".to_owned(), json!(ns));
    }
    Ok(definition)
}

fn type_definition(
    field: &str,
    value: &Value,
    guessed: &mut bool,
) -> Result<serde_json::Value, String> {
    let definition = match value {
        Value::Null => json!("null"),
        Value::Boolean(_) => json!("boolean"),
        Value::Int(_) => json!("int"),
        Value::Long(_) => json!("long"),
        Value::Float(_) => json!("float"),
        Value::Double(_) => json!("double"),
        Value::Bytes(_) => json!("bytes"),
        Value::String(_) => json!("string"),
        Value::Union(_, inner) => match inner.as_ref() {
            Value::Null => {
                *guessed = true;
                json!(["null", "string"])
            }
            present => json!(["null", type_definition(field, present, guessed)?]),
        },
        Value::Array(items) => json!({
            "type": "array",
            "items": element_definition(field, items.first(), guessed)?,
        }),
        Value::Map(entries) => json!({
            "type": "map",
            "values": element_definition(field, entries.values().next(), guessed)?,
        }),
        Value::Record(fields) => record_definition(&pascal_case(field), None, fields, guessed)?,
        other => return Err(format!("field '{field}' has unsupported value {other:?}")),
    };
    Ok(definition)
}

fn element_definition(
    field: &str,
    sample: Option<&Value>,
    guessed: &mut bool,
) -> Result<serde_json::Value, String> {
    let Some(value) = sample else {
        *guessed = true;
        return Ok(json!("string"));
    };
    type_definition(field, value, guessed)
}

fn pascal_case(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}

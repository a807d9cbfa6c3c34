//! Conversion between provider state and Kubernetes documents.
//!
//! Provider state uses the snake_case attribute names of a [`Schema`] and carries every
//! attribute, `null` when unset. Kubernetes documents use camelCase field names and omit
//! unset fields. Both directions are driven by the schema, fields it does not know are dropped.

use serde_json::{Map, Value};

use crate::schema::{Attribute, AttributeType, Schema};

/// Converts a Kubernetes document into provider state
pub fn encode(schema: &Schema, document: &Value) -> Value {
    encode_object(&schema.attributes, document.as_object())
}

/// Converts provider state into a Kubernetes document
pub fn decode(schema: &Schema, state: &Value) -> Value {
    match state {
        Value::Object(object) => Value::Object(decode_object(&schema.attributes, object)),
        _ => Value::Object(Map::new()),
    }
}

/// Sets a top level attribute of a state object
pub fn set(state: &mut Value, name: &str, value: impl Into<Value>) {
    if let Value::Object(object) = state {
        object.insert(name.to_owned(), value.into());
    }
}

fn encode_object(attributes: &[Attribute], document: Option<&Map<String, Value>>) -> Value {
    let object = attributes
        .iter()
        .map(|attribute| {
            let value = attribute
                .json_name
                .as_deref()
                .and_then(|json_name| document?.get(json_name))
                .map_or(Value::Null, |value| encode_value(attribute, value));
            (attribute.name.to_owned(), value)
        })
        .collect();
    Value::Object(object)
}

fn encode_value(attribute: &Attribute, value: &Value) -> Value {
    match (&attribute.kind, value) {
        (_, Value::Null) => Value::Null,
        (AttributeType::Object(children), Value::Object(object)) => {
            encode_object(children, Some(object))
        }
        (AttributeType::ObjectList(children), Value::Array(items)) => items
            .iter()
            .map(|item| encode_object(children, item.as_object()))
            .collect(),
        (AttributeType::Object(_) | AttributeType::ObjectList(_), _) => Value::Null,
        (_, value) => value.clone(),
    }
}

fn decode_object(attributes: &[Attribute], state: &Map<String, Value>) -> Map<String, Value> {
    attributes
        .iter()
        .filter_map(|attribute| {
            let json_name = attribute.json_name.as_ref()?;
            let value = decode_value(attribute, state.get(attribute.name)?)?;
            Some((json_name.clone(), value))
        })
        .collect()
}

fn decode_value(attribute: &Attribute, value: &Value) -> Option<Value> {
    match (&attribute.kind, value) {
        (_, Value::Null) => None,
        (AttributeType::Object(children), Value::Object(object)) => {
            Some(Value::Object(decode_object(children, object)))
        }
        (AttributeType::ObjectList(children), Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|object| Value::Object(decode_object(children, object)))
                .collect(),
        ),
        (_, value) => Some(value.clone()),
    }
}

//! DynamoDB JSON wire format for attribute values.
//!
//! Browser payloads carry attribute values the way the low-level DynamoDB
//! API does: single-key objects such as `{"S": "x"}`, `{"N": "1"}` or
//! `{"M": {...}}`. Binary values are base64 text.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_smithy_types::Blob;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::WireError;

pub type Item = HashMap<String, AttributeValue>;

pub fn attribute_to_json(value: &AttributeValue) -> Value {
    let (tag, inner) = match value {
        AttributeValue::S(s) => ("S", Value::String(s.clone())),
        AttributeValue::N(n) => ("N", Value::String(n.clone())),
        AttributeValue::B(blob) => ("B", Value::String(STANDARD.encode(blob.as_ref()))),
        AttributeValue::Bool(b) => ("BOOL", Value::Bool(*b)),
        AttributeValue::Null(b) => ("NULL", Value::Bool(*b)),
        AttributeValue::L(items) => ("L", Value::Array(items.iter().map(attribute_to_json).collect())),
        AttributeValue::M(map) => ("M", item_to_json(map)),
        AttributeValue::Ss(values) => ("SS", strings(values)),
        AttributeValue::Ns(values) => ("NS", strings(values)),
        AttributeValue::Bs(values) => (
            "BS",
            Value::Array(
                values
                    .iter()
                    .map(|blob| Value::String(STANDARD.encode(blob.as_ref())))
                    .collect(),
            ),
        ),
        _ => return Value::Null,
    };
    let mut map = Map::new();
    map.insert(tag.to_string(), inner);
    Value::Object(map)
}

fn strings(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

/// Item to a JSON object with names in ascending order.
pub fn item_to_json(item: &Item) -> Value {
    let mut names: Vec<&String> = item.keys().collect();
    names.sort();
    Value::Object(
        names
            .into_iter()
            .map(|name| (name.clone(), attribute_to_json(&item[name])))
            .collect(),
    )
}

pub fn attribute_from_json(value: &Value) -> Result<AttributeValue, WireError> {
    let map = value
        .as_object()
        .filter(|map| map.len() == 1)
        .ok_or_else(|| WireError::Shape(value.to_string()))?;
    let (tag, inner) = map
        .iter()
        .next()
        .ok_or_else(|| WireError::Shape(value.to_string()))?;

    let attribute = match tag.as_str() {
        "S" => AttributeValue::S(expect_str(tag, inner)?.to_string()),
        "N" => AttributeValue::N(number_text(inner)?),
        "B" => AttributeValue::B(decode_blob(tag, inner)?),
        "BOOL" => AttributeValue::Bool(expect_bool(tag, inner)?),
        "NULL" => AttributeValue::Null(expect_bool(tag, inner)?),
        "L" => AttributeValue::L(
            expect_array(tag, inner)?
                .iter()
                .map(attribute_from_json)
                .collect::<Result<_, _>>()?,
        ),
        "M" => AttributeValue::M(item_from_json(inner)?),
        "SS" => AttributeValue::Ss(
            expect_array(tag, inner)?
                .iter()
                .map(|v| expect_str(tag, v).map(str::to_string))
                .collect::<Result<_, _>>()?,
        ),
        "NS" => AttributeValue::Ns(
            expect_array(tag, inner)?
                .iter()
                .map(number_text)
                .collect::<Result<_, _>>()?,
        ),
        "BS" => AttributeValue::Bs(
            expect_array(tag, inner)?
                .iter()
                .map(|v| decode_blob(tag, v))
                .collect::<Result<_, _>>()?,
        ),
        other => return Err(WireError::UnknownType(other.to_string())),
    };
    Ok(attribute)
}

pub fn item_from_json(value: &Value) -> Result<Item, WireError> {
    let map = value
        .as_object()
        .ok_or_else(|| WireError::Shape(value.to_string()))?;
    map.iter()
        .map(|(name, v)| Ok((name.clone(), attribute_from_json(v)?)))
        .collect()
}

fn expect_str<'a>(tag: &str, value: &'a Value) -> Result<&'a str, WireError> {
    value
        .as_str()
        .ok_or_else(|| WireError::Payload(tag.to_string(), "a string"))
}

fn expect_bool(tag: &str, value: &Value) -> Result<bool, WireError> {
    value
        .as_bool()
        .ok_or_else(|| WireError::Payload(tag.to_string(), "a boolean"))
}

fn expect_array<'a>(tag: &str, value: &'a Value) -> Result<&'a Vec<Value>, WireError> {
    value
        .as_array()
        .ok_or_else(|| WireError::Payload(tag.to_string(), "an array"))
}

// Numbers travel as strings, but bare JSON numbers are accepted too.
fn number_text(value: &Value) -> Result<String, WireError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(WireError::Payload("N".to_string(), "a number")),
    }
}

fn decode_blob(tag: &str, value: &Value) -> Result<Blob, WireError> {
    let text = expect_str(tag, value)?;
    STANDARD
        .decode(text)
        .map(Blob::new)
        .map_err(|e| WireError::Base64(e.to_string()))
}

/// Serde adapters so contract structs can hold SDK items directly.
pub mod item {
    use super::*;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(item: &Item, serializer: S) -> Result<S::Ok, S::Error> {
        item_to_json(item).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Item, D::Error> {
        let value = Value::deserialize(deserializer)?;
        item_from_json(&value).map_err(D::Error::custom)
    }
}

pub mod opt_item {
    use super::*;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(item: &Option<Item>, serializer: S) -> Result<S::Ok, S::Error> {
        item.as_ref().map(item_to_json).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Item>, D::Error> {
        match Option::<Value>::deserialize(deserializer)? {
            Some(value) => item_from_json(&value).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

pub mod items {
    use super::*;
    use serde::{Serialize, Serializer};

    pub fn serialize<S: Serializer>(items: &[Item], serializer: S) -> Result<S::Ok, S::Error> {
        items
            .iter()
            .map(item_to_json)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }
}

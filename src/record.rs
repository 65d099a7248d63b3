//! Typed attribute values and insertion-ordered records.
//!
//! Items coming back from DynamoDB are unordered maps of [`AttributeValue`].
//! The grid needs a stable attribute order, so items are converted into a
//! [`Record`], which keeps its attributes in insertion order.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_smithy_types::Blob;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    String(String),
    /// Decimal text exactly as the service returned it.
    Number(String),
    Bool(bool),
    Null,
    List(Vec<Attr>),
    Map(Record),
    Binary(Vec<u8>),
}

/// An ordered set of named attributes without duplicate names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    attrs: Vec<(String, Attr)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute. Replacing an existing name keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: Attr) -> Option<Attr> {
        let name = name.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.attrs.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Attr> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attr)> {
        self.attrs.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Convert an SDK item. SDK maps carry no order, so names are sorted.
    pub fn from_item(item: &HashMap<String, AttributeValue>) -> Self {
        let mut names: Vec<&String> = item.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| (name.clone(), Attr::from_attribute_value(&item[name])))
            .collect()
    }

    pub fn to_item(&self) -> HashMap<String, AttributeValue> {
        self.attrs
            .iter()
            .map(|(name, value)| (name.clone(), value.to_attribute_value()))
            .collect()
    }

    /// Build a record from a JSON object, keeping the object's key order.
    /// Returns `None` for anything that is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        value.as_object().map(|map| {
            map.iter()
                .map(|(name, v)| (name.clone(), Attr::from_json(v)))
                .collect()
        })
    }
}

impl FromIterator<(String, Attr)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Attr)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl Attr {
    pub fn from_attribute_value(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::S(s) => Attr::String(s.clone()),
            AttributeValue::N(n) => Attr::Number(n.clone()),
            AttributeValue::Bool(b) => Attr::Bool(*b),
            AttributeValue::Null(_) => Attr::Null,
            AttributeValue::B(blob) => Attr::Binary(blob.as_ref().to_vec()),
            AttributeValue::L(items) => {
                Attr::List(items.iter().map(Attr::from_attribute_value).collect())
            }
            AttributeValue::M(map) => Attr::Map(Record::from_item(map)),
            // Sets surface as lists of their member type
            AttributeValue::Ss(values) => {
                Attr::List(values.iter().cloned().map(Attr::String).collect())
            }
            AttributeValue::Ns(values) => {
                Attr::List(values.iter().cloned().map(Attr::Number).collect())
            }
            AttributeValue::Bs(values) => Attr::List(
                values
                    .iter()
                    .map(|blob| Attr::Binary(blob.as_ref().to_vec()))
                    .collect(),
            ),
            _ => Attr::Binary(Vec::new()),
        }
    }

    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Attr::String(s) => AttributeValue::S(s.clone()),
            Attr::Number(n) => AttributeValue::N(n.clone()),
            Attr::Bool(b) => AttributeValue::Bool(*b),
            Attr::Null => AttributeValue::Null(true),
            Attr::List(items) => {
                AttributeValue::L(items.iter().map(Attr::to_attribute_value).collect())
            }
            Attr::Map(record) => AttributeValue::M(record.to_item()),
            Attr::Binary(bytes) => AttributeValue::B(Blob::new(bytes.clone())),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => Attr::String(s.clone()),
            Value::Number(n) => Attr::Number(n.to_string()),
            Value::Bool(b) => Attr::Bool(*b),
            Value::Null => Attr::Null,
            Value::Array(items) => Attr::List(items.iter().map(Attr::from_json).collect()),
            Value::Object(_) => Attr::Map(Record::from_json(value).unwrap_or_default()),
        }
    }

    /// Plain text form used in grid cells and key displays.
    pub fn display_text(&self) -> String {
        match self {
            Attr::String(s) => s.clone(),
            Attr::Number(n) => n.clone(),
            Attr::Bool(b) => b.to_string(),
            Attr::Null => "null".to_string(),
            Attr::List(_) => "[...]".to_string(),
            Attr::Map(_) => "{...}".to_string(),
            Attr::Binary(bytes) => STANDARD.encode(bytes),
        }
    }
}

impl Serialize for Attr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::String(s) => serializer.serialize_str(s),
            // Decimal text as stored, up to 38 significant digits.
            Attr::Number(n) => serializer.serialize_str(n),
            Attr::Bool(b) => serializer.serialize_bool(*b),
            Attr::Null => serializer.serialize_unit(),
            Attr::List(items) => items.serialize(serializer),
            Attr::Map(record) => record.serialize(serializer),
            Attr::Binary(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attrs.len()))?;
        for (name, value) in &self.attrs {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = Record::new();
        record.insert("a", Attr::Number("1".into()));
        record.insert("b", Attr::Bool(true));
        let previous = record.insert("a", Attr::Null);

        assert_eq!(previous, Some(Attr::Number("1".into())));
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&Attr::Null));
    }

    #[test]
    fn test_from_item_sorts_names_and_maps_sets_to_lists() {
        let mut item = HashMap::new();
        item.insert("zeta".to_string(), AttributeValue::S("z".into()));
        item.insert(
            "alpha".to_string(),
            AttributeValue::Ns(vec!["1".into(), "2".into()]),
        );
        item.insert(
            "blob".to_string(),
            AttributeValue::B(Blob::new(vec![1u8, 2, 3])),
        );

        let record = Record::from_item(&item);

        assert_eq!(
            record.names().collect::<Vec<_>>(),
            vec!["alpha", "blob", "zeta"]
        );
        assert_eq!(
            record.get("alpha"),
            Some(&Attr::List(vec![
                Attr::Number("1".into()),
                Attr::Number("2".into())
            ]))
        );
        assert_eq!(record.get("blob"), Some(&Attr::Binary(vec![1, 2, 3])));
    }

    #[test]
    fn test_item_conversion_keeps_nested_values() {
        let mut inner = HashMap::new();
        inner.insert("n".to_string(), AttributeValue::N("0".into()));
        let mut item = HashMap::new();
        item.insert("m".to_string(), AttributeValue::M(inner));
        item.insert("nul".to_string(), AttributeValue::Null(true));

        let back = Record::from_item(&item).to_item();

        assert_eq!(back, item);
    }

    #[test]
    fn test_from_json_keeps_object_order() {
        let value = json!({"id": "a", "count": 0, "tags": ["x"], "meta": {"k": null}});
        let record = Record::from_json(&value).unwrap();

        assert_eq!(record.get("count"), Some(&Attr::Number("0".into())));
        assert!(matches!(record.get("tags"), Some(Attr::List(_))));
        assert!(matches!(record.get("meta"), Some(Attr::Map(_))));
        assert!(Record::from_json(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_serialize_numbers_keep_their_text() {
        let record: Record = vec![
            ("n".to_string(), Attr::Number("12.50".into())),
            ("big".to_string(), Attr::Number("12345678901234567890123".into())),
            ("s".to_string(), Attr::String("hi".into())),
        ]
        .into_iter()
        .collect();

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            json!({"n": "12.50", "big": "12345678901234567890123", "s": "hi"})
        );
    }
}

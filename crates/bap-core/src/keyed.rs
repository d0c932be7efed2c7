//! Self-describing "keyed" JSON used for provenance parameters.
//!
//! Every object key carries the kind of its value: `"<field> (<tag>)"`. The
//! tag is the variant name for internally tagged values (whose own `type`
//! key is then dropped) or one of the JSON kinds `number`, `string`, `bool`,
//! `list`, `map`, `null`. Tagged list items are wrapped in a single-key
//! object `{"<name> (<Type>)": {...}}`, `<name>` being the item's `name`
//! field or, failing that, its type.

use serde_json::{Map, Value};

use crate::error::{BapError, Result};

const TYPE_KEY: &str = "type";
const NAME_KEY: &str = "name";
const KINDS: [&str; 6] = ["number", "string", "bool", "list", "map", "null"];

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Variant name of an internally tagged object.
fn tag_of(value: &Value) -> Option<&str> {
    value.as_object()?.get(TYPE_KEY)?.as_str()
}

fn is_kind(tag: &str) -> bool {
    KINDS.contains(&tag)
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.strip_suffix(')')
        .and_then(|k| k.rsplit_once(" ("))
        .ok_or_else(|| BapError::InvalidConfig(format!("keyed entry '{key}' has no (tag) suffix")))
}

/// Encode a plain JSON value into keyed form.
pub fn encode(value: &Value) -> Value {
    encode_value(value, false)
}

fn encode_value(value: &Value, strip_type: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                if strip_type && key == TYPE_KEY {
                    continue;
                }
                let (tag, encoded) = match tag_of(child) {
                    Some(tag) => (tag, encode_value(child, true)),
                    None => (kind(child), encode_value(child, false)),
                };
                out.insert(format!("{key} ({tag})"), encoded);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(encode_item).collect()),
        other => other.clone(),
    }
}

fn encode_item(item: &Value) -> Value {
    let Some(tag) = tag_of(item) else {
        return encode_value(item, false);
    };
    let label = item
        .get(NAME_KEY)
        .and_then(Value::as_str)
        .unwrap_or(tag);
    let mut wrapper = Map::new();
    wrapper.insert(format!("{label} ({tag})"), encode_value(item, true));
    Value::Object(wrapper)
}

/// Decode keyed JSON back into the plain form.
pub fn decode(value: &Value) -> Result<Value> {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let (field, tag) = split_key(key)?;
                let decoded = decode(child)?;
                out.insert(field.to_string(), retag(decoded, tag)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items.iter().map(decode_item).collect::<Result<Vec<_>>>().map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn decode_item(item: &Value) -> Result<Value> {
    if let Some(map) = item.as_object() {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if let Some((_, tag)) = split_key(key).ok().filter(|(_, t)| !is_kind(t)) {
                    if inner.is_object() {
                        return retag(decode(inner)?, tag);
                    }
                }
            }
        }
    }
    decode(item)
}

/// Re-insert the `type` key of a tagged object.
fn retag(value: Value, tag: &str) -> Result<Value> {
    if is_kind(tag) {
        return Ok(value);
    }
    match value {
        Value::Object(mut map) => {
            map.insert(TYPE_KEY.to_string(), Value::String(tag.to_string()));
            Ok(Value::Object(map))
        }
        other => Err(BapError::InvalidConfig(format!(
            "tag '{tag}' applied to a {} value",
            kind(&other)
        ))),
    }
}

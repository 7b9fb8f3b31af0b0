//! Tags travel as a JSON-encoded object string on the wire and as a plain
//! key/value map locally.

use std::collections::BTreeMap;

use serde_json::Value;

pub type Tags = BTreeMap<String, String>;

pub fn encode_tags(tags: &Tags) -> Result<String, serde_json::Error> {
    serde_json::to_string(tags)
}

/// Accepts the shapes the services answer with: an object, an encoded
/// object string, or a `[{"Key": .., "Value": ..}]` list.
pub fn decode_tags(value: &Value) -> Result<Tags, serde_json::Error> {
    match value {
        Value::Null => Ok(Tags::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Tags::new()),
        Value::String(s) => {
            let inner: Value = serde_json::from_str(s)?;
            decode_tags(&inner)
        }
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), tag_value(v)))
            .collect()),
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(|item| {
                let key = item.get("Key").or_else(|| item.get("TagKey"))?.as_str()?;
                let value = item
                    .get("Value")
                    .or_else(|| item.get("TagValue"))
                    .map(tag_value)
                    .unwrap_or_default();
                Some((key.to_string(), value))
            })
            .collect()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported tag representation: {}",
            other
        ))),
    }
}

pub fn tags_to_attribute(tags: &Tags) -> Value {
    Value::Object(
        tags.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

fn tag_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

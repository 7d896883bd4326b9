//! JSON text surface for the structured document model.
//!
//! The same node shape as the XML surface, serialized as nested objects:
//! attributes become properties, children become nested objects keyed by
//! element name, and repeated children sharing a name become arrays.
//!
//! Scalar values that are canonical decimal integers are emitted as JSON
//! numbers; everything else stays a string. Restricting coercion to
//! canonical forms ("10" but not "007" or "0x1F") keeps
//! `parse(render(doc)) == doc` exact despite the typed surface.
//!
//! Children sharing a name must be contiguous for array grouping to
//! preserve order; the table codecs emit their children that way.

use serde_json::{Map, Value};

use crate::document::Node;
use crate::error::TableError;

/// Render a document tree as pretty-printed JSON.
pub fn render(doc: &Node) -> Result<String, TableError> {
    let mut root = Map::new();
    root.insert(doc.name().to_string(), node_to_value(doc));
    serde_json::to_string_pretty(&Value::Object(root))
        .map_err(|e| TableError::TextParseError(e.to_string()))
}

fn node_to_value(node: &Node) -> Value {
    let mut object = Map::new();
    for (key, value) in node.attributes() {
        object.insert(key.to_string(), scalar_to_value(value));
    }

    // Group children by name in first-occurrence order.
    let mut grouped: Vec<(&str, Vec<Value>)> = Vec::new();
    for child in node.children() {
        let value = node_to_value(child);
        match grouped.iter_mut().find(|(name, _)| *name == child.name()) {
            Some((_, values)) => values.push(value),
            None => grouped.push((child.name(), vec![value])),
        }
    }
    for (name, mut values) in grouped {
        let value = if values.len() == 1 {
            values.pop().unwrap()
        } else {
            Value::Array(values)
        };
        object.insert(name.to_string(), value);
    }
    Value::Object(object)
}

fn scalar_to_value(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(number) = text.parse::<i64>() {
        if number.to_string() == text {
            return Value::Number(number.into());
        }
    }
    Value::String(text.to_string())
}

fn value_to_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Parse JSON text into a document tree.
pub fn parse(text: &str) -> Result<Node, TableError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| TableError::TextParseError(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| TableError::TextParseError("document is not an object".to_string()))?;
    if object.len() != 1 {
        return Err(TableError::TextParseError(format!(
            "document must contain exactly one root object, found {}",
            object.len()
        )));
    }
    let (name, body) = object.iter().next().unwrap();
    value_to_node(name, body)
}

fn value_to_node(name: &str, value: &Value) -> Result<Node, TableError> {
    let object = value.as_object().ok_or_else(|| {
        TableError::TextParseError(format!("element '{name}' is not an object"))
    })?;

    let mut node = Node::new(name);
    for (key, value) in object {
        match value {
            Value::Object(_) => node.add_child(value_to_node(key, value)?),
            Value::Array(items) => {
                for item in items {
                    if !item.is_object() {
                        return Err(TableError::TextParseError(format!(
                            "array '{key}' in element '{name}' holds a non-object"
                        )));
                    }
                    node.add_child(value_to_node(key, item)?);
                }
            }
            other => {
                let scalar = value_to_scalar(other).ok_or_else(|| {
                    TableError::TextParseError(format!(
                        "property '{key}' in element '{name}' has unsupported type"
                    ))
                })?;
                node.set_attribute(key, scalar);
            }
        }
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Node {
        let mut root = Node::new("sitool");
        let mut pat = Node::new("PAT");
        pat.set_attribute("transport_stream_id", "10");
        pat.set_attribute("current", "true");
        let mut a = Node::new("service");
        a.set_attribute("service_id", "1");
        a.set_attribute("program_map_PID", "100");
        pat.add_child(a);
        let mut b = Node::new("service");
        b.set_attribute("service_id", "2");
        b.set_attribute("program_map_PID", "200");
        pat.add_child(b);
        root.add_child(pat);
        root
    }

    #[test]
    fn test_render_parse_round_trip() {
        let doc = sample_doc();
        let text = render(&doc).unwrap();
        assert_eq!(parse(&text).unwrap(), doc);
    }

    #[test]
    fn test_canonical_numbers_become_json_numbers() {
        let text = render(&sample_doc()).unwrap();
        assert!(text.contains("\"transport_stream_id\": 10"));
        assert!(text.contains("\"current\": true"));
        assert!(text.contains("\"service_id\": 1"));
    }

    #[test]
    fn test_repeated_children_become_array() {
        let text = render(&sample_doc()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let services = &value["sitool"]["PAT"]["service"];
        assert!(services.is_array());
        assert_eq!(services.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_single_child_stays_object() {
        let mut root = Node::new("root");
        root.add_child(Node::new("only"));
        let text = render(&root).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value["root"]["only"].is_object());
        assert_eq!(parse(&text).unwrap(), root);
    }

    #[test]
    fn test_non_canonical_numbers_stay_strings() {
        let mut root = Node::new("root");
        root.set_attribute("padded", "007");
        root.set_attribute("hex", "0x1F");
        root.set_attribute("negative", "-5");
        let text = render(&root).unwrap();
        assert!(text.contains("\"padded\": \"007\""));
        assert!(text.contains("\"hex\": \"0x1F\""));
        assert!(text.contains("\"negative\": -5"));
        assert_eq!(parse(&text).unwrap(), root);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse("not json").is_err());
        assert!(parse("[1, 2]").is_err());
        assert!(parse("{\"a\": {}, \"b\": {}}").is_err());
        assert!(parse("{\"a\": null}").is_err());
    }

    #[test]
    fn test_attribute_order_preserved() {
        let mut root = Node::new("root");
        root.set_attribute("zulu", "1");
        root.set_attribute("alpha", "2");
        let parsed = parse(&render(&root).unwrap()).unwrap();
        let keys: Vec<_> = parsed.attributes().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["zulu", "alpha"]);
    }
}

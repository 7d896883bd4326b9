//! Representation-neutral structured document model.
//!
//! A [`Node`] is an ordered tree of named elements with string attributes.
//! It is the pivot between the binary table form and both text surfaces:
//! table codecs produce and consume nodes, the XML and JSON serializers
//! render and parse them. Attribute insertion order and child order are
//! preserved; both are semantically meaningful for output stability.

use crate::error::TableError;

/// One element of a structured document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Node {
    /// Create an empty element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set an attribute. Keys are unique per node: setting an existing key
    /// replaces its value in place, preserving the original position.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    /// Set an attribute from any displayable value (integers, booleans).
    pub fn set_attribute_fmt(&mut self, name: impl Into<String>, value: impl ToString) {
        self.set_attribute(name, value.to_string());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    /// Required string attribute, failing with the offending field name.
    pub fn req_attribute(&self, name: &str) -> Result<&str, TableError> {
        self.attribute(name)
            .ok_or_else(|| TableError::schema(&self.name, format!("missing attribute '{name}'")))
    }

    /// Required integer attribute; accepts decimal or 0x-prefixed hex.
    pub fn int_attribute<T>(&self, name: &str) -> Result<T, TableError>
    where
        T: TryFrom<u64>,
    {
        let raw = self.req_attribute(name)?;
        self.parse_int(name, raw)
    }

    /// Optional integer attribute; `None` when absent.
    pub fn opt_int_attribute<T>(&self, name: &str) -> Result<Option<T>, TableError>
    where
        T: TryFrom<u64>,
    {
        match self.attribute(name) {
            Some(raw) => self.parse_int(name, raw).map(Some),
            None => Ok(None),
        }
    }

    /// Boolean attribute with a default when absent.
    pub fn bool_attribute(&self, name: &str, default: bool) -> Result<bool, TableError> {
        match self.attribute(name) {
            None => Ok(default),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => Err(TableError::schema(
                &self.name,
                format!("attribute '{name}' has unparsable boolean value '{other}'"),
            )),
        }
    }

    fn parse_int<T>(&self, name: &str, raw: &str) -> Result<T, TableError>
    where
        T: TryFrom<u64>,
    {
        let parsed = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16)
        } else {
            raw.parse::<u64>()
        };
        parsed
            .ok()
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| {
                TableError::schema(
                    &self.name,
                    format!("attribute '{name}' has unparsable value '{raw}'"),
                )
            })
    }
}

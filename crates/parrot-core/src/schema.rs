//! Typed view over caller-supplied JSON-Schema fragments.
//!
//! Tool parameter schemas and `response_format` schemas arrive as arbitrary
//! JSON. [`SchemaNode`] is the tagged-union interpretation the fabricator
//! walks; anything it cannot make sense of collapses to [`SchemaNode::Unknown`]
//! instead of failing the request.

use std::collections::BTreeMap;

/// A recognized node of a parameter or output schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// `"type": "string"`, with any declared `enum` values.
    String { enum_values: Vec<String> },
    /// `"type": "number"` (or the loose `"float"` some clients send).
    Number,
    /// `"type": "integer"`.
    Integer,
    /// `"type": "boolean"`.
    Boolean,
    /// `"type": "array"`, with its `items` schema (or `Unknown`).
    Array(Box<SchemaNode>),
    /// `"type": "object"` with named properties.
    Object(ObjectSchema),
    /// Anything unrecognized or malformed.
    Unknown,
}

/// Properties and required-field list of an object schema.
///
/// `BTreeMap` keeps property iteration (and therefore generated output)
/// stable for a given schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    pub properties: BTreeMap<String, SchemaNode>,
    pub required: Vec<String>,
}

impl ObjectSchema {
    /// Whether the named property is in the `required` list.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

impl SchemaNode {
    /// Interpret a raw JSON value as a schema node.
    ///
    /// Never fails: missing or unrecognized `type` tags yield `Unknown`
    /// (objects without a `type` but with `properties` are still treated as
    /// objects, which is how clients commonly declare tool parameters).
    pub fn from_value(value: &serde_json::Value) -> Self {
        let Some(obj) = value.as_object() else {
            return SchemaNode::Unknown;
        };

        match obj.get("type").and_then(|t| t.as_str()) {
            Some("string") => {
                let enum_values = obj
                    .get("enum")
                    .and_then(|e| e.as_array())
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                SchemaNode::String { enum_values }
            }
            Some("number") | Some("float") => SchemaNode::Number,
            Some("integer") => SchemaNode::Integer,
            Some("boolean") => SchemaNode::Boolean,
            Some("array") => {
                let items = obj
                    .get("items")
                    .map(SchemaNode::from_value)
                    .unwrap_or(SchemaNode::Unknown);
                SchemaNode::Array(Box::new(items))
            }
            Some("object") => SchemaNode::Object(Self::object_from(obj)),
            None if obj.contains_key("properties") => SchemaNode::Object(Self::object_from(obj)),
            _ => SchemaNode::Unknown,
        }
    }

    fn object_from(obj: &serde_json::Map<String, serde_json::Value>) -> ObjectSchema {
        let properties = obj
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| {
                props
                    .iter()
                    .map(|(name, def)| (name.clone(), SchemaNode::from_value(def)))
                    .collect()
            })
            .unwrap_or_default();
        let required = obj
            .get("required")
            .and_then(|r| r.as_array())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        ObjectSchema { properties, required }
    }
}

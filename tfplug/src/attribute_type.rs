use crate::types::Dynamic;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Terraform's type system, as used in schemas
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    pub fn list(elem: AttributeType) -> Self {
        AttributeType::List(Box::new(elem))
    }

    pub fn set(elem: AttributeType) -> Self {
        AttributeType::Set(Box::new(elem))
    }

    pub fn map(elem: AttributeType) -> Self {
        AttributeType::Map(Box::new(elem))
    }

    /// cty type constraint in its JSON form, e.g. `["list","string"]`.
    pub fn to_type_json(&self) -> Value {
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_type_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_type_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_type_json()]),
            AttributeType::Object(attrs) => {
                let fields: serde_json::Map<String, Value> = attrs
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_type_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    /// Encoded form carried in `Schema.Attribute.type`.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_type_json().to_string().into_bytes()
    }

    /// Whether `value` conforms to this type. Null and unknown conform to
    /// every type.
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (value, self) {
            (Dynamic::Null | Dynamic::Unknown, _) => true,
            (Dynamic::String(_), AttributeType::String) => true,
            (Dynamic::Number(_), AttributeType::Number) => true,
            (Dynamic::Bool(_), AttributeType::Bool) => true,
            (Dynamic::List(items), AttributeType::List(elem) | AttributeType::Set(elem)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(entries), AttributeType::Map(elem)) => {
                entries.values().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(entries), AttributeType::Object(attrs)) => {
                attrs.iter().all(|(name, ty)| {
                    entries.get(name).map_or(true, |item| ty.accepts(item))
                })
            }
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Number => "number",
            AttributeType::Bool => "bool",
            AttributeType::List(_) => "list",
            AttributeType::Set(_) => "set",
            AttributeType::Map(_) => "map",
            AttributeType::Object(_) => "object",
        }
    }
}

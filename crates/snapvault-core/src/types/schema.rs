//! Attribute schema (object class definition) types
//!
//! Schemas are supplied from outside this subsystem and are only read: for
//! default-filling and for display metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scalar {
    Boolean,
    Byte,
    Char,
    Double,
    Float,
    Integer,
    Long,
    Short,
    Password,
    String,
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Char => "Char",
            Self::Double => "Double",
            Self::Float => "Float",
            Self::Integer => "Integer",
            Self::Long => "Long",
            Self::Short => "Short",
            Self::Password => "Password",
            Self::String => "String",
        };
        write!(f, "{}", name)
    }
}

/// One configurable attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttributeDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub scalar: Scalar,

    /// 0 or ±1 for single values, otherwise the maximum number of values
    #[serde(default)]
    pub cardinality: i32,

    #[serde(default)]
    pub required: bool,

    /// Default value as a string; multi-valued defaults are comma separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    /// Allowed values, keyed by display label
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl AttributeDefinition {
    pub fn new(id: impl Into<String>, scalar: Scalar) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            scalar,
            cardinality: 0,
            required: false,
            default: None,
            min: None,
            max: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_cardinality(mut self, cardinality: i32) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Whether the attribute holds more than one value
    pub fn is_multi_valued(&self) -> bool {
        self.cardinality.unsigned_abs() > 1
    }
}

/// Metadata describing a component's configurable attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttributeSchema {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

impl AttributeSchema {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            icon: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Look up an attribute by id
    pub fn attribute(&self, id: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_valued_uses_cardinality_magnitude() {
        let attr = AttributeDefinition::new("a", Scalar::String);
        assert!(!attr.is_multi_valued());
        assert!(!attr.clone().with_cardinality(-1).is_multi_valued());
        assert!(attr.clone().with_cardinality(3).is_multi_valued());
        assert!(attr.with_cardinality(-5).is_multi_valued());
    }

    #[test]
    fn test_schema_from_yaml() {
        let yaml = r#"
id: org.example.Broker
name: Broker
attributes:
  - id: port
    type: integer
    default: "1883"
    required: true
  - id: hosts
    type: string
    cardinality: 5
    default: "a,b"
"#;
        let schema: AttributeSchema = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(schema.attributes.len(), 2);
        let port = schema.attribute("port").unwrap();
        assert_eq!(port.scalar, Scalar::Integer);
        assert_eq!(port.default.as_deref(), Some("1883"));
        assert!(schema.attribute("hosts").unwrap().is_multi_valued());
        assert!(schema.attribute("missing").is_none());
    }
}

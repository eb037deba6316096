//! Component configuration model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::schema::AttributeSchema;

/// Property written into every live configuration, naming the owning pid
pub const SERVICE_PID_KEY: &str = "service-pid";

/// Ordered property set of one component
pub type Properties = BTreeMap<String, PropertyValue>;

/// Secret property value
///
/// Holds ciphertext at rest and plaintext while in active use. The value is
/// zeroed when dropped and never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret {
    inner: String,
}

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Expose the wrapped value (use with caution)
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED {} bytes])", self.len())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Typed property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum PropertyValue {
    String(String),
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Password(Secret),
    /// Multi-valued attribute
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Create a secret value
    pub fn password(value: impl Into<String>) -> Self {
        Self::Password(Secret::new(value))
    }

    /// Name of the value's type, as used in attribute schemas
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Boolean(_) => "Boolean",
            Self::Byte(_) => "Byte",
            Self::Short(_) => "Short",
            Self::Integer(_) => "Integer",
            Self::Long(_) => "Long",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::Char(_) => "Char",
            Self::Password(_) => "Password",
            Self::Array(_) => "Array",
        }
    }

    /// Borrow the string payload of a `String` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the secret payload of a `Password` value
    pub fn as_secret(&self) -> Option<&Secret> {
        match self {
            Self::Password(secret) => Some(secret),
            _ => None,
        }
    }

    /// Whether this value is, or contains, a secret
    pub fn is_secret(&self) -> bool {
        match self {
            Self::Password(_) => true,
            Self::Array(items) => items.iter().any(PropertyValue::is_secret),
            _ => false,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Short(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Char(v) => write!(f, "{}", v),
            Self::Password(v) => write!(f, "{}", v),
            Self::Array(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

/// Configuration of one managed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComponentConfiguration {
    /// Globally unique component identifier
    pub pid: String,

    /// Template this component was instantiated from; absent for singletons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_pid: Option<String>,

    /// Attribute metadata, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<AttributeSchema>,

    #[serde(default)]
    pub properties: Properties,
}

impl ComponentConfiguration {
    /// Create an empty configuration for a pid
    pub fn new(pid: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            factory_pid: None,
            definition: None,
            properties: Properties::new(),
        }
    }

    pub fn with_factory_pid(mut self, factory_pid: impl Into<String>) -> Self {
        self.factory_pid = Some(factory_pid.into());
        self
    }

    pub fn with_definition(mut self, definition: AttributeSchema) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether this configuration was created from a factory template
    pub fn is_factory_instance(&self) -> bool {
        self.factory_pid.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret([REDACTED 7 bytes])");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_property_value_display_redacts_passwords() {
        let value = PropertyValue::Array(vec![
            PropertyValue::from("a"),
            PropertyValue::password("pw"),
        ]);
        assert_eq!(value.to_string(), "[a, [REDACTED]]");
        assert!(value.is_secret());
    }

    #[test]
    fn test_property_value_serde_is_tagged() {
        let json = serde_json::to_string(&PropertyValue::Integer(7)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":7}"#);

        let json = serde_json::to_string(&PropertyValue::password("x")).unwrap();
        assert_eq!(json, r#"{"type":"password","value":"x"}"#);
    }

    #[test]
    fn test_configuration_builder() {
        let config = ComponentConfiguration::new("pid.a")
            .with_factory_pid("factory.a")
            .with_property("key", "value")
            .with_property("count", 3);

        assert!(config.is_factory_instance());
        assert_eq!(config.properties.len(), 2);
        assert_eq!(config.properties["count"], PropertyValue::Integer(3));
    }

    #[test]
    fn test_configuration_deserializes_without_optional_fields() {
        let config: ComponentConfiguration = serde_json::from_str(r#"{"pid":"p"}"#).unwrap();
        assert_eq!(config, ComponentConfiguration::new("p"));
    }
}

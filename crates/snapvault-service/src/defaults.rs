//! Default merge engine
//!
//! Turns the string defaults of an [`AttributeSchema`] into typed property
//! values and fills them into a property set without overwriting anything.

use snapvault_core::{AttributeDefinition, AttributeSchema, Properties, PropertyValue, Scalar};
use tracing::warn;

/// Typed defaults declared by a schema, keyed by attribute id
///
/// Attributes without a default, or whose default does not parse as the
/// declared type, are left out.
pub fn default_properties(schema: &AttributeSchema) -> Properties {
    schema
        .attributes
        .iter()
        .filter_map(|attribute| {
            default_value(attribute).map(|value| (attribute.id.clone(), value))
        })
        .collect()
}

/// Insert schema defaults for every key missing from `properties`
///
/// Explicit values are never overwritten. Returns whether anything was added.
pub fn merge_with_defaults(schema: &AttributeSchema, properties: &mut Properties) -> bool {
    let mut changed = false;
    for (key, value) in default_properties(schema) {
        if !properties.contains_key(&key) {
            properties.insert(key, value);
            changed = true;
        }
    }
    changed
}

/// Parse the default of a single attribute
pub fn default_value(attribute: &AttributeDefinition) -> Option<PropertyValue> {
    let raw = attribute.default.as_deref()?;
    if raw.is_empty() {
        return None;
    }

    let parsed = if attribute.is_multi_valued() {
        split_values(raw)
            .iter()
            .map(|item| parse_scalar(attribute.scalar, item))
            .collect::<Option<Vec<_>>>()
            .map(PropertyValue::Array)
    } else {
        parse_scalar(attribute.scalar, raw)
    };

    if parsed.is_none() {
        warn!(
            "Ignoring default of attribute {}: {:?} is not a valid {}",
            attribute.id, raw, attribute.scalar
        );
    }
    parsed
}

/// Split a multi-valued default on unescaped commas
///
/// `\,` yields a literal comma. Items are trimmed.
fn split_values(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&',') => {
                current.push(',');
                chars.next();
            }
            ',' => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);

    items.into_iter().map(|item| item.trim().to_string()).collect()
}

fn parse_scalar(scalar: Scalar, raw: &str) -> Option<PropertyValue> {
    let trimmed = raw.trim();
    let value = match scalar {
        Scalar::String => PropertyValue::String(raw.to_string()),
        Scalar::Password => PropertyValue::password(raw),
        Scalar::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                PropertyValue::Boolean(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                PropertyValue::Boolean(false)
            } else {
                return None;
            }
        }
        Scalar::Byte => PropertyValue::Byte(trimmed.parse().ok()?),
        Scalar::Short => PropertyValue::Short(trimmed.parse().ok()?),
        Scalar::Integer => PropertyValue::Integer(trimmed.parse().ok()?),
        Scalar::Long => PropertyValue::Long(trimmed.parse().ok()?),
        Scalar::Float => PropertyValue::Float(trimmed.parse().ok()?),
        Scalar::Double => PropertyValue::Double(trimmed.parse().ok()?),
        Scalar::Char => PropertyValue::Char(trimmed.chars().next()?),
    };
    Some(value)
}

//! JSON implementation of the configuration serializer

use serde::{Deserialize, Serialize};
use snapvault_core::{ComponentConfiguration, ConfigSerializer, Error, Result};

/// On-disk document wrapping the configuration list
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    configurations: Vec<ComponentConfiguration>,
}

/// Pretty-printed JSON serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl ConfigSerializer for JsonSerializer {
    fn marshal(&self, configs: &[ComponentConfiguration]) -> Result<Vec<u8>> {
        let document = SnapshotDocument {
            configurations: configs.to_vec(),
        };
        serde_json::to_vec_pretty(&document)
            .map_err(|e| Error::serialization(format!("Failed to serialize snapshot: {}", e)))
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<Vec<ComponentConfiguration>> {
        let document: SnapshotDocument = serde_json::from_slice(bytes)
            .map_err(|e| Error::serialization(format!("Failed to parse snapshot: {}", e)))?;
        Ok(document.configurations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapvault_core::PropertyValue;

    #[test]
    fn test_marshal_wraps_configurations() {
        let configs = vec![ComponentConfiguration::new("a").with_property("k", 1)];
        let bytes = JsonSerializer.marshal(&configs).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["configurations"][0]["pid"], "a");

        let restored = JsonSerializer.unmarshal(&bytes).unwrap();
        assert_eq!(restored[0].properties["k"], PropertyValue::Integer(1));
    }

    #[test]
    fn test_unmarshal_rejects_garbage() {
        assert!(matches!(
            JsonSerializer.unmarshal(b"not json"),
            Err(Error::Serialization { .. })
        ));
    }
}

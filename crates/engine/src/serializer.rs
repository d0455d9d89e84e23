//! Document serialization
//!
//! A [`Serializer`] turns documents into JSON payload trees and back, and
//! declares the field-naming rule its output follows. The translator reads
//! that rule so predicate paths spell fields the way payloads do.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use stratadoc_core::{FieldNaming, Result};

/// Converts documents to and from payload trees
pub trait Serializer: Send + Sync {
    /// Naming rule the produced payloads follow
    fn naming(&self) -> FieldNaming;

    /// Document to payload tree
    fn serialize<T: Serialize>(&self, document: &T) -> Result<Value>;

    /// Payload tree to document
    fn deserialize<T: DeserializeOwned>(&self, payload: Value) -> Result<T>;

    /// Payload tree to stored text
    fn encode(&self, payload: &Value) -> Result<String> {
        Ok(serde_json::to_string(payload)?)
    }

    /// Stored text to payload tree
    fn decode(&self, text: &str) -> Result<Value> {
        Ok(serde_json::from_str(text)?)
    }
}

/// serde_json serializer
///
/// `naming` must agree with the `rename_all` attribute on the stored types;
/// the default is camelCase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonSerializer {
    naming: FieldNaming,
}

impl JsonSerializer {
    /// Serializer declaring the given naming rule
    pub fn new(naming: FieldNaming) -> Self {
        JsonSerializer { naming }
    }
}

impl Serializer for JsonSerializer {
    fn naming(&self) -> FieldNaming {
        self.naming
    }

    fn serialize<T: Serialize>(&self, document: &T) -> Result<Value> {
        Ok(serde_json::to_value(document)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, payload: Value) -> Result<T> {
        Ok(serde_json::from_value(payload)?)
    }
}

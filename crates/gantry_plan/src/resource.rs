//! Compiled resource records.

use gantry_core::{ContentHash, CoreResult, Value, ValueMap};
use serde::{Deserialize, Serialize};

/// Name prefix marking a resource for export to the world
pub const EXPORT_PREFIX: &str = "@@";

/// A resource to be reconciled, identified by kind and name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedResource {
    /// Kind as declared
    pub kind: String,
    /// Resource name, possibly carrying the export prefix
    pub name: String,
    /// Attributes assigned through the kind's setter
    pub attributes: ValueMap,
    /// Metaparameters merged from `meta` sub-blocks
    pub meta: ValueMap,
}

impl ManagedResource {
    /// Create an empty record
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            attributes: ValueMap::new(),
            meta: ValueMap::new(),
        }
    }

    /// Set an attribute without schema checks
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set a metaparameter without schema checks
    #[must_use]
    pub fn with_meta(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(name.into(), value.into());
        self
    }

    /// Attribute by name
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// True when the name carries the export prefix
    #[must_use]
    pub fn is_exported(&self) -> bool {
        self.name.starts_with(EXPORT_PREFIX)
    }

    /// Copy of this record with the export prefix removed from its name
    #[must_use]
    pub fn to_exported(&self) -> Option<Self> {
        let name = self.name.strip_prefix(EXPORT_PREFIX)?;
        Some(Self {
            name: name.to_string(),
            ..self.clone()
        })
    }

    /// Hash of kind, name, attributes and meta
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be encoded
    pub fn content_hash(&self) -> CoreResult<ContentHash> {
        ContentHash::of(self)
    }

    /// Plain JSON form for display
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind,
            "name": self.name,
            "attributes": Value::Map(self.attributes.clone()).to_json(),
            "meta": Value::Map(self.meta.clone()).to_json(),
        })
    }
}

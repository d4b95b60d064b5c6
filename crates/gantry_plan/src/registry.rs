//! Resource kind registry.
//!
//! Each kind knows which attributes it accepts and how to assign them
//! onto a [`ManagedResource`]. Kinds are looked up by their canonical
//! name, so `file` and `File` resolve to the same entry.

use crate::error::{CompileError, CompileResult};
use crate::resource::ManagedResource;
use gantry_core::{CoreError, CoreResult, Value, ValueMap};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Metaparameters accepted in `meta` sub-blocks
pub const META_FIELDS: &[Field] = &[
    Field::string("autoedge"),
    Field::string("autogroup"),
    Field::string("noop"),
    Field::string("retry"),
    Field::string("delay"),
    Field::string("poll"),
    Field::string("limit"),
    Field::string("burst"),
    Field::new("sema", Shape::List),
];

/// Canonical form of a kind name: first character upper-cased
#[must_use]
pub fn canonical_kind(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Value shape an attribute accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// String scalar
    String,
    /// List of values
    List,
    /// Map of values
    Map,
    /// Anything
    Any,
}

impl Shape {
    /// Check a value against this shape
    #[must_use]
    pub const fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Any, _)
                | (Self::String, Value::String(_))
                | (Self::List, Value::List(_))
                | (Self::Map, Value::Map(_))
        )
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
            Self::Any => write!(f, "any value"),
        }
    }
}

/// One accepted attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Attribute name
    pub name: &'static str,
    /// Accepted shape
    pub shape: Shape,
}

impl Field {
    /// Create a field
    #[must_use]
    pub const fn new(name: &'static str, shape: Shape) -> Self {
        Self { name, shape }
    }

    /// Create a string field
    #[must_use]
    pub const fn string(name: &'static str) -> Self {
        Self::new(name, Shape::String)
    }
}

/// Attribute assignment error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// Kind has no such attribute
    #[error("unknown attribute `{name}`")]
    Unknown {
        /// Attribute name
        name: String,
    },

    /// Value has the wrong shape
    #[error("attribute `{name}` expects {expected}, got {actual}")]
    Shape {
        /// Attribute name
        name: String,
        /// Shape the field accepts
        expected: Shape,
        /// Type name of the rejected value
        actual: &'static str,
    },
}

fn check_field(fields: &[Field], name: &str, value: &Value) -> Result<(), AttributeError> {
    let field = fields
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| AttributeError::Unknown {
            name: name.to_string(),
        })?;
    if !field.shape.accepts(value) {
        return Err(AttributeError::Shape {
            name: name.to_string(),
            expected: field.shape,
            actual: value.type_name(),
        });
    }
    Ok(())
}

/// A kind of resource the compiler can build
pub trait ResourceKind: Send + Sync {
    /// Kind name as users write it
    fn kind(&self) -> &str;

    /// Attributes this kind accepts
    fn fields(&self) -> &[Field];

    /// Assign one attribute onto a record
    ///
    /// # Errors
    ///
    /// Returns error if the attribute is unknown or the value has the
    /// wrong shape
    fn assign(
        &self,
        resource: &mut ManagedResource,
        name: &str,
        value: Value,
    ) -> Result<(), AttributeError> {
        check_field(self.fields(), name, &value)?;
        resource.attributes.insert(name.to_string(), value);
        Ok(())
    }
}

/// Kind described entirely by its field list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    kind: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Create a schema
    #[must_use]
    pub fn new(kind: impl Into<String>, fields: &[Field]) -> Self {
        Self {
            kind: kind.into(),
            fields: fields.to_vec(),
        }
    }
}

impl ResourceKind for Schema {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Registry of resource kinds
pub struct ResourceRegistry {
    /// Kinds by canonical name
    kinds: IndexMap<String, Arc<dyn ResourceKind>>,
}

impl ResourceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: IndexMap::new(),
        }
    }

    /// Registry with the built-in kinds
    #[must_use]
    pub fn builtin() -> Self {
        use Shape::{Any, List, Map};

        let schemas = [
            Schema::new(
                "file",
                &[
                    Field::string("path"),
                    Field::string("dirname"),
                    Field::string("basename"),
                    Field::string("content"),
                    Field::string("source"),
                    Field::string("state"),
                    Field::string("recurse"),
                    Field::string("force"),
                ],
            ),
            Schema::new(
                "exec",
                &[
                    Field::string("cmd"),
                    Field::string("shell"),
                    Field::string("timeout"),
                    Field::string("watchcmd"),
                    Field::string("watchshell"),
                    Field::string("ifcmd"),
                    Field::string("ifshell"),
                    Field::string("pollint"),
                    Field::string("state"),
                ],
            ),
            Schema::new(
                "pkg",
                &[
                    Field::string("state"),
                    Field::string("allowuntrusted"),
                    Field::string("allownonfree"),
                    Field::string("allowunsupported"),
                ],
            ),
            Schema::new("svc", &[Field::string("state"), Field::string("startup")]),
            Schema::new("noop", &[Field::new("comment", Any)]),
            Schema::new(
                "msg",
                &[
                    Field::string("body"),
                    Field::string("priority"),
                    Field::new("fields", Map),
                    Field::string("journal"),
                    Field::string("syslog"),
                ],
            ),
            Schema::new("timer", &[Field::string("interval")]),
            Schema::new(
                "hostname",
                &[
                    Field::string("hostname"),
                    Field::string("prettyhostname"),
                    Field::string("statichostname"),
                    Field::string("transienthostname"),
                ],
            ),
            Schema::new("augeas", &[Field::string("file"), Field::string("lens"), Field::new("sets", List)]),
        ];
        let kinds = schemas
            .into_iter()
            .map(|schema| {
                let kind: Arc<dyn ResourceKind> = Arc::new(schema);
                (canonical_kind(kind.kind()), kind)
            })
            .collect();
        Self { kinds }
    }

    /// Register a kind
    ///
    /// # Errors
    ///
    /// Returns error if a kind with the same canonical name exists
    pub fn register(&mut self, kind: Arc<dyn ResourceKind>) -> CoreResult<()> {
        let key = canonical_kind(kind.kind());
        if self.kinds.contains_key(&key) {
            return Err(CoreError::AlreadyExists {
                kind: "ResourceKind".to_string(),
                id: key,
            });
        }
        self.kinds.insert(key, kind);
        Ok(())
    }

    /// Look up a kind
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ResourceKind>> {
        self.kinds.get(&canonical_kind(kind))
    }

    /// Check whether a kind is registered
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.get(kind).is_some()
    }

    /// Registered canonical kind names
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Create an empty record of `kind`
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnknownResourceKind`] if the kind is not
    /// registered
    pub fn construct(&self, kind: &str, name: &str) -> CompileResult<ManagedResource> {
        if !self.contains(kind) {
            return Err(CompileError::UnknownResourceKind {
                kind: kind.to_string(),
            });
        }
        Ok(ManagedResource::new(kind, name))
    }

    /// Assign evaluated attributes and metaparameters onto a record made
    /// by [`construct`](Self::construct)
    ///
    /// # Errors
    ///
    /// Returns error if the record's kind is unknown or any attribute or
    /// metaparameter is rejected
    pub fn apply(
        &self,
        mut resource: ManagedResource,
        attributes: ValueMap,
        meta: ValueMap,
    ) -> CompileResult<ManagedResource> {
        let factory = self
            .get(&resource.kind)
            .ok_or_else(|| CompileError::UnknownResourceKind {
                kind: resource.kind.clone(),
            })?;

        let invalid = |resource: &ManagedResource, source| CompileError::InvalidAttribute {
            kind: resource.kind.clone(),
            name: resource.name.clone(),
            source,
        };
        for (attr, value) in attributes {
            if let Err(source) = factory.assign(&mut resource, &attr, value) {
                return Err(invalid(&resource, source));
            }
        }
        for (param, value) in meta {
            if let Err(source) = check_field(META_FIELDS, &param, &value) {
                return Err(invalid(&resource, source));
            }
            resource.meta.insert(param, value);
        }
        Ok(resource)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

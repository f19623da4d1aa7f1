//! Type descriptors.
//!
//! A descriptor tells the store how to validate a value (`is`), what to fill
//! in when a model field is missing (`default_value`) and, for models, which
//! field carries the identifier used by reconciliation.
//!
//! The set of descriptors is closed:
//!
//! | variant     | snapshot shape          | container |
//! |-------------|-------------------------|-----------|
//! | `Primitive` | string / number / bool  | no        |
//! | `Model`     | object with fixed keys  | yes       |
//! | `Array`     | array                   | yes       |
//! | `Map`       | object with free keys   | yes       |

pub mod builder;
pub mod identifier;

pub use builder::TypeBuilder;
pub use identifier::Identifier;

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Shared handle to a type descriptor.
pub type TypeRef = Arc<TypeDef>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    /// A string or integer that identifies a model instance within its tree.
    Identifier,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Identifier => "identifier",
        }
    }

    pub fn matches_value(&self, value: &Value) -> bool {
        match self {
            PrimitiveKind::String => value.is_string(),
            PrimitiveKind::Number => value.is_number(),
            PrimitiveKind::Boolean => value.is_boolean(),
            PrimitiveKind::Identifier => Identifier::from_value(value).is_some(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrimitiveType {
    pub kind: PrimitiveKind,
    pub default: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ModelType {
    pub name: String,
    pub fields: IndexMap<String, TypeRef>,
    identifier: Option<String>,
}

impl ModelType {
    /// Creates a model descriptor. The first field of kind
    /// [`PrimitiveKind::Identifier`] becomes the identifier field.
    pub fn new(name: impl Into<String>, fields: IndexMap<String, TypeRef>) -> Self {
        let identifier = fields
            .iter()
            .find(|(_, ty)| {
                matches!(
                    ty.as_ref(),
                    TypeDef::Primitive(PrimitiveType { kind: PrimitiveKind::Identifier, .. })
                )
            })
            .map(|(key, _)| key.clone());
        Self { name: name.into(), fields, identifier }
    }

    pub fn identifier_field(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Reads the identifier carried by a raw model value.
    pub fn identifier_of(&self, value: &Value) -> Option<Identifier> {
        let field = self.identifier.as_deref()?;
        value.get(field).and_then(Identifier::from_value)
    }

    fn is(&self, value: &Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        self.fields.iter().all(|(key, ty)| match obj.get(key) {
            Some(v) => ty.is(v),
            None => ty.default_value().is_some(),
        })
    }

    /// Fills in defaults for missing fields and drops unknown keys.
    ///
    /// The value must already satisfy [`TypeDef::is`].
    pub fn normalize(&self, value: &Value) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, ty) in &self.fields {
            let field = value
                .get(key)
                .cloned()
                .or_else(|| ty.default_value())
                .unwrap_or(Value::Null);
            out.insert(key.clone(), field);
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ArrayType {
    pub element: TypeRef,
}

#[derive(Debug, Clone)]
pub struct MapType {
    pub value: TypeRef,
}

/// The unified descriptor enum.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Primitive(PrimitiveType),
    Model(ModelType),
    Array(ArrayType),
    Map(MapType),
}

impl TypeDef {
    pub fn kind(&self) -> &'static str {
        match self {
            TypeDef::Primitive(p) => p.kind.as_str(),
            TypeDef::Model(_) => "model",
            TypeDef::Array(_) => "array",
            TypeDef::Map(_) => "map",
        }
    }

    /// Human readable type name, used in error messages.
    pub fn name(&self) -> String {
        match self {
            TypeDef::Primitive(p) => p.kind.as_str().to_string(),
            TypeDef::Model(m) => m.name.clone(),
            TypeDef::Array(a) => format!("{}[]", a.element.name()),
            TypeDef::Map(m) => format!("map<{}>", m.value.name()),
        }
    }

    /// Structural type check of a plain value.
    ///
    /// Models accept unknown keys and missing keys whose type has a default.
    pub fn is(&self, value: &Value) -> bool {
        match self {
            TypeDef::Primitive(p) => p.kind.matches_value(value),
            TypeDef::Model(m) => m.is(value),
            TypeDef::Array(a) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| a.element.is(item))),
            TypeDef::Map(m) => value
                .as_object()
                .is_some_and(|entries| entries.values().all(|v| m.value.is(v))),
        }
    }

    /// Value used when a model field is missing from the input.
    ///
    /// Arrays and maps default to empty; a model defaults to `{}` when every
    /// one of its fields has a default; primitives only when declared.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            TypeDef::Primitive(p) => p.default.clone(),
            TypeDef::Array(_) => Some(Value::Array(Vec::new())),
            TypeDef::Map(_) => Some(Value::Object(Map::new())),
            TypeDef::Model(m) => m
                .fields
                .values()
                .all(|ty| ty.default_value().is_some())
                .then(|| Value::Object(Map::new())),
        }
    }

    pub fn as_model(&self) -> Option<&ModelType> {
        match self {
            TypeDef::Model(m) => Some(m),
            _ => None,
        }
    }

    /// Identifier carried by `value`, if this is a model with an identifier
    /// field and the value provides one.
    pub fn identifier_of(&self, value: &Value) -> Option<Identifier> {
        self.as_model().and_then(|m| m.identifier_of(value))
    }
}

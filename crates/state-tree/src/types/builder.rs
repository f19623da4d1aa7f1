//! TypeBuilder: factory for type descriptors.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::{ArrayType, MapType, ModelType, PrimitiveKind, PrimitiveType, TypeDef, TypeRef};

/// Factory for [`TypeRef`] values.
///
/// ```
/// use serde_json::json;
/// use state_tree::TypeBuilder;
///
/// let t = TypeBuilder::new();
/// let task = t.model("Task", [("id", t.id()), ("done", t.optional(t.bool(), json!(false)))]);
/// let store = t.model("Store", [("todos", t.arr(task))]);
/// assert!(store.is(&json!({"todos": [{"id": "1"}]})));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeBuilder;

impl TypeBuilder {
    pub fn new() -> Self {
        Self
    }

    fn primitive(&self, kind: PrimitiveKind) -> TypeRef {
        Arc::new(TypeDef::Primitive(PrimitiveType { kind, default: None }))
    }

    pub fn str(&self) -> TypeRef {
        self.primitive(PrimitiveKind::String)
    }

    pub fn num(&self) -> TypeRef {
        self.primitive(PrimitiveKind::Number)
    }

    pub fn bool(&self) -> TypeRef {
        self.primitive(PrimitiveKind::Boolean)
    }

    /// Identifier field. Required: it has no default.
    pub fn id(&self) -> TypeRef {
        self.primitive(PrimitiveKind::Identifier)
    }

    /// Same type with a default, so the field may be omitted.
    ///
    /// Only primitives carry explicit defaults; containers already default
    /// to empty and are returned unchanged.
    pub fn optional(&self, ty: TypeRef, default: Value) -> TypeRef {
        match ty.as_ref() {
            TypeDef::Primitive(p) => Arc::new(TypeDef::Primitive(PrimitiveType {
                kind: p.kind,
                default: Some(default),
            })),
            _ => ty,
        }
    }

    pub fn model<K, I>(&self, name: &str, fields: I) -> TypeRef
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TypeRef)>,
    {
        let fields: IndexMap<String, TypeRef> =
            fields.into_iter().map(|(k, ty)| (k.into(), ty)).collect();
        Arc::new(TypeDef::Model(ModelType::new(name, fields)))
    }

    pub fn arr(&self, element: TypeRef) -> TypeRef {
        Arc::new(TypeDef::Array(ArrayType { element }))
    }

    pub fn map(&self, value: TypeRef) -> TypeRef {
        Arc::new(TypeDef::Map(MapType { value }))
    }
}

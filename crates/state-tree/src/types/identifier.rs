use std::fmt;

use serde_json::Value;

/// Declared identifier value of a model instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    Str(String),
    Int(i64),
}

impl Identifier {
    /// Strings and integral numbers are identifiers; everything else is not.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Identifier::Str(s.clone())),
            Value::Number(n) => n.as_i64().map(Identifier::Int),
            _ => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Str(s) => write!(f, "{s:?}"),
            Identifier::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::Str(s.to_string())
    }
}

impl From<i64> for Identifier {
    fn from(i: i64) -> Self {
        Identifier::Int(i)
    }
}

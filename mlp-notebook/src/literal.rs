//! Literal values accepted as directive arguments

use serde_yaml::{Mapping, Number, Value};

/// A Python-style literal
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    /// Lists and tuples
    List(Vec<Literal>),
    /// Dict entries in source order
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::None => "None",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
        }
    }

    /// Converts the literal into a YAML value for `params.yaml`
    pub fn to_yaml(&self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.clone()),
            Self::Int(i) => Value::Number(Number::from(*i)),
            Self::Float(f) => Value::Number(Number::from(*f)),
            Self::Bool(b) => Value::Bool(*b),
            Self::None => Value::Null,
            Self::List(items) => Value::Sequence(items.iter().map(Literal::to_yaml).collect()),
            Self::Dict(entries) => {
                let mut mapping = Mapping::new();
                for (key, value) in entries {
                    mapping.insert(key.to_yaml(), value.to_yaml());
                }
                Value::Mapping(mapping)
            }
        }
    }
}

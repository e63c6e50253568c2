//! Render-time primitive values.
//!
//! [`Value`] is the closed set of leaf values a render tree can carry: what a
//! context holds, what lazy values resolve to, and what attribute flattening
//! operates on. `Value::Fn` is the rendition of a zero-argument callable
//! reached during context lookup: it is invoked with the context and its
//! result continues the traversal.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::Context;
use crate::safe::SafeString;

/// A function stored in the context, invoked during lookup traversal.
pub type ContextFn = Arc<dyn Fn(&Context) -> Value + Send + Sync>;

/// A primitive render-time value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Safe(SafeString),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Fn(ContextFn),
}

impl Value {
    /// Check if the value is truthy (for conditionals).
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Safe(s) => !s.as_str().is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Fn(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get a human-readable type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Safe(_) => "safe string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Fn(_) => "function",
        }
    }

    /// Convert the value to its output string, before escaping.
    ///
    /// Null renders as nothing; containers render with a debugging-friendly
    /// shape since they are not meant to appear in output directly.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::Safe(s) => s.as_str().to_string(),
            Value::List(l) => {
                let items: Vec<String> = l.iter().map(Value::to_display_string).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Map(_) => "[object]".to_string(),
            Value::Fn(_) => "[function]".to_string(),
        }
    }

    /// Mark this value as safe. Already-safe values are unchanged; other
    /// values are converted to their display string and wrapped.
    pub fn mark_safe(self) -> Value {
        match self {
            Value::Safe(s) => Value::Safe(s),
            Value::Str(s) => Value::Safe(SafeString::new(s)),
            other => Value::Safe(SafeString::new(other.to_display_string())),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Safe(s) => write!(f, "Safe({:?})", s.as_str()),
            Value::List(l) => f.debug_tuple("List").field(l).finish(),
            Value::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Value::Fn(_) => write!(f, "Fn(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Safe(a), Value::Safe(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Functions are never equal to anything, themselves included.
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<SafeString> for Value {
    fn from(s: SafeString) -> Self {
        Value::Safe(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

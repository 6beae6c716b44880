//! Tri-state values and canonical scalars
//!
//! A declared attribute is either not mentioned at all, mentioned but empty,
//! or carries a value. Collapsing the first two loses information the update
//! policy depends on, so the distinction is explicit in the type.

use serde_json::Value;
use std::fmt;

/// An attribute that is unset, explicitly empty, or set
#[derive(Debug, Clone, PartialEq)]
pub enum Tristate<T> {
    /// Not mentioned in the declared configuration
    Unset,
    /// Mentioned with an empty value (`""`, `[]`, `{}`)
    Empty,
    /// Mentioned with a value
    Set(T),
}

impl<T> Default for Tristate<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Tristate<T> {
    pub fn present(value: T) -> Self {
        Self::Set(value)
    }

    pub fn absent() -> Self {
        Self::Unset
    }

    pub fn explicit_empty() -> Self {
        Self::Empty
    }

    /// True unless the attribute was never mentioned
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// True only when a non-empty value is present
    pub fn has_value(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// The value, or `default` when unset or empty
    pub fn unwrap_or_default(self, default: T) -> T {
        match self {
            Self::Set(value) => value,
            Self::Unset | Self::Empty => default,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unset | Self::Empty => None,
        }
    }

    pub fn as_ref(&self) -> Tristate<&T> {
        match self {
            Self::Unset => Tristate::Unset,
            Self::Empty => Tristate::Empty,
            Self::Set(value) => Tristate::Set(value),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Tristate<U> {
        match self {
            Self::Unset => Tristate::Unset,
            Self::Empty => Tristate::Empty,
            Self::Set(value) => Tristate::Set(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Tristate<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Self::Set)
    }
}

/// A scalar as it appears at the configuration boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Read a JSON scalar; `None` for null, arrays and objects
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Canonical string form: `true`/`false`, integers without a decimal
    /// point, floats in their shortest representation (`1.5`, `2`)
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Canonical string for a JSON scalar, `None` for anything else
pub fn canonical_string(value: &Value) -> Option<String> {
    Scalar::from_json(value).map(|s| s.canonical())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tristate_constructors() {
        assert_eq!(Tristate::<String>::absent(), Tristate::Unset);
        assert_eq!(Tristate::<String>::explicit_empty(), Tristate::Empty);
        assert_eq!(Tristate::present(3), Tristate::Set(3));
        assert_eq!(Tristate::<u8>::default(), Tristate::Unset);
    }

    #[test]
    fn test_is_set_distinguishes_empty_from_unset() {
        assert!(!Tristate::<String>::absent().is_set());
        assert!(Tristate::<String>::explicit_empty().is_set());
        assert!(!Tristate::<String>::explicit_empty().has_value());
        assert!(Tristate::present("x").has_value());
    }

    #[test]
    fn test_unwrap_or_default() {
        assert_eq!(Tristate::present(5).unwrap_or_default(1), 5);
        assert_eq!(Tristate::absent().unwrap_or_default(1), 1);
        assert_eq!(Tristate::explicit_empty().unwrap_or_default(1), 1);
    }

    #[test]
    fn test_map_keeps_state() {
        assert_eq!(Tristate::present(2).map(|v| v * 2), Tristate::Set(4));
        assert_eq!(Tristate::<i32>::Empty.map(|v| v * 2), Tristate::Empty);
        assert_eq!(Tristate::from(None::<i32>), Tristate::Unset);
    }

    #[test]
    fn test_canonical_strings() {
        assert_eq!(canonical_string(&json!(true)).as_deref(), Some("true"));
        assert_eq!(canonical_string(&json!(false)).as_deref(), Some("false"));
        assert_eq!(canonical_string(&json!(42)).as_deref(), Some("42"));
        assert_eq!(canonical_string(&json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(canonical_string(&json!(2.0)).as_deref(), Some("2"));
        assert_eq!(canonical_string(&json!("abc")).as_deref(), Some("abc"));
        assert_eq!(canonical_string(&json!(null)), None);
        assert_eq!(canonical_string(&json!([1])), None);
    }
}

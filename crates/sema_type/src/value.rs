use std::fmt;

use ordered_float::OrderedFloat;

use crate::result::AbstractType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
  Int(i64),
  Float(OrderedFloat<f64>),
  Bool(bool),
  Char(char),
  String(String),
  Array(Vec<ConstValue>),
  Tuple(Vec<ConstValue>),
  Null,
}

impl ConstValue {
  pub fn as_int(&self) -> Option<i64> {
    match self {
      ConstValue::Int(v) => Some(*v),
      ConstValue::Char(c) => Some(*c as i64),
      ConstValue::Bool(b) => Some(*b as i64),
      _ => None,
    }
  }

  pub fn as_float(&self) -> Option<f64> {
    match self {
      ConstValue::Float(v) => Some(v.0),
      _ => self.as_int().map(|v| v as f64),
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      ConstValue::Bool(b) => Some(*b),
      ConstValue::Int(v) => Some(*v != 0),
      ConstValue::Null => Some(false),
      _ => None,
    }
  }

  /// Element count of strings and arrays.
  pub fn length(&self) -> Option<usize> {
    match self {
      ConstValue::String(s) => Some(s.chars().count()),
      ConstValue::Array(items) | ConstValue::Tuple(items) => Some(items.len()),
      _ => None,
    }
  }
}

impl fmt::Display for ConstValue {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      ConstValue::Int(v) => write!(f, "{}", v),
      ConstValue::Float(v) => write!(f, "{}", v),
      ConstValue::Bool(v) => write!(f, "{}", v),
      ConstValue::Char(c) => write!(f, "{:?}", c),
      ConstValue::String(s) => write!(f, "{:?}", s),
      ConstValue::Array(items) | ConstValue::Tuple(items) => {
        write!(f, "[")?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", item)?;
        }
        write!(f, "]")
      },
      ConstValue::Null => write!(f, "null"),
    }
  }
}

/// A compile-time value together with the type it was evaluated as.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolValue {
  pub value: ConstValue,
  pub ty: AbstractType,
}

impl SymbolValue {
  pub fn new(
    value: ConstValue,
    ty: AbstractType,
  ) -> Self {
    Self { value, ty }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_length_of_string_and_array() {
    assert_eq!(ConstValue::String("héllo".into()).length(), Some(5));
    assert_eq!(ConstValue::Array(vec![ConstValue::Int(1), ConstValue::Int(2)]).length(), Some(2));
    assert_eq!(ConstValue::Int(3).length(), None);
  }

  #[test]
  fn test_numeric_views() {
    assert_eq!(ConstValue::Char('a').as_int(), Some(97));
    assert_eq!(ConstValue::Int(2).as_float(), Some(2.0));
    assert_eq!(ConstValue::Int(0).as_bool(), Some(false));
  }
}

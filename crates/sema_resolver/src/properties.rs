use sema_ast::types::{PrimitiveKind, TypeModifier};
use sema_ast::Name;
use sema_type::{AbstractType, ConstValue, SemanticResult, TypeKind, UserTypeKind};

use crate::context::ResolutionContext;

/// Properties every type has.
pub const COMMON_PROPERTIES: &[(&str, &str)] = &[
  ("sizeof", "Size of the type in bytes"),
  ("alignof", "Alignment of the type in bytes"),
  ("init", "Default initializer"),
  ("mangleof", "Mangled name of the type"),
  ("stringof", "Type name as a string"),
];

pub const ARRAY_PROPERTIES: &[(&str, &str)] = &[
  ("length", "Number of elements"),
  ("ptr", "Pointer to the first element"),
  ("dup", "Mutable copy of the array"),
  ("idup", "Immutable copy of the array"),
  ("reverse", "Reverses the elements in place"),
  ("sort", "Sorts the elements in place"),
];

pub const ASSOC_ARRAY_PROPERTIES: &[(&str, &str)] = &[
  ("keys", "Array of the keys"),
  ("values", "Array of the values"),
  ("length", "Number of entries"),
];

pub const ENUM_PROPERTIES: &[(&str, &str)] = &[("min", "Smallest member value"), ("max", "Largest member value")];

/// Names and descriptions of the properties available on `ty`.
pub fn static_property_names(ty: &SemanticResult) -> Vec<(&'static str, &'static str)> {
  let mut names: Vec<(&'static str, &'static str)> = COMMON_PROPERTIES.to_vec();
  match ty.kind() {
    Some(TypeKind::Array { .. }) => names.extend_from_slice(ARRAY_PROPERTIES),
    Some(TypeKind::AssocArray { .. }) => names.extend_from_slice(ASSOC_ARRAY_PROPERTIES),
    Some(TypeKind::UserDefined(user)) if user.kind == UserTypeKind::Enum => names.extend_from_slice(ENUM_PROPERTIES),
    _ => {},
  }
  names
}

fn size_type() -> AbstractType {
  AbstractType::new(TypeKind::Primitive(PrimitiveKind::ULong))
}

/// Byte size of types whose layout does not depend on declarations.
fn size_of(ty: &SemanticResult) -> Option<i64> {
  match ty.kind()? {
    TypeKind::Primitive(PrimitiveKind::Void) => Some(1),
    TypeKind::Primitive(PrimitiveKind::Real) => Some(10),
    TypeKind::Primitive(kind) => Some(((kind.size_bits() + 7) / 8) as i64),
    TypeKind::Null | TypeKind::Pointer(_) => Some(8),
    TypeKind::Array {
      fixed_length: None, ..
    }
    | TypeKind::Delegate(_) => Some(16),
    TypeKind::Array {
      element,
      fixed_length: Some(length),
    } => size_of(element)?.checked_mul(i64::try_from(*length).ok()?),
    TypeKind::AssocArray { .. } => Some(8),
    TypeKind::UserDefined(user) if matches!(user.kind, UserTypeKind::Class | UserTypeKind::Interface) => Some(8),
    _ => None,
  }
}

fn default_value(ty: &SemanticResult) -> Option<ConstValue> {
  match ty.kind()? {
    TypeKind::Primitive(PrimitiveKind::Bool) => Some(ConstValue::Bool(false)),
    TypeKind::Primitive(PrimitiveKind::Char | PrimitiveKind::WChar | PrimitiveKind::DChar) => {
      Some(ConstValue::Char('\u{FFFF}'))
    },
    TypeKind::Primitive(kind) if kind.is_floating() => Some(ConstValue::Float(f64::NAN.into())),
    TypeKind::Primitive(kind) if kind.is_integral() => Some(ConstValue::Int(0)),
    TypeKind::Null | TypeKind::Pointer(_) | TypeKind::AssocArray { .. } | TypeKind::Delegate(_) => Some(ConstValue::Null),
    TypeKind::Array { fixed_length: None, .. } => Some(ConstValue::Array(Vec::new())),
    _ => None,
  }
}

fn with_element_modifier(
  element: &SemanticResult,
  modifier: Option<TypeModifier>,
) -> SemanticResult {
  match element {
    SemanticResult::Type(t) => SemanticResult::Type(t.clone().with_modifier(modifier)),
    other => other.clone(),
  }
}

/// Built-in property `name` of the structural type `ty`, `Unknown` if there is none.
pub fn static_property(
  ty: &SemanticResult,
  name: &Name,
  _ctx: &mut ResolutionContext,
) -> SemanticResult {
  let Some(abstract_type) = ty.as_type() else {
    return SemanticResult::Unknown;
  };

  match (name.as_str(), &abstract_type.kind) {
    ("sizeof" | "alignof", _) => match size_of(ty) {
      Some(size) => {
        let size = if name.as_str() == "alignof" { size.min(8) } else { size };
        SemanticResult::value(ConstValue::Int(size), size_type())
      },
      None => SemanticResult::Type(size_type()),
    },
    ("init", _) => match default_value(ty) {
      Some(value) => SemanticResult::value(value, abstract_type.clone()),
      None => ty.clone(),
    },
    ("stringof", _) => {
      let text = ConstValue::String(ty.to_string());
      SemanticResult::value(text, AbstractType::char_string(PrimitiveKind::Char))
    },
    ("mangleof", _) => SemanticResult::string_type(),
    ("length", TypeKind::Array { fixed_length, .. }) => match fixed_length {
      Some(length) => match i64::try_from(*length) {
        Ok(length) => SemanticResult::value(ConstValue::Int(length), size_type()),
        Err(_) => SemanticResult::Type(size_type()),
      },
      None => SemanticResult::Type(size_type()),
    },
    ("ptr", TypeKind::Array { element, .. }) => SemanticResult::pointer_to((**element).clone()),
    ("dup", TypeKind::Array { element, .. }) => SemanticResult::array_of(with_element_modifier(element, None)),
    ("idup", TypeKind::Array { element, .. }) => {
      SemanticResult::array_of(with_element_modifier(element, Some(TypeModifier::Immutable)))
    },
    ("reverse" | "sort", TypeKind::Array { element, .. }) => SemanticResult::array_of((**element).clone()),
    ("keys", TypeKind::AssocArray { key, .. }) => SemanticResult::array_of((**key).clone()),
    ("values", TypeKind::AssocArray { value, .. }) => SemanticResult::array_of((**value).clone()),
    ("length", TypeKind::AssocArray { .. }) => SemanticResult::Type(size_type()),
    ("min" | "max", TypeKind::UserDefined(user)) if user.kind == UserTypeKind::Enum => ty.clone(),
    _ => SemanticResult::Unknown,
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use sema_ast::declarations::ASTDeclaration;
  use sema_ast::{ParseCacheView, Span};
  use sema_config::SemaConfig;

  use super::*;

  fn context() -> ResolutionContext {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    ResolutionContext::new(module, ParseCacheView::default(), Arc::new(SemaConfig::silent()))
  }

  fn property(
    ty: &SemanticResult,
    name: &str,
  ) -> SemanticResult {
    static_property(ty, &Name::new(name), &mut context())
  }

  #[test]
  fn test_sizeof_primitives() {
    let int = SemanticResult::primitive(PrimitiveKind::Int);
    let size = property(&int, "sizeof");
    assert_eq!(size.as_value().map(|v| v.value.clone()), Some(ConstValue::Int(4)));

    let fixed = SemanticResult::fixed_array_of(SemanticResult::primitive(PrimitiveKind::Short), 3);
    let size = property(&fixed, "sizeof");
    assert_eq!(size.as_value().map(|v| v.value.clone()), Some(ConstValue::Int(6)));
  }

  #[test]
  fn test_sizeof_overflow_has_no_value() {
    let huge = SemanticResult::fixed_array_of(SemanticResult::primitive(PrimitiveKind::Int), 1 << 62);
    let size = property(&huge, "sizeof");
    assert!(size.as_value().is_none());

    let nested = SemanticResult::fixed_array_of(huge, 2);
    assert!(property(&nested, "sizeof").as_value().is_none());
  }

  #[test]
  fn test_array_properties() {
    let string = SemanticResult::string_type();
    assert_eq!(
      property(&string, "dup"),
      SemanticResult::array_of(SemanticResult::primitive(PrimitiveKind::Char))
    );
    assert_eq!(property(&string, "idup"), string);
    assert!(property(&string, "keys").is_unknown());

    let fixed = SemanticResult::fixed_array_of(SemanticResult::primitive(PrimitiveKind::Int), 7);
    assert_eq!(property(&fixed, "length").as_value().and_then(|v| v.value.as_int()), Some(7));
  }

  #[test]
  fn test_property_names_depend_on_kind() {
    let names: Vec<&str> = static_property_names(&SemanticResult::string_type()).into_iter().map(|(n, _)| n).collect();
    assert!(names.contains(&"length"));
    assert!(names.contains(&"stringof"));
    assert!(!names.contains(&"keys"));
  }
}

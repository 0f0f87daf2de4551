use std::sync::Arc;

use sema_ast::types::{PrimitiveKind, TypeModifier};

use crate::result::{AbstractType, SemanticResult, TemplateBindings, TypeKind, UserDefinedType, UserTypeKind};
use crate::strip::strip_all;

/// Structural identity of two results after stripping wrapper and alias layers.
pub fn is_equal(
  a: &SemanticResult,
  b: &SemanticResult,
) -> bool {
  let a = strip_all(a);
  let b = strip_all(b);

  match (&a, &b) {
    (SemanticResult::Type(a), SemanticResult::Type(b)) => a.modifier == b.modifier && kinds_equal(&a.kind, &b.kind),
    (SemanticResult::Value(a), SemanticResult::Value(b)) => a.value == b.value,
    _ => false,
  }
}

fn boxed_equal(
  a: &SemanticResult,
  b: &SemanticResult,
) -> bool {
  is_equal(a, b)
}

fn bindings_equal(
  a: &TemplateBindings,
  b: &TemplateBindings,
) -> bool {
  a.len() == b.len()
    && a
      .iter()
      .zip(b.iter())
      .all(|((na, va), (nb, vb))| na == nb && is_equal(va, vb))
}

fn kinds_equal(
  a: &TypeKind,
  b: &TypeKind,
) -> bool {
  match (a, b) {
    (TypeKind::Primitive(a), TypeKind::Primitive(b)) => a == b,
    (TypeKind::Null, TypeKind::Null) => true,
    (TypeKind::Pointer(a), TypeKind::Pointer(b)) | (TypeKind::Vector(a), TypeKind::Vector(b)) => boxed_equal(a, b),
    (
      TypeKind::Array {
        element: ea,
        fixed_length: la,
      },
      TypeKind::Array {
        element: eb,
        fixed_length: lb,
      },
    ) => la == lb && boxed_equal(ea, eb),
    (TypeKind::AssocArray { value: va, key: ka }, TypeKind::AssocArray { value: vb, key: kb }) => {
      boxed_equal(va, vb) && boxed_equal(ka, kb)
    },
    (TypeKind::Delegate(a), TypeKind::Delegate(b)) => {
      a.is_function == b.is_function
        && a.params.len() == b.params.len()
        && a.param_attributes == b.param_attributes
        && boxed_equal(&a.return_type, &b.return_type)
        && a.params.iter().zip(b.params.iter()).all(|(pa, pb)| is_equal(pa, pb))
    },
    (TypeKind::Tuple(a), TypeKind::Tuple(b)) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| is_equal(x, y)),
    (TypeKind::UserDefined(a), TypeKind::UserDefined(b)) => {
      Arc::ptr_eq(&a.definition, &b.definition) && bindings_equal(&a.deduced, &b.deduced)
    },
    (TypeKind::TemplateParameter(a), TypeKind::TemplateParameter(b)) => Arc::ptr_eq(&a.parameter, &b.parameter),
    (TypeKind::Module(a), TypeKind::Module(b)) => Arc::ptr_eq(a, b),
    (TypeKind::Package(a), TypeKind::Package(b)) => Arc::ptr_eq(a, b),
    _ => false,
  }
}

/// Whether a value of type `from` may be used where `to` is expected without a cast.
///
/// An unbound template parameter accepts anything. Values convert through
/// their type; two values convert only if they are equal.
pub fn is_implicitly_convertible(
  from: &SemanticResult,
  to: &SemanticResult,
) -> bool {
  let from = strip_all(from);
  let to = strip_all(to);

  match (&from, &to) {
    (_, SemanticResult::Type(AbstractType {
      kind: TypeKind::TemplateParameter(param),
      ..
    })) if param.base.is_none() => !from.is_unknown(),
    (SemanticResult::Unknown, _) | (_, SemanticResult::Unknown) => false,
    (SemanticResult::Ambiguous(candidates), _) => candidates.iter().any(|c| is_implicitly_convertible(c, &to)),
    (_, SemanticResult::Ambiguous(candidates)) => candidates.iter().any(|c| is_implicitly_convertible(&from, c)),
    (SemanticResult::Value(a), SemanticResult::Value(b)) => a.value == b.value,
    (SemanticResult::Value(v), SemanticResult::Type(to)) => type_convertible(&v.ty, to),
    (SemanticResult::Type(_), SemanticResult::Value(_)) => false,
    (SemanticResult::Type(from), SemanticResult::Type(to)) => type_convertible(from, to),
  }
}

fn type_convertible(
  from: &AbstractType,
  to: &AbstractType,
) -> bool {
  if from.modifier == to.modifier && kinds_equal(&from.kind, &to.kind) {
    return true;
  }

  match (&from.kind, &to.kind) {
    (TypeKind::Primitive(a), TypeKind::Primitive(b)) => primitive_convertible(*a, *b),
    (TypeKind::Null, TypeKind::Pointer(_))
    | (TypeKind::Null, TypeKind::Array { fixed_length: None, .. })
    | (TypeKind::Null, TypeKind::AssocArray { .. })
    | (TypeKind::Null, TypeKind::Delegate(_)) => true,
    (TypeKind::Null, TypeKind::UserDefined(t)) => {
      matches!(t.kind, UserTypeKind::Class | UserTypeKind::Interface)
    },
    (TypeKind::Pointer(a), TypeKind::Pointer(b)) => {
      let to_void = matches!(b.kind(), Some(TypeKind::Primitive(PrimitiveKind::Void)));
      to_void || element_convertible(a, b)
    },
    (
      TypeKind::Array {
        element: ea,
        fixed_length: la,
      },
      TypeKind::Array {
        element: eb,
        fixed_length: lb,
      },
    ) => (lb.is_none() || la == lb) && element_convertible(ea, eb),
    (TypeKind::UserDefined(a), TypeKind::UserDefined(b)) => derives_from(a, b),
    (TypeKind::UserDefined(a), _) if a.kind == UserTypeKind::Enum => match &a.base {
      Some(base) => is_implicitly_convertible(base, &SemanticResult::Type(to.clone())),
      None => matches!(to.kind, TypeKind::Primitive(PrimitiveKind::Int)),
    },
    _ => {
      // Top-level qualifiers do not block conversion of value types.
      from.modifier != to.modifier && kinds_equal(&from.kind, &to.kind) && !is_reference_kind(&from.kind)
    },
  }
}

fn is_reference_kind(kind: &TypeKind) -> bool {
  matches!(
    kind,
    TypeKind::Pointer(_) | TypeKind::Array { .. } | TypeKind::AssocArray { .. } | TypeKind::Delegate(_)
  )
}

/// Element types of arrays and pointers must match up to qualifiers; a mutable
/// view may not be taken of immutable or const data.
fn element_convertible(
  from: &SemanticResult,
  to: &SemanticResult,
) -> bool {
  let (Some(from), Some(to)) = (strip_all(from).as_type().cloned(), strip_all(to).as_type().cloned()) else {
    return is_implicitly_convertible(from, to);
  };

  if let TypeKind::TemplateParameter(p) = &to.kind {
    if p.base.is_none() {
      return true;
    }
  }

  let qualifier_ok = match (from.modifier, to.modifier) {
    (a, b) if a == b => true,
    (_, Some(TypeModifier::Const)) => true,
    _ => false,
  };

  qualifier_ok && kinds_equal(&from.kind, &to.kind)
}

fn primitive_convertible(
  from: PrimitiveKind,
  to: PrimitiveKind,
) -> bool {
  if from == to {
    return true;
  }
  if from == PrimitiveKind::Void || to == PrimitiveKind::Void || to == PrimitiveKind::Bool {
    return false;
  }

  if from.is_integral() && to.is_integral() {
    return to.size_bits() >= from.size_bits();
  }
  if from.is_integral() && to.is_floating() {
    return true;
  }
  if from.is_floating() && to.is_floating() {
    return to.size_bits() >= from.size_bits();
  }

  false
}

fn derives_from(
  from: &UserDefinedType,
  to: &UserDefinedType,
) -> bool {
  if Arc::ptr_eq(&from.definition, &to.definition) {
    return bindings_equal(&from.deduced, &to.deduced) || from.deduced.is_empty() || to.deduced.is_empty();
  }

  let parents = from.base.iter().map(|b| &**b).chain(from.interfaces.iter());
  for parent in parents {
    if let Some(TypeKind::UserDefined(parent)) = strip_all(parent).kind() {
      if derives_from(parent, to) {
        return true;
      }
    }
  }

  false
}

#[cfg(test)]
mod tests {
  use sema_ast::declarations::{ASTAggregate, ASTDeclaration, ASTTemplateParameter, AggregateKind};
  use sema_ast::{DeclRef, Span};

  use super::*;
  use crate::result::TemplateParameterSymbol;
  use crate::value::ConstValue;

  fn class(
    decl: &DeclRef,
    base: Option<SemanticResult>,
  ) -> SemanticResult {
    SemanticResult::of(TypeKind::UserDefined(UserDefinedType {
      kind: UserTypeKind::Class,
      definition: decl.clone(),
      base: base.map(Box::new),
      interfaces: vec![],
      deduced: TemplateBindings::new(),
    }))
  }

  fn int() -> SemanticResult {
    SemanticResult::primitive(PrimitiveKind::Int)
  }

  #[test]
  fn test_primitive_widening() {
    let long = SemanticResult::primitive(PrimitiveKind::Long);
    let double = SemanticResult::primitive(PrimitiveKind::Double);
    let char_ = SemanticResult::primitive(PrimitiveKind::Char);

    assert!(is_implicitly_convertible(&int(), &long));
    assert!(!is_implicitly_convertible(&long, &int()));
    assert!(is_implicitly_convertible(&int(), &double));
    assert!(!is_implicitly_convertible(&double, &int()));
    assert!(is_implicitly_convertible(&char_, &int()));
    assert!(!is_implicitly_convertible(&int(), &SemanticResult::primitive(PrimitiveKind::Bool)));
  }

  #[test]
  fn test_string_conversions() {
    let string = SemanticResult::string_type();
    let mutable = SemanticResult::array_of(SemanticResult::primitive(PrimitiveKind::Char));
    let const_chars = SemanticResult::array_of(SemanticResult::Type(
      AbstractType::new(TypeKind::Primitive(PrimitiveKind::Char)).with_modifier(Some(TypeModifier::Const)),
    ));

    assert!(is_implicitly_convertible(&string, &string));
    assert!(!is_implicitly_convertible(&string, &mutable));
    assert!(is_implicitly_convertible(&mutable, &const_chars));
    assert!(is_implicitly_convertible(&string, &const_chars));
    assert!(!is_implicitly_convertible(&int(), &string));
  }

  #[test]
  fn test_static_array_to_dynamic() {
    let fixed = SemanticResult::fixed_array_of(int(), 4);
    let dynamic = SemanticResult::array_of(int());
    assert!(is_implicitly_convertible(&fixed, &dynamic));
    assert!(!is_implicitly_convertible(&dynamic, &fixed));
    assert!(!is_equal(&fixed, &dynamic));
  }

  #[test]
  fn test_derived_class_converts_to_base() {
    let base_decl = ASTDeclaration::aggregate("Base", Span::default(), ASTAggregate::new(AggregateKind::Class));
    let derived_decl = ASTDeclaration::aggregate("Derived", Span::default(), ASTAggregate::new(AggregateKind::Class));
    let base = class(&base_decl, None);
    let derived = class(&derived_decl, Some(base.clone()));

    assert!(is_implicitly_convertible(&derived, &base));
    assert!(!is_implicitly_convertible(&base, &derived));
    assert!(is_implicitly_convertible(&SemanticResult::of(TypeKind::Null), &base));
  }

  #[test]
  fn test_unbound_template_parameter_accepts_anything() {
    let param = SemanticResult::of(TypeKind::TemplateParameter(TemplateParameterSymbol {
      parameter: ASTTemplateParameter::type_param("T"),
      base: None,
    }));
    assert!(is_implicitly_convertible(&SemanticResult::string_type(), &param));
    assert!(!is_implicitly_convertible(&SemanticResult::Unknown, &param));
  }

  #[test]
  fn test_values() {
    let three = SemanticResult::int_value(3);
    assert!(is_equal(&three, &SemanticResult::int_value(3)));
    assert!(!is_equal(&three, &SemanticResult::int_value(4)));
    assert!(is_implicitly_convertible(&three, &SemanticResult::primitive(PrimitiveKind::Long)));
    assert_eq!(three.as_value().map(|v| v.value.clone()), Some(ConstValue::Int(3)));
  }
}

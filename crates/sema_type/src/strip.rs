use std::collections::HashSet;

use sema_ast::NodeId;

use crate::result::{SemanticResult, TypeKind};

/// Follows alias layers down to the aliased terminal.
///
/// An alias that could not be resolved, or whose chain revisits an alias
/// declaration, yields `Unknown`. Ambiguous sets are stripped element-wise.
pub fn strip_aliases(result: &SemanticResult) -> SemanticResult {
  match result {
    SemanticResult::Ambiguous(candidates) => SemanticResult::Ambiguous(candidates.iter().map(strip_aliases).collect()),
    _ => strip_alias_chain(result),
  }
}

fn strip_alias_chain(result: &SemanticResult) -> SemanticResult {
  let mut visited: HashSet<NodeId> = HashSet::new();
  let mut current = result;

  loop {
    let Some(TypeKind::Alias(alias)) = current.kind() else {
      return current.clone();
    };

    if !visited.insert(alias.definition.id) {
      return SemanticResult::Unknown;
    }

    match &alias.base {
      Some(base) => current = base.as_ref(),
      None => return SemanticResult::Unknown,
    }
  }
}

/// Drops array-access, member-reference, delegate-call and bound
/// template-parameter layers to expose the structural type underneath.
///
/// A member reference to a constructor unwraps to the constructed type, which
/// is what its `base` holds, instead of the constructor's own return type.
pub fn strip_wrapper_layers(result: &SemanticResult) -> SemanticResult {
  if let SemanticResult::Ambiguous(candidates) = result {
    return SemanticResult::Ambiguous(candidates.iter().map(strip_wrapper_layers).collect());
  }

  let mut current = result.clone();
  loop {
    let next = match current.kind() {
      Some(TypeKind::ArrayAccess(inner)) | Some(TypeKind::DelegateCall(inner)) => Some((**inner).clone()),
      Some(TypeKind::Member(member)) => Some(member.base.as_deref().cloned().unwrap_or(SemanticResult::Unknown)),
      Some(TypeKind::TemplateParameter(param)) => param.base.as_deref().cloned(),
      _ => None,
    };

    match next {
      Some(next) => current = next,
      None => return current,
    }
  }
}

/// Strips wrapper and alias layers until neither applies.
pub fn strip_all(result: &SemanticResult) -> SemanticResult {
  let mut current = result.clone();
  loop {
    let next = strip_aliases(&strip_wrapper_layers(&current));
    if next == current {
      return next;
    }
    current = next;
  }
}

#[cfg(test)]
mod tests {
  use sema_ast::declarations::{ASTDeclaration, ASTFunction};
  use sema_ast::types::{ASTType, PrimitiveKind};
  use sema_ast::{DeclRef, Span};

  use super::*;
  use crate::result::{AliasType, SemanticResult};

  fn alias_decl(name: &str) -> DeclRef {
    ASTDeclaration::alias(name, ASTType::identifier("int"), Span::default())
  }

  fn alias(
    definition: &DeclRef,
    base: Option<SemanticResult>,
  ) -> SemanticResult {
    SemanticResult::of(TypeKind::Alias(AliasType {
      definition: definition.clone(),
      base: base.map(Box::new),
    }))
  }

  #[test]
  fn test_alias_chain_terminates_at_terminal() {
    let a = alias_decl("A");
    let b = alias_decl("B");
    let int = SemanticResult::primitive(PrimitiveKind::Int);
    let chain = alias(&a, Some(alias(&b, Some(int.clone()))));

    assert_eq!(strip_aliases(&chain), int);
  }

  #[test]
  fn test_self_referential_alias_is_unknown() {
    let a = alias_decl("A");
    let cyclic = alias(&a, Some(alias(&a, Some(SemanticResult::primitive(PrimitiveKind::Int)))));
    assert!(strip_aliases(&cyclic).is_unknown());

    let unresolved = alias(&a, None);
    assert!(strip_aliases(&unresolved).is_unknown());
  }

  #[test]
  fn test_constructor_reference_unwraps_to_constructed_type() {
    let class = ASTDeclaration::aggregate(
      "C",
      Span::default(),
      sema_ast::declarations::ASTAggregate::new(sema_ast::declarations::AggregateKind::Class),
    );
    let ctor = ASTDeclaration::function("this", Span::default(), ASTFunction::constructor(vec![], None));
    class.scope().add(ctor.clone());

    let class_type = SemanticResult::of(TypeKind::UserDefined(crate::result::UserDefinedType {
      kind: crate::result::UserTypeKind::Class,
      definition: class.clone(),
      base: None,
      interfaces: vec![],
      deduced: Default::default(),
    }));
    let reference = SemanticResult::member(ctor, Some(class_type.clone()));

    assert_eq!(strip_wrapper_layers(&reference), class_type);
  }

  #[test]
  fn test_wrappers_peel_in_order() {
    let int = SemanticResult::primitive(PrimitiveKind::Int);
    let access = SemanticResult::of(TypeKind::ArrayAccess(Box::new(SemanticResult::of(TypeKind::DelegateCall(
      Box::new(int.clone()),
    )))));
    assert_eq!(strip_wrapper_layers(&access), int);
  }

  #[test]
  fn test_strip_all_mixes_layers() {
    let a = alias_decl("A");
    let var = ASTDeclaration::variable("v", None, None, Span::default());
    let int = SemanticResult::primitive(PrimitiveKind::Int);
    let mixed = SemanticResult::member(var, Some(alias(&a, Some(int.clone()))));
    assert_eq!(strip_all(&mixed), int);
  }
}

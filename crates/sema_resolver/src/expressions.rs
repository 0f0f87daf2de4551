//! Expressions to semantic results.
//!
//! `evaluate_type` yields what an expression denotes: a value for literals, a
//! member reference for variables and functions, the return type for calls.
//! `evaluate_value` folds constant expressions through the compile-time
//! evaluator.

use std::sync::Arc;

use sema_ast::declarations::{ASTDeclaration, ASTDeclarationKind, ASTFunction};
use sema_ast::expressions::{ASTAccessTarget, ASTBinaryOperator, ASTExpressionKind, ASTLiteral, ASTUnaryOperator};
use sema_ast::types::{ASTType, PrimitiveKind};
use sema_ast::{ASTExpression, DeclRef, Name};
use sema_config::DebugTrace;
use sema_log::trace_dbg;
use sema_type::{
  is_implicitly_convertible, strip_all, strip_wrapper_layers, AbstractType, ConstValue, SemanticResult, TemplateBindings,
  TypeKind, UserTypeKind,
};

use crate::context::{ResolutionContext, ResolutionOptions};
use crate::ctfe;
use crate::properties::static_property;
use crate::resolver::{
  builtin_alias, declaration_to_result, function_reference, lookup_identifier, resolve_member_declarations, resolve_type,
};
use crate::templates::{deduce_from_call, instantiate_member, resolve_template_instance};
use crate::ufcs::resolve_ufcs;

pub fn evaluate_type(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  if let Some(cached) = ctx.cached(expr.id) {
    return cached;
  }

  let result = evaluate_uncached(expr, ctx);
  ctx.memoize(expr.id, &result);
  result
}

/// Constant value of `expr`, `Unknown` when it does not fold.
pub fn evaluate_value(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  match ctfe::evaluate_constant(expr, ctx) {
    Some(value) => SemanticResult::Value(value),
    None => SemanticResult::Unknown,
  }
}

fn evaluate_uncached(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  match &expr.kind {
    ASTExpressionKind::Identifier(name) => {
      let found = SemanticResult::from_candidates(lookup_identifier(name, ctx));
      if found.is_unknown() {
        builtin_alias(name)
      } else {
        found
      }
    },
    ASTExpressionKind::Literal(literal) => literal_value(literal),
    ASTExpressionKind::TemplateInstance(instance) => resolve_template_instance(instance, ctx),
    ASTExpressionKind::MemberAccess { base, member } => evaluate_member_access(base, member, false, ctx),
    ASTExpressionKind::Call { callee, args } => {
      let callee = evaluate_callee(callee, ctx);
      let args: Vec<SemanticResult> = args.iter().map(|arg| evaluate_type(arg, ctx)).collect();
      resolve_call(callee, &args, ctx)
    },
    ASTExpressionKind::Index { base, indices } => {
      let base = evaluate_type(base, ctx);
      index_result(&base, indices, ctx)
    },
    ASTExpressionKind::Slice { base, .. } => match structural(&evaluate_type(base, ctx)).kind() {
      Some(TypeKind::Array { element, .. }) => SemanticResult::array_of((**element).clone()),
      Some(TypeKind::Pointer(target)) => SemanticResult::array_of((**target).clone()),
      _ => SemanticResult::Unknown,
    },
    ASTExpressionKind::New { ty, args } => {
      let args: Vec<SemanticResult> = args.iter().map(|arg| evaluate_type(arg, ctx)).collect();
      resolve_new(ty, &args, ctx)
    },
    ASTExpressionKind::Cast { target, operand } => match target {
      Some(target) => resolve_type(target, ctx),
      None => match structural(&evaluate_type(operand, ctx)) {
        SemanticResult::Type(t) => SemanticResult::Type(t.with_modifier(None)),
        other => other,
      },
    },
    ASTExpressionKind::Unary { op, operand } => {
      let operand = evaluate_type(operand, ctx);
      unary_result(*op, &operand)
    },
    ASTExpressionKind::Binary { op, lhs, rhs } => {
      let lhs = evaluate_type(lhs, ctx);
      if op.is_comparison() || op.is_logical() {
        return SemanticResult::primitive(PrimitiveKind::Bool);
      }
      match op {
        ASTBinaryOperator::Concat | ASTBinaryOperator::Assign => structural(&lhs),
        _ => {
          let rhs = evaluate_type(rhs, ctx);
          arithmetic_result(&lhs, &rhs)
        },
      }
    },
    ASTExpressionKind::Conditional { then, .. } => evaluate_type(then, ctx),
    ASTExpressionKind::Paren(inner) => evaluate_type(inner, ctx),
    ASTExpressionKind::Type(ty) => resolve_type(ty, ctx),
    ASTExpressionKind::This => match enclosing_aggregate(ctx.scope()) {
      Some(aggregate) => declaration_to_result(&aggregate, ctx),
      None => SemanticResult::Unknown,
    },
    ASTExpressionKind::Super => {
      let Some(aggregate) = enclosing_aggregate(ctx.scope()) else {
        return SemanticResult::Unknown;
      };
      match declaration_to_result(&aggregate, ctx).kind() {
        Some(TypeKind::UserDefined(user)) => user.base.as_deref().cloned().unwrap_or(SemanticResult::Unknown),
        _ => SemanticResult::Unknown,
      }
    },
    ASTExpressionKind::ArrayLiteral(elements) => match elements.first() {
      Some(first) => SemanticResult::array_of(structural(&evaluate_type(first, ctx))),
      None => SemanticResult::array_of(SemanticResult::primitive(PrimitiveKind::Void)),
    },
    ASTExpressionKind::AssocArrayLiteral(pairs) => match pairs.first() {
      Some((key, value)) => {
        let key = structural(&evaluate_type(key, ctx));
        let value = structural(&evaluate_type(value, ctx));
        SemanticResult::of(TypeKind::AssocArray {
          value: Box::new(value),
          key: Box::new(key),
        })
      },
      None => SemanticResult::Unknown,
    },
  }
}

/// Type of a value with wrapper and alias layers removed.
fn structural(result: &SemanticResult) -> SemanticResult {
  strip_all(&result.type_of())
}

pub(crate) fn literal_value(literal: &ASTLiteral) -> SemanticResult {
  match literal {
    ASTLiteral::Integer { value, kind } => {
      SemanticResult::value(ConstValue::Int(*value), AbstractType::new(TypeKind::Primitive(*kind)))
    },
    ASTLiteral::Float { value, kind } => {
      SemanticResult::value(ConstValue::Float(*value), AbstractType::new(TypeKind::Primitive(*kind)))
    },
    ASTLiteral::String(text) => SemanticResult::value(
      ConstValue::String(text.to_string()),
      AbstractType::char_string(PrimitiveKind::Char),
    ),
    ASTLiteral::Char(c) => SemanticResult::value(ConstValue::Char(*c), AbstractType::new(TypeKind::Primitive(PrimitiveKind::Char))),
    ASTLiteral::Bool(b) => SemanticResult::value(ConstValue::Bool(*b), AbstractType::new(TypeKind::Primitive(PrimitiveKind::Bool))),
    ASTLiteral::Null => SemanticResult::value(ConstValue::Null, AbstractType::new(TypeKind::Null)),
  }
}

/// Whether `result` denotes a runtime value rather than a type, module or package.
pub fn is_instance(result: &SemanticResult) -> bool {
  match result {
    SemanticResult::Value(_) => true,
    SemanticResult::Type(t) => matches!(
      t.kind,
      TypeKind::Member(_) | TypeKind::ArrayAccess(_) | TypeKind::DelegateCall(_)
    ),
    SemanticResult::Ambiguous(candidates) => candidates.iter().any(is_instance),
    SemanticResult::Unknown => false,
  }
}

/// Resolves an expression in call position. For `base.name` the call-syntax
/// extension is tried before built-in properties, so `s.reverse()` can reach a
/// free `reverse`.
pub fn evaluate_callee(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  match &expr.kind {
    ASTExpressionKind::MemberAccess { base, member } => evaluate_member_access(base, member, true, ctx),
    ASTExpressionKind::Paren(inner) => evaluate_callee(inner, ctx),
    _ => evaluate_type(expr, ctx),
  }
}

fn evaluate_member_access(
  base_expr: &ASTExpression,
  member: &ASTAccessTarget,
  as_callee: bool,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let base = evaluate_type(base_expr, ctx);
  if base.is_unknown() {
    return SemanticResult::Unknown;
  }

  let name = member.name();
  let declared = resolve_member_declarations(&base, name, ctx);
  if !declared.is_unknown() {
    return match member {
      ASTAccessTarget::TemplateInstance(instance) => instantiate_member(declared, instance, ctx),
      ASTAccessTarget::Identifier(_) => declared,
    };
  }

  if as_callee {
    let extended = extension_call(&base, member, ctx);
    if !extended.is_unknown() {
      return extended;
    }
    member_property(&base, name, ctx)
  } else {
    let property = member_property(&base, name, ctx);
    if !property.is_unknown() {
      return property;
    }
    extension_call(&base, member, ctx)
  }
}

fn member_property(
  base: &SemanticResult,
  name: &Name,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  if let Some(length) = constant_length(base, name) {
    return length;
  }
  static_property(&structural(base), name, ctx)
}

fn constant_length(
  base: &SemanticResult,
  name: &Name,
) -> Option<SemanticResult> {
  if name.as_str() != "length" {
    return None;
  }
  let length = base.as_value()?.value.length()?;
  Some(SemanticResult::value(
    ConstValue::Int(length as i64),
    AbstractType::new(TypeKind::Primitive(PrimitiveKind::ULong)),
  ))
}

fn extension_call(
  base: &SemanticResult,
  member: &ASTAccessTarget,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  if matches!(base.kind(), Some(TypeKind::Module(_) | TypeKind::Package(_))) {
    return SemanticResult::Unknown;
  }

  match member {
    ASTAccessTarget::Identifier(name) => SemanticResult::from_candidates(resolve_ufcs(base, Some(name), false, ctx)),
    ASTAccessTarget::TemplateInstance(instance) => {
      let candidates = SemanticResult::from_candidates(resolve_ufcs(base, Some(&instance.name), true, ctx));
      if candidates.is_unknown() {
        return candidates;
      }
      instantiate_member(candidates, instance, ctx)
    },
  }
}

fn index_result(
  base: &SemanticResult,
  indices: &[ASTExpression],
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let element = match structural(base).kind() {
    Some(TypeKind::Array { element, .. }) => (**element).clone(),
    Some(TypeKind::AssocArray { value, .. }) => (**value).clone(),
    Some(TypeKind::Pointer(target)) => (**target).clone(),
    Some(TypeKind::Tuple(items)) => {
      let index = indices
        .first()
        .and_then(|index| evaluate_value(index, ctx).as_value().and_then(|v| v.value.as_int()));
      return match index.and_then(|i| usize::try_from(i).ok()).and_then(|i| items.get(i)) {
        Some(item) => item.clone(),
        None => SemanticResult::Unknown,
      };
    },
    _ => return SemanticResult::Unknown,
  };
  SemanticResult::of(TypeKind::ArrayAccess(Box::new(element)))
}

fn unary_result(
  op: ASTUnaryOperator,
  operand: &SemanticResult,
) -> SemanticResult {
  match op {
    ASTUnaryOperator::Not => SemanticResult::primitive(PrimitiveKind::Bool),
    ASTUnaryOperator::AddressOf => SemanticResult::pointer_to(strip_wrapper_layers(&operand.type_of())),
    ASTUnaryOperator::Dereference => match structural(operand).kind() {
      Some(TypeKind::Pointer(target)) => (**target).clone(),
      _ => SemanticResult::Unknown,
    },
    ASTUnaryOperator::Negate
    | ASTUnaryOperator::Plus
    | ASTUnaryOperator::Complement
    | ASTUnaryOperator::Increment
    | ASTUnaryOperator::Decrement => structural(operand),
  }
}

fn arithmetic_result(
  lhs: &SemanticResult,
  rhs: &SemanticResult,
) -> SemanticResult {
  let lhs = structural(lhs);
  let rhs = structural(rhs);
  match (lhs.kind(), rhs.kind()) {
    (Some(TypeKind::Primitive(a)), Some(TypeKind::Primitive(b))) => SemanticResult::primitive(wider_primitive(*a, *b)),
    _ => lhs,
  }
}

/// Common type of a binary arithmetic operation; integrals promote to at least `int`.
pub(crate) fn wider_primitive(
  a: PrimitiveKind,
  b: PrimitiveKind,
) -> PrimitiveKind {
  if a.is_floating() || b.is_floating() {
    let width = |k: PrimitiveKind| if k.is_floating() { k.size_bits() } else { 0 };
    return if width(a) >= width(b) { a } else { b };
  }

  let wider = if a.size_bits() >= b.size_bits() { a } else { b };
  if wider.size_bits() < PrimitiveKind::Int.size_bits() {
    PrimitiveKind::Int
  } else {
    wider
  }
}

fn enclosing_aggregate(scope: &DeclRef) -> Option<DeclRef> {
  let mut current = Some(scope.clone());
  while let Some(decl) = current {
    if decl.as_aggregate().is_some() {
      return Some(decl);
    }
    current = decl.parent();
  }
  None
}

/// Filters the overloads in `callee` by the argument types and yields the
/// call's result. When nothing fits, the results of every overload are returned.
pub fn resolve_call(
  callee: SemanticResult,
  args: &[SemanticResult],
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let mut accepted = Vec::new();
  let mut fallback = Vec::new();

  for candidate in callee.into_candidates() {
    if ctx.is_cancelled() {
      break;
    }
    match call_candidate(&candidate, args, ctx) {
      Ok(result) => accepted.push(result),
      Err(result) => fallback.push(result),
    }
  }

  if accepted.is_empty() {
    trace_dbg!(ctx.config(), DebugTrace::Resolver, "no overload accepts {} argument(s)", args.len());
    SemanticResult::from_candidates(fallback)
  } else {
    SemanticResult::from_candidates(accepted)
  }
}

/// `Ok` with the call result if `candidate` accepts `args`, `Err` with the
/// best-effort result otherwise.
fn call_candidate(
  candidate: &SemanticResult,
  args: &[SemanticResult],
  ctx: &mut ResolutionContext,
) -> Result<SemanticResult, SemanticResult> {
  let Some(kind) = candidate.kind() else {
    return Err(SemanticResult::Unknown);
  };

  match kind {
    TypeKind::Member(member) => {
      let definition = member.definition.clone();
      let Some(function) = definition.as_function() else {
        return delegate_call(&structural(candidate), args);
      };

      let mut effective: Vec<SemanticResult> = Vec::with_capacity(args.len() + 1);
      if let Some(tag) = candidate.tag() {
        effective.push((*tag.first_argument).clone());
      }
      effective.extend(args.iter().cloned());

      let needs_deduction = !function.template_params.is_empty()
        && member.deduced.is_empty()
        && !ctx.has_option(ResolutionOptions::NO_TEMPLATE_PARAMETER_DEDUCTION);
      let (reference, deduced) = if needs_deduction {
        match deduce_from_call(&definition, function, &effective, ctx) {
          Some(bindings) => (function_reference(&definition, function, bindings.clone(), ctx), bindings),
          None => return Err(call_result(candidate)),
        }
      } else {
        (candidate.clone(), member.deduced.clone())
      };

      if accepts_arguments(&definition, function, &deduced, &effective, ctx) {
        Ok(call_result(&reference))
      } else {
        Err(call_result(&reference))
      }
    },
    TypeKind::UserDefined(user) if matches!(user.kind, UserTypeKind::Struct | UserTypeKind::Class | UserTypeKind::Union) => {
      Ok(candidate.clone())
    },
    TypeKind::Delegate(_) => delegate_call(candidate, args),
    _ => Err(SemanticResult::Unknown),
  }
}

fn delegate_call(
  callee: &SemanticResult,
  args: &[SemanticResult],
) -> Result<SemanticResult, SemanticResult> {
  let Some(TypeKind::Delegate(delegate)) = callee.kind() else {
    return Err(SemanticResult::Unknown);
  };

  let result = SemanticResult::of(TypeKind::DelegateCall(delegate.return_type.clone()));
  let fits = delegate.params.len() == args.len()
    && delegate
      .params
      .iter()
      .zip(args)
      .all(|(param, arg)| is_implicitly_convertible(arg, param));
  if fits {
    Ok(result)
  } else {
    Err(result)
  }
}

/// What calling a function reference yields: its return type, or the constructed type.
fn call_result(reference: &SemanticResult) -> SemanticResult {
  match reference.kind() {
    Some(TypeKind::Member(member)) => member.base.as_deref().cloned().unwrap_or(SemanticResult::Unknown),
    _ => SemanticResult::Unknown,
  }
}

/// Arity and per-argument convertibility check, parameter types resolved with `deduced`.
pub(crate) fn accepts_arguments(
  definition: &DeclRef,
  function: &ASTFunction,
  deduced: &TemplateBindings,
  args: &[SemanticResult],
  ctx: &mut ResolutionContext,
) -> bool {
  let (required, maximum) = function.arity();
  if args.len() < required || maximum.map(|max| args.len() > max).unwrap_or(false) {
    return false;
  }

  let mut frame = ctx.push_with_substitutions(definition.clone(), None, deduced.clone());
  for (i, arg) in args.iter().enumerate() {
    let Some(param) = function.params.get(i).or_else(|| function.params.last()) else {
      return false;
    };
    let Some(var) = param.as_variable() else {
      return false;
    };
    let Some(ty) = &var.ty else {
      continue;
    };

    let param_type = resolve_type(ty, &mut frame);
    let fits = if var.is_variadic {
      is_implicitly_convertible(arg, &param_type)
        || match strip_all(&param_type).kind() {
          Some(TypeKind::Array { element, .. }) => is_implicitly_convertible(arg, element),
          _ => false,
        }
    } else {
      is_implicitly_convertible(arg, &param_type)
    };
    if !fits {
      return false;
    }
  }
  true
}

/// Constructors of an aggregate. An aggregate without one gets a parameterless
/// constructor that is parented to it but never inserted into its scope.
pub fn constructors_of(aggregate: &DeclRef) -> Vec<DeclRef> {
  let explicit: Vec<DeclRef> = aggregate
    .scope()
    .lookup(&Name::new("this"))
    .into_iter()
    .filter(|decl| decl.is_constructor())
    .collect();
  if !explicit.is_empty() {
    return explicit;
  }

  let synthesized = ASTDeclaration::function("this", aggregate.span, ASTFunction::constructor(Vec::new(), None));
  synthesized.set_parent(Arc::downgrade(aggregate));
  vec![synthesized]
}

/// `new T(args)`: constructor references whose base is the constructed type.
pub fn resolve_new(
  ty: &ASTType,
  args: &[SemanticResult],
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let target = resolve_type(ty, ctx);
  let stripped = strip_all(&target);

  let user = match stripped.kind() {
    Some(TypeKind::UserDefined(user))
      if matches!(user.kind, UserTypeKind::Class | UserTypeKind::Struct | UserTypeKind::Union) =>
    {
      user.clone()
    },
    Some(TypeKind::Array { .. }) => return stripped,
    Some(_) => return SemanticResult::pointer_to(stripped),
    None => return SemanticResult::Unknown,
  };

  let references: Vec<(DeclRef, SemanticResult)> = constructors_of(&user.definition)
    .into_iter()
    .map(|ctor| {
      let reference = SemanticResult::member(ctor.clone(), Some(stripped.clone()));
      (ctor, reference)
    })
    .collect();

  let mut accepted = Vec::new();
  for (ctor, reference) in &references {
    if let ASTDeclarationKind::Function(function) = &ctor.kind {
      if accepts_arguments(ctor, function, &user.deduced, args, ctx) {
        accepted.push(reference.clone());
      }
    }
  }

  if accepted.is_empty() {
    SemanticResult::from_candidates(references.into_iter().map(|(_, reference)| reference).collect())
  } else {
    SemanticResult::from_candidates(accepted)
  }
}

#[cfg(test)]
mod tests {
  use sema_ast::declarations::{ASTAggregate, AggregateKind};
  use sema_ast::expressions::ASTBinaryOperator;
  use sema_ast::{ParseCacheView, Span};
  use sema_config::SemaConfig;

  use super::*;

  fn context(scope: DeclRef) -> ResolutionContext {
    ResolutionContext::new(scope, ParseCacheView::default(), Arc::new(SemaConfig::silent()))
  }

  #[test]
  fn test_literal_values_carry_types() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let mut ctx = context(module);

    let string = evaluate_type(&ASTExpression::string("abc"), &mut ctx);
    assert_eq!(string.type_of(), SemanticResult::string_type());

    let sum = ASTExpression::binary(ASTBinaryOperator::Add, ASTExpression::int(1), ASTExpression::float(2.0));
    assert_eq!(evaluate_type(&sum, &mut ctx), SemanticResult::primitive(PrimitiveKind::Double));

    let compare = ASTExpression::binary(ASTBinaryOperator::Less, ASTExpression::int(1), ASTExpression::int(2));
    assert_eq!(evaluate_type(&compare, &mut ctx), SemanticResult::primitive(PrimitiveKind::Bool));
  }

  #[test]
  fn test_wider_primitive_promotes() {
    assert_eq!(wider_primitive(PrimitiveKind::Byte, PrimitiveKind::Short), PrimitiveKind::Int);
    assert_eq!(wider_primitive(PrimitiveKind::Long, PrimitiveKind::Int), PrimitiveKind::Long);
    assert_eq!(wider_primitive(PrimitiveKind::Float, PrimitiveKind::Long), PrimitiveKind::Float);
    assert_eq!(wider_primitive(PrimitiveKind::Float, PrimitiveKind::Real), PrimitiveKind::Real);
  }

  #[test]
  fn test_new_synthesizes_default_constructor() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let class = ASTDeclaration::aggregate("Widget", Span::new(0, 20), ASTAggregate::new(AggregateKind::Class));
    module.scope().add(class.clone());

    let mut ctx = context(module);
    let created = evaluate_type(&ASTExpression::new_instance(ASTType::identifier("Widget"), vec![]), &mut ctx);

    let Some(TypeKind::Member(member)) = created.kind() else {
      panic!("expected a constructor reference, got {}", created);
    };
    assert!(member.is_constructor());
    assert!(class.scope().lookup(&Name::new("this")).is_empty());
    assert_eq!(strip_wrapper_layers(&created).definition().map(|d| d.name.to_string()), Some("Widget".to_string()));
  }

  #[test]
  fn test_call_filters_overloads_by_argument() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let takes_int = ASTDeclaration::function(
      "f",
      Span::new(0, 10),
      ASTFunction::new(
        vec![ASTDeclaration::parameter("a", ASTType::identifier("int"), None)],
        Some(ASTType::identifier("int")),
        None,
      ),
    );
    let takes_string = ASTDeclaration::function(
      "f",
      Span::new(12, 20),
      ASTFunction::new(
        vec![ASTDeclaration::parameter("a", ASTType::identifier("string"), None)],
        Some(ASTType::identifier("bool")),
        None,
      ),
    );
    module.scope().add(takes_int);
    module.scope().add(takes_string);

    let mut ctx = context(module);
    let call = ASTExpression::call(ASTExpression::identifier("f"), vec![ASTExpression::string("x")]);
    assert_eq!(evaluate_type(&call, &mut ctx), SemanticResult::primitive(PrimitiveKind::Bool));

    let unmatched = ASTExpression::call(ASTExpression::identifier("f"), vec![ASTExpression::float(1.5)]);
    assert_eq!(evaluate_type(&unmatched, &mut ctx).candidates().len(), 2);
  }
}

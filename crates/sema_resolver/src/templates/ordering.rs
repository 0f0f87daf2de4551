//! Partial ordering of template overloads that all accepted the same arguments.

use sema_ast::declarations::{ASTAggregate, ASTDeclaration, ASTTemplateParameter, AggregateKind};
use sema_ast::{DeclRef, Span};
use sema_config::DebugTrace;
use sema_log::trace_dbg;
use sema_type::{SemanticResult, TemplateBindings, TypeKind, UserDefinedType, UserTypeKind};

use crate::context::ResolutionContext;
use crate::resolver::resolve_type;
use crate::templates::deduction::Deduction;

/// Keeps the most specialized of `candidates`. Returns two results when the
/// final comparison is a tie.
///
/// This is a single champion scan, not a full partial order: a tie before the
/// last candidate keeps the current champion.
pub fn most_specialized(
  candidates: Vec<SemanticResult>,
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  if candidates.len() < 2 {
    return candidates;
  }

  let last = candidates.len() - 1;
  let mut champion = 0;
  for i in 1..=last {
    match more_specialized_of(&candidates[champion], &candidates[i], ctx) {
      Some(true) => {},
      Some(false) => champion = i,
      None if i == last => {
        trace_dbg!(ctx.config(), DebugTrace::Ordering, "no order between candidates {} and {}", champion, i);
        return vec![candidates[champion].clone(), candidates[i].clone()];
      },
      None => {},
    }
  }

  trace_dbg!(ctx.config(), DebugTrace::Ordering, "candidate {} of {} wins", champion, candidates.len());
  vec![candidates[champion].clone()]
}

/// `Some(true)` if `a` wins, `Some(false)` if `b` wins, `None` without a strict order.
fn more_specialized_of(
  a: &SemanticResult,
  b: &SemanticResult,
  ctx: &mut ResolutionContext,
) -> Option<bool> {
  let a_over_b = is_more_specialized(a, b, ctx);
  let b_over_a = is_more_specialized(b, a, ctx);
  match (a_over_b, b_over_a) {
    (true, false) => Some(true),
    (false, true) => Some(false),
    _ => None,
  }
}

fn is_more_specialized(
  r1: &SemanticResult,
  r2: &SemanticResult,
  ctx: &mut ResolutionContext,
) -> bool {
  let (Some(d1), Some(d2)) = (r1.definition().cloned(), r2.definition().cloned()) else {
    return false;
  };

  let params1 = d1.template_params().to_vec();
  let params2 = d2.template_params().to_vec();
  if params1.is_empty() || params2.is_empty() {
    return false;
  }

  params1.iter().zip(params2.iter()).all(|(t1, t2)| {
    t1.is_type_parameter() && t2.is_type_parameter() && param_more_specialized(&d1, t1, &d2, t2, ctx)
  })
}

/// Whether `t1` is at least as specialized as `t2`: `t1`'s pattern, with
/// every parameter of `d1` replaced by an opaque class, must satisfy `t2`.
fn param_more_specialized(
  d1: &DeclRef,
  t1: &ASTTemplateParameter,
  d2: &DeclRef,
  t2: &ASTTemplateParameter,
  ctx: &mut ResolutionContext,
) -> bool {
  let Some(pattern) = t1.type_specialization() else {
    return false;
  };
  if !t2.has_specialization() {
    return true;
  }

  let placeholder = placeholder_type();
  let substitutions: TemplateBindings = d1
    .template_params()
    .iter()
    .map(|p| (p.name.clone(), placeholder.clone()))
    .collect();

  let resolved = {
    let mut frame = ctx.push_with_substitutions(d1.clone(), None, substitutions);
    resolve_type(pattern, &mut frame)
  };
  if resolved.is_unknown() {
    return true;
  }

  let accepted = Deduction::new(d2.clone(), ctx).handle(t2, Some(&resolved));
  trace_dbg!(
    ctx.config(),
    DebugTrace::Ordering,
    "{}.{} {} {}.{}",
    d1.name,
    t1.name,
    if accepted { "covers" } else { "does not cover" },
    d2.name,
    t2.name
  );
  accepted
}

fn placeholder_type() -> SemanticResult {
  let definition = ASTDeclaration::aggregate("X", Span::default(), ASTAggregate::new(AggregateKind::Class));
  SemanticResult::of(TypeKind::UserDefined(UserDefinedType {
    kind: UserTypeKind::Class,
    definition,
    base: None,
    interfaces: Vec::new(),
    deduced: TemplateBindings::new(),
  }))
}

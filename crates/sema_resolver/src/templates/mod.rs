//! Template instantiation: explicit `Name!(args)` syntax and the overload
//! selection among several templates of the same name.

pub mod deduction;
pub mod ordering;

use sema_ast::declarations::ASTDeclarationKind;
use sema_ast::types::{ASTTemplateArgument, ASTTemplateInstance};
use sema_ast::{Name, Span};
use sema_config::DebugTrace;
use sema_diagnostics::message::DiagnosticMessage;
use sema_log::trace_dbg;
use sema_type::{strip_aliases, SemanticResult, TypeKind};

use crate::context::{ResolutionContext, ResolutionOptions};
use crate::ctfe;
use crate::expressions::{evaluate_type, evaluate_value};
use crate::resolver::{aggregate_type, function_reference, lookup_identifier, resolve_member_declarations, resolve_type};

pub use deduction::{deduce_from_call, deduce_template, Deduction};
pub use ordering::most_specialized;

/// Resolves `Name!(args)` in the current frame.
pub fn resolve_template_instance(
  instance: &ASTTemplateInstance,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  if let Some(cached) = ctx.cached(instance.id) {
    return cached;
  }

  let overloads = template_overloads(instance, ctx);
  let result = if overloads.is_empty() {
    SemanticResult::Unknown
  } else if ctx.has_option(ResolutionOptions::NO_TEMPLATE_PARAMETER_DEDUCTION) {
    SemanticResult::from_candidates(overloads)
  } else {
    let args = resolve_template_arguments(&instance.args, ctx);
    instantiate(overloads, &args, instance.span, &instance.name, ctx)
  };

  ctx.memoize(instance.id, &result);
  result
}

/// Instantiates already looked-up candidates, as for `obj.member!(args)`.
pub fn instantiate_member(
  candidates: SemanticResult,
  instance: &ASTTemplateInstance,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  if ctx.has_option(ResolutionOptions::NO_TEMPLATE_PARAMETER_DEDUCTION) {
    return candidates;
  }
  let args = resolve_template_arguments(&instance.args, ctx);
  instantiate(candidates.into_candidates(), &args, instance.span, &instance.name, ctx)
}

fn template_overloads(
  instance: &ASTTemplateInstance,
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  match &instance.inner {
    Some(inner) => {
      let base = resolve_type(inner, ctx);
      resolve_member_declarations(&base, &instance.name, ctx).into_candidates()
    },
    None => lookup_identifier(&instance.name, ctx),
  }
}

/// Arguments of an instance. A type argument naming a manifest constant
/// stands for its value.
pub fn resolve_template_arguments(
  args: &[ASTTemplateArgument],
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  args
    .iter()
    .map(|arg| match arg {
      ASTTemplateArgument::Type(ty) => {
        let resolved = resolve_type(ty, ctx);
        as_constant(resolved, ctx)
      },
      ASTTemplateArgument::Value(expr) => {
        let value = evaluate_value(expr, ctx);
        if value.is_unknown() { evaluate_type(expr, ctx) } else { value }
      },
    })
    .collect()
}

fn as_constant(
  resolved: SemanticResult,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let Some(TypeKind::Member(member)) = resolved.kind() else {
    return resolved;
  };
  let definition = member.definition.clone();
  let Some(initializer) = definition
    .as_variable()
    .filter(|_| definition.attributes.is_manifest_constant())
    .and_then(|var| var.initializer.clone())
  else {
    return resolved;
  };

  let value = {
    let mut frame = crate::resolver::enter_declaration_scope(&definition, ctx);
    ctfe::evaluate_constant(&initializer, &mut frame)
  };
  match value {
    Some(value) => SemanticResult::Value(value),
    None => resolved,
  }
}

/// Deduces every candidate against `args` and keeps the most specialized survivor.
fn instantiate(
  candidates: Vec<SemanticResult>,
  args: &[SemanticResult],
  span: Span,
  name: &Name,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let mut survivors = Vec::new();
  let mut templates = 0usize;
  let mut blamed = None;

  for candidate in candidates {
    if ctx.is_cancelled() {
      return SemanticResult::Unknown;
    }

    let Some(definition) = strip_aliases(&candidate).definition().cloned() else {
      continue;
    };
    if !definition.is_template() {
      if args.is_empty() {
        survivors.push(candidate);
      }
      continue;
    }
    templates += 1;

    match deduction::deduce_or_blame(&definition, args, ctx) {
      Ok(bindings) => {
        let instance = match &definition.kind {
          ASTDeclarationKind::Function(function) => function_reference(&definition, function, bindings, ctx),
          ASTDeclarationKind::Aggregate(aggregate) => aggregate_type(&definition, aggregate, bindings, ctx),
          _ => candidate.clone(),
        };
        let instance = match candidate.tag() {
          Some(tag) => instance.with_tag((*tag.first_argument).clone()),
          None => instance,
        };
        survivors.push(instance);
      },
      Err(parameter) => {
        trace_dbg!(
          ctx.config(),
          DebugTrace::Deduction,
          "{} rejected at parameter {}",
          definition.name,
          parameter
        );
        blamed = Some(parameter);
      },
    }
  }

  if survivors.is_empty() {
    if let (1, Some(parameter)) = (templates, blamed) {
      ctx.report(DiagnosticMessage::DeductionFailed {
        template: name.to_string(),
        parameter: parameter.to_string(),
        span,
      });
    }
    return SemanticResult::Unknown;
  }
  if survivors.len() == 1 {
    return SemanticResult::from_candidates(survivors);
  }

  let best = most_specialized(survivors, ctx);
  if best.len() > 1 {
    let candidates = best.iter().filter_map(|r| r.definition()).map(|d| d.span).collect();
    trace_dbg!(ctx.config(), DebugTrace::Ordering, "{} specializations of {} tie", best.len(), name);
    ctx.report(DiagnosticMessage::AmbiguousSpecialization {
      template: name.to_string(),
      candidates,
      span,
    });
  }
  SemanticResult::from_candidates(best)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use sema_ast::declarations::{ASTAggregate, ASTDeclaration, ASTTemplateParameter, AggregateKind};
  use sema_ast::types::{ASTType, PrimitiveKind};
  use sema_ast::{ASTExpression, ParseCacheView};
  use sema_config::SemaConfig;

  use super::*;

  fn context(scope: sema_ast::DeclRef) -> ResolutionContext {
    ResolutionContext::new(scope, ParseCacheView::default(), Arc::new(SemaConfig::silent()))
  }

  fn add_class(
    module: &sema_ast::DeclRef,
    start: u32,
    params: Vec<Arc<ASTTemplateParameter>>,
  ) -> sema_ast::DeclRef {
    let class = ASTDeclaration::aggregate(
      "C",
      Span::new(start, start + 10),
      ASTAggregate::new(AggregateKind::Class).with_template_params(params),
    );
    module.scope().add(class.clone());
    class
  }

  #[test]
  fn test_specialized_overload_wins() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    add_class(&module, 0, vec![ASTTemplateParameter::type_param("T")]);
    let specialized = add_class(
      &module,
      20,
      vec![ASTTemplateParameter::specialized("T", ASTType::array(ASTType::identifier("T")))],
    );
    let mut ctx = context(module);

    let ty = ASTType::template_instance(
      "C",
      vec![ASTTemplateArgument::Type(ASTType::array(ASTType::primitive(PrimitiveKind::Int)))],
    );
    let result = resolve_type(&ty, &mut ctx);
    assert!(Arc::ptr_eq(result.definition().expect("one instance"), &specialized));
    assert_eq!(
      result.as_type().and_then(|t| t.deduced()).and_then(|d| d.get(&Name::new("T")).cloned()),
      Some(SemanticResult::primitive(PrimitiveKind::Int))
    );
    assert!(ctx.diagnostics().is_empty());
  }

  #[test]
  fn test_single_failed_template_reports_parameter() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    add_class(
      &module,
      0,
      vec![ASTTemplateParameter::specialized("T", ASTType::array(ASTType::identifier("T")))],
    );
    let mut ctx = context(module);

    let ty = ASTType::template_instance("C", vec![ASTTemplateArgument::Type(ASTType::primitive(PrimitiveKind::Int))]);
    assert!(resolve_type(&ty, &mut ctx).is_unknown());
    let diagnostic = ctx.diagnostics().first().expect("deduction failure is reported");
    assert_eq!(diagnostic.error_code, "R0003");
    assert!(diagnostic.message.contains("'T'"));
  }

  #[test]
  fn test_value_argument() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    add_class(&module, 0, vec![ASTTemplateParameter::value_param("N", ASTType::primitive(PrimitiveKind::Int))]);
    let mut ctx = context(module);

    let ty = ASTType::template_instance(
      "C",
      vec![ASTTemplateArgument::Value(ASTExpression::binary(
        sema_ast::expressions::ASTBinaryOperator::Add,
        ASTExpression::int(2),
        ASTExpression::int(3),
      ))],
    );
    let result = resolve_type(&ty, &mut ctx);
    let bound = result.as_type().and_then(|t| t.deduced()).and_then(|d| d.get(&Name::new("N")).cloned());
    assert_eq!(bound.and_then(|b| b.as_value().and_then(|v| v.value.as_int())), Some(5));
  }
}

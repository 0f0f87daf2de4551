//! Uniform function call syntax: `a.f(b)` may call a free function `f(a, b)`.

use std::collections::HashSet;

use sema_ast::declarations::{ASTDeclarationKind, AggregateKind};
use sema_ast::{DeclRef, Name, NodeId};
use sema_config::DebugTrace;
use sema_log::trace_dbg;
use sema_type::{is_implicitly_convertible, strip_aliases, SemanticResult};

use crate::context::ResolutionContext;
use crate::resolver::{declaration_to_result, imported_modules, is_visible, resolve_type};

/// Free functions reachable from the current frame whose first parameter
/// accepts `first_argument`, tagged with it. `None` lists every name, as
/// completion does.
///
/// Templated functions are matched like plain ones, their parameters left
/// unbound. `template` aggregates are only offered with explicit template
/// syntax or when listing. Aliases are followed to the function or aggregate
/// they name.
pub fn resolve_ufcs(
  first_argument: &SemanticResult,
  name: Option<&Name>,
  template_syntax: bool,
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  if first_argument.is_unknown() {
    return Vec::new();
  }

  let mut accepted = Vec::new();
  for candidate in free_functions(name, ctx) {
    if ctx.is_cancelled() {
      break;
    }
    if is_template_aggregate(&candidate) {
      if template_syntax || name.is_none() {
        accepted.push(declaration_to_result(&candidate, ctx).with_tag(first_argument.clone()));
      }
    } else if candidate.is_alias() {
      accepted.extend(alias_targets(&candidate, first_argument, ctx));
    } else if accepts_first_argument(&candidate, first_argument, ctx) {
      trace_dbg!(ctx.config(), DebugTrace::Ufcs, "{} accepts {}", candidate.name, first_argument);
      accepted.push(declaration_to_result(&candidate, ctx).with_tag(first_argument.clone()));
    }
  }
  accepted
}

fn is_template_aggregate(decl: &DeclRef) -> bool {
  matches!(decl.as_aggregate(), Some(a) if a.kind == AggregateKind::Template)
}

/// What an alias names, kept if it is a function accepting `first_argument`
/// or an aggregate.
fn alias_targets(
  alias: &DeclRef,
  first_argument: &SemanticResult,
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  let target = strip_aliases(&declaration_to_result(alias, ctx));
  let mut accepted = Vec::new();
  for resolved in target.into_candidates() {
    let Some(definition) = resolved.definition().cloned() else {
      continue;
    };
    let keep = match &definition.kind {
      ASTDeclarationKind::Function(_) => accepts_first_argument(&definition, first_argument, ctx),
      ASTDeclarationKind::Aggregate(_) => true,
      _ => false,
    };
    if keep {
      trace_dbg!(ctx.config(), DebugTrace::Ufcs, "alias {} accepts {}", alias.name, first_argument);
      accepted.push(resolved.with_tag(first_argument.clone()));
    }
  }
  accepted
}

fn accepts_first_argument(
  candidate: &DeclRef,
  first_argument: &SemanticResult,
  ctx: &mut ResolutionContext,
) -> bool {
  let Some(first) = candidate.as_function().and_then(|f| f.params.first()) else {
    return false;
  };
  let Some(ty) = first.as_variable().and_then(|v| v.ty.as_ref()) else {
    return false;
  };

  let expected = {
    let mut frame = ctx.push(candidate.clone(), None);
    resolve_type(ty, &mut frame)
  };
  !expected.is_unknown() && is_implicitly_convertible(first_argument, &expected)
}

/// Functions, aliases and `template` aggregates visible from the frame,
/// innermost scope first, without duplicates.
fn free_functions(
  name: Option<&Name>,
  ctx: &ResolutionContext,
) -> Vec<DeclRef> {
  let matches = |decl: &DeclRef| {
    (decl.as_function().is_some() || decl.is_alias() || is_template_aggregate(decl))
      && name.map_or(true, |n| &decl.name == n)
  };
  let mut seen: HashSet<NodeId> = HashSet::new();
  let mut out = Vec::new();
  let mut push = |decl: DeclRef, out: &mut Vec<DeclRef>| {
    if seen.insert(decl.id) {
      out.push(decl);
    }
  };

  let mut location = ctx.location();
  let mut current = Some(ctx.scope().clone());
  while let Some(decl) = current {
    if let Some(pos) = location {
      for block in decl.blocks_at(pos) {
        for local in block.scope().children().into_iter().filter(|d| matches(d) && d.span.start <= pos) {
          push(local, &mut out);
        }
      }
    }

    if decl.is_module() {
      for member in decl.scope().children().into_iter().filter(|d| matches(d)) {
        push(member, &mut out);
      }
      let mut visited = HashSet::from([decl.id]);
      for module in imported_modules(&decl, ctx, &mut visited) {
        for member in module.scope().children().into_iter().filter(|d| matches(d) && is_visible(d, ctx)) {
          push(member, &mut out);
        }
      }
      break;
    }

    location = Some(decl.span.start);
    current = decl.parent();
  }
  out
}

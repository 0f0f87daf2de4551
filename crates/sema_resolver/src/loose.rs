//! Loose resolution: a ladder of progressively weaker strategies an editor
//! uses when the strict result is `Unknown`.
//!
//! 1. Normal resolution.
//! 2. Calls reduced to their callee, without template deduction or alias resolution.
//! 3. Raw search for module-level declarations of every parsed module, ignoring visibility.
//!
//! Memoized results are dropped before each tier.

use std::fmt;

use sema_ast::expressions::ASTExpressionKind;
use sema_ast::{ASTExpression, Name};
use sema_config::DebugTrace;
use sema_diagnostics::message::DiagnosticMessage;
use sema_log::{log_dbg, trace_dbg};
use sema_type::SemanticResult;

use crate::context::{ResolutionContext, ResolutionOptions};
use crate::expressions::evaluate_type;
use crate::resolver::declaration_to_result;
use crate::search::search_module_members;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LooseTier {
  Normal = 1,
  NoDeduction = 2,
  RawLookup = 3,
}

impl fmt::Display for LooseTier {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{}", *self as u8)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LooseResolution {
  pub result: SemanticResult,
  /// Tier that produced `result`; `None` when every tier came back empty.
  pub tier: Option<LooseTier>,
}

impl LooseResolution {
  fn found(
    result: SemanticResult,
    tier: LooseTier,
  ) -> Self {
    Self { result, tier: Some(tier) }
  }

  fn nothing() -> Self {
    Self {
      result: SemanticResult::Unknown,
      tier: None,
    }
  }
}

pub fn resolve_type_loosely(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> LooseResolution {
  let depth = ctx.depth();
  let resolution = run_ladder(expr, ctx);
  debug_assert_eq!(ctx.depth(), depth);

  if resolution.tier.is_none() && !ctx.is_cancelled() {
    let name = innermost_name(expr).map(|n| n.to_string()).unwrap_or_else(|| expr.to_string());
    ctx.report(DiagnosticMessage::UnresolvedIdentifier { name, span: expr.span });
  }
  resolution
}

fn run_ladder(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> LooseResolution {
  ctx.clear_caches();
  let normal = evaluate_type(expr, ctx);
  if !normal.is_unknown() {
    return LooseResolution::found(normal, LooseTier::Normal);
  }
  if ctx.is_cancelled() {
    return LooseResolution::nothing();
  }

  trace_dbg!(ctx.config(), DebugTrace::Loose, "tier {} failed for '{}'", LooseTier::Normal, expr);
  ctx.clear_caches();
  let callee = reduce_to_callee(expr);
  let relaxed = ctx.with_options(
    ResolutionOptions::NO_TEMPLATE_PARAMETER_DEDUCTION | ResolutionOptions::DONT_RESOLVE_ALIASES,
    |ctx| evaluate_type(callee, ctx),
  );
  if !relaxed.is_unknown() {
    return LooseResolution::found(relaxed, LooseTier::NoDeduction);
  }
  if ctx.is_cancelled() {
    return LooseResolution::nothing();
  }

  trace_dbg!(ctx.config(), DebugTrace::Loose, "tier {} failed for '{}'", LooseTier::NoDeduction, expr);
  ctx.clear_caches();
  let Some(name) = innermost_name(expr) else {
    return LooseResolution::nothing();
  };
  log_dbg!(ctx.config(), "falling back to a raw lookup of '{}'", name);
  let matches = raw_lookup(name, ctx);
  if matches.is_empty() {
    trace_dbg!(ctx.config(), DebugTrace::Loose, "no declaration named '{}' anywhere", name);
    return LooseResolution::nothing();
  }

  trace_dbg!(ctx.config(), DebugTrace::Loose, "tier {} found {} match(es) for '{}'", LooseTier::RawLookup, matches.len(), name);
  LooseResolution::found(SemanticResult::Ambiguous(matches), LooseTier::RawLookup)
}

/// `a.f(x)(y)` becomes `a.f`.
fn reduce_to_callee(expr: &ASTExpression) -> &ASTExpression {
  match &expr.kind {
    ASTExpressionKind::Call { callee, .. } => reduce_to_callee(callee),
    _ => expr,
  }
}

/// The name a raw lookup should search for.
fn innermost_name(expr: &ASTExpression) -> Option<&Name> {
  match &expr.kind {
    ASTExpressionKind::Identifier(name) => Some(name),
    ASTExpressionKind::MemberAccess { member, .. } => Some(member.name()),
    ASTExpressionKind::Call { callee, .. } => innermost_name(callee),
    ASTExpressionKind::TemplateInstance(instance) => Some(&instance.name),
    ASTExpressionKind::Paren(inner) => innermost_name(inner),
    ASTExpressionKind::New { ty, .. } => ty.identifier_name(),
    ASTExpressionKind::Type(ty) => ty.identifier_name(),
    _ => None,
  }
}

fn raw_lookup(
  name: &Name,
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  let module = ctx.scope().node_root();
  let found = search_module_members(name, &module, ctx.cache());

  ctx.with_options(ResolutionOptions::IGNORE_ALL_PROTECTION_ATTRIBUTES, |ctx| {
    let mut out = Vec::with_capacity(found.len());
    for decl in found {
      if ctx.is_cancelled() {
        break;
      }
      out.push(declaration_to_result(&decl, ctx));
    }
    out
  })
}

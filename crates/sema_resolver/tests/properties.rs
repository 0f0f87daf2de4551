mod common;

use proptest::prelude::*;
use sema_ast::declarations::{ASTAggregate, ASTDeclaration, AggregateKind};
use sema_ast::expressions::ASTBinaryOperator;
use sema_ast::{ASTExpression, DeclRef, Span};
use sema_resolver::{evaluate_type, resolve_type_loosely, CancellationToken, ResolutionContext};

fn fixture() -> (DeclRef, sema_ast::ParseCacheView) {
  let library = common::module("lib.math");
  library
    .scope()
    .add(common::function("square", 0, vec![("v", common::int())], common::int()));

  let app = common::module_importing("app", &["lib.math"]);
  app.scope().add(common::variable("x", common::int(), 0));
  app
    .scope()
    .add(common::function("f", 10, vec![("a", common::int())], common::int()));
  app.scope().add(ASTDeclaration::aggregate(
    "Widget",
    Span::new(30, 60),
    ASTAggregate::new(AggregateKind::Class),
  ));

  let cache = common::cache_of(&[&library, &app]);
  (app, cache)
}

fn leaf() -> impl Strategy<Value = ASTExpression> {
  prop_oneof![
    prop::sample::select(vec!["x", "f", "Widget", "missing", "lib", "square"]).prop_map(ASTExpression::identifier),
    (0i64..100).prop_map(ASTExpression::int),
  ]
}

/// Arbitrary nestings of calls, member accesses, indexing and additions.
fn expression() -> impl Strategy<Value = ASTExpression> {
  leaf().prop_recursive(4, 24, 3, |inner| {
    prop_oneof![
      (inner.clone(), prop::collection::vec(inner.clone(), 0..3))
        .prop_map(|(callee, args)| ASTExpression::call(callee, args)),
      (
        inner.clone(),
        prop::sample::select(vec!["length", "sizeof", "math", "square", "field", "init"])
      )
        .prop_map(|(base, name)| ASTExpression::member(base, name)),
      (inner.clone(), inner.clone()).prop_map(|(l, r)| ASTExpression::binary(ASTBinaryOperator::Add, l, r)),
      (inner.clone(), inner).prop_map(|(base, index)| ASTExpression::index(base, vec![index])),
    ]
  })
}

fn context() -> ResolutionContext {
  let (app, cache) = fixture();
  common::context_in(app, cache)
}

fn unresolved_reports(ctx: &ResolutionContext) -> usize {
  ctx.diagnostics().iter().filter(|d| d.error_code == "R0001").count()
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  /// Every frame pushed while evaluating is popped again
  #[test]
  fn evaluation_leaves_stack_balanced(expr in expression()) {
    let mut ctx = context();
    let _ = evaluate_type(&expr, &mut ctx);
    prop_assert_eq!(ctx.depth(), 0);
  }

  #[test]
  fn loose_resolution_leaves_stack_balanced(expr in expression()) {
    let mut ctx = context();
    let _ = resolve_type_loosely(&expr, &mut ctx);
    prop_assert_eq!(ctx.depth(), 0);
    prop_assert!(unresolved_reports(&ctx) <= 1);
  }

  /// A cancelled request unwinds cleanly and reports nothing
  #[test]
  fn cancelled_resolution_leaves_stack_balanced(expr in expression()) {
    let token = CancellationToken::new();
    token.cancel();
    let mut ctx = context().with_cancellation(token);

    let _ = resolve_type_loosely(&expr, &mut ctx);
    prop_assert_eq!(ctx.depth(), 0);
    prop_assert_eq!(unresolved_reports(&ctx), 0);
  }

  /// Resolving the same expression twice gives the same answer
  #[test]
  fn evaluation_is_deterministic(expr in expression()) {
    let mut ctx = context();
    let first = evaluate_type(&expr, &mut ctx);
    ctx.clear_caches();
    let second = evaluate_type(&expr, &mut ctx);
    prop_assert_eq!(first, second);
  }
}

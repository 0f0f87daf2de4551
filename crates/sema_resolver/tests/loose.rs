mod common;

use sema_ast::types::ASTType;
use sema_ast::{ASTExpression, Span};
use sema_resolver::dump::loose_to_json;
use sema_resolver::{resolve_type_loosely, LooseTier, SemanticResult};

#[test]
fn raw_lookup_finds_callee_in_unimported_module() {
  let library = common::module("lib.util");
  library
    .scope()
    .add(common::function("helper", 0, vec![("x", common::int())], common::int()));
  let app = common::module("app.main");
  let cache = common::cache_of(&[&library, &app]);
  let mut ctx = common::context_in(app, cache);

  let call = ASTExpression::call(
    ASTExpression::identifier("helper"),
    vec![ASTExpression::identifier("nowhere")],
  )
  .at(Span::new(0, 17));
  let resolution = resolve_type_loosely(&call, &mut ctx);

  assert_eq!(resolution.tier, Some(LooseTier::RawLookup));
  let SemanticResult::Ambiguous(matches) = &resolution.result else {
    panic!("raw lookup returns every match, got {}", resolution.result);
  };
  assert_eq!(matches.len(), 1);
  assert_eq!(
    matches[0].definition().map(|d| d.qualified_name()),
    Some("lib.util.helper".to_string())
  );
  assert!(ctx.diagnostics().is_empty());
  assert_eq!(loose_to_json(&resolution)["tier"], 3);
}

#[test]
fn raw_lookup_ignores_protection() {
  let library = common::module("lib.util");
  library.scope().add(sema_ast::declarations::ASTDeclaration::new(
    "hidden",
    Span::new(0, 10),
    sema_ast::declarations::ASTDeclarationKind::Variable(sema_ast::declarations::ASTVariable {
      ty: Some(common::int()),
      initializer: None,
      is_alias: false,
      is_variadic: false,
    }),
    sema_ast::metadata::DeclAttributes::PRIVATE,
  ));
  let app = common::module_importing("app", &["lib.util"]);
  let cache = common::cache_of(&[&library, &app]);
  let mut ctx = common::context_in(app, cache);

  let resolution = resolve_type_loosely(&ASTExpression::identifier("hidden"), &mut ctx);
  assert_eq!(resolution.tier, Some(LooseTier::RawLookup));
  assert_eq!(resolution.result.candidates().len(), 1);
}

#[test]
fn unresolvable_new_is_reported_once() {
  let app = common::module("app");
  let mut ctx = common::context(app);

  let created = ASTExpression::new_instance(ASTType::identifier("Gadget"), vec![]).at(Span::new(4, 16));
  let resolution = resolve_type_loosely(&created, &mut ctx);

  assert!(resolution.result.is_unknown());
  assert_eq!(resolution.tier, None);
  assert_eq!(ctx.diagnostics().len(), 1);
  assert!(ctx.diagnostics()[0].message.contains("'Gadget'"));
  assert_eq!(ctx.depth(), 0);
}

#[test]
fn raw_lookup_ignores_declarations_nested_in_other_modules() {
  let library = common::module("lib.util");
  library
    .scope()
    .add(common::function("helper", 0, vec![("value", common::int())], common::int()));
  let app = common::module("app.main");
  let cache = common::cache_of(&[&library, &app]);
  let mut ctx = common::context_in(app, cache);

  let resolution = resolve_type_loosely(&ASTExpression::identifier("value").at(Span::new(3, 8)), &mut ctx);
  assert!(resolution.result.is_unknown());
  assert_eq!(resolution.tier, None);
  assert_eq!(ctx.diagnostics().len(), 1);
}

mod common;

use std::sync::Arc;

use sema_ast::declarations::{ASTDeclaration, ASTDeclarationKind, ASTVariable};
use sema_ast::metadata::DeclAttributes;
use sema_ast::types::{ASTType, PrimitiveKind};
use sema_ast::{ASTExpression, Name, Span};
use sema_resolver::{evaluate_type, lookup_identifier, resolve_type, SemanticResult};
use sema_type::strip_aliases;

#[test]
fn inner_declaration_shadows_outer() {
  let outer = common::variable("x", common::int(), 12);
  let inner = common::variable("x", common::long(), 22);
  let main = common::function_with_body(
    "main",
    10,
    100,
    vec![
      common::local(outer.clone()),
      common::block(20, 90, vec![common::local(inner.clone())]),
    ],
  );
  let module = common::module("app");
  module.scope().add(main.clone());

  let mut ctx = common::context_at(main.clone(), 50);
  let found = lookup_identifier(&Name::new("x"), &mut ctx);
  assert_eq!(found.len(), 1);
  assert!(Arc::ptr_eq(found[0].definition().expect("a variable"), &inner));

  let mut ctx = common::context_at(main, 95);
  let found = lookup_identifier(&Name::new("x"), &mut ctx);
  assert_eq!(found.len(), 1);
  assert!(Arc::ptr_eq(found[0].definition().expect("a variable"), &outer));
}

#[test]
fn local_declared_after_caret_is_invisible() {
  let later = common::variable("y", common::int(), 60);
  let main = common::function_with_body("main", 10, 100, vec![common::local(later)]);
  let module = common::module("app");
  module.scope().add(main.clone());

  let mut ctx = common::context_at(main, 30);
  assert!(lookup_identifier(&Name::new("y"), &mut ctx).is_empty());
}

#[test]
fn self_referential_alias_is_unknown() {
  let module = common::module("app");
  module.scope().add(ASTDeclaration::alias("A", ASTType::identifier("A"), Span::new(0, 12)));

  let mut ctx = common::context(module);
  let resolved = resolve_type(&ASTType::identifier("A"), &mut ctx);
  assert!(strip_aliases(&resolved).is_unknown());
  assert_eq!(ctx.depth(), 0);
}

#[test]
fn alias_chain_reaches_terminal() {
  let module = common::module("app");
  module.scope().add(ASTDeclaration::alias("A", ASTType::identifier("B"), Span::new(0, 12)));
  module.scope().add(ASTDeclaration::alias("B", ASTType::identifier("size_t"), Span::new(14, 30)));

  let mut ctx = common::context(module);
  let resolved = resolve_type(&ASTType::identifier("A"), &mut ctx);
  assert_eq!(strip_aliases(&resolved), SemanticResult::primitive(PrimitiveKind::ULong));
}

#[test]
fn imports_expose_public_members_only() {
  let library = common::module("lib.math");
  library.scope().add(common::function("square", 0, vec![("v", common::int())], common::int()));
  library.scope().add(ASTDeclaration::new(
    "scratch",
    Span::new(20, 30),
    ASTDeclarationKind::Variable(ASTVariable {
      ty: Some(common::int()),
      initializer: None,
      is_alias: false,
      is_variadic: false,
    }),
    DeclAttributes::PRIVATE,
  ));
  let app = common::module_importing("app", &["lib.math"]);
  let cache = common::cache_of(&[&library, &app]);

  let mut ctx = common::context_in(app, cache);
  let call = ASTExpression::call(ASTExpression::identifier("square"), vec![ASTExpression::int(3)]);
  assert_eq!(evaluate_type(&call, &mut ctx), SemanticResult::primitive(PrimitiveKind::Int));
  assert!(lookup_identifier(&Name::new("scratch"), &mut ctx).is_empty());
}

#[test]
fn unimported_module_is_reachable_through_its_package() {
  let library = common::module("lib.math");
  library.scope().add(common::function("square", 0, vec![("v", common::int())], common::int()));
  let app = common::module("app");
  let cache = common::cache_of(&[&library, &app]);

  let mut ctx = common::context_in(app, cache);
  assert!(evaluate_type(&ASTExpression::identifier("square"), &mut ctx).is_unknown());

  let qualified = ASTExpression::member(ASTExpression::member(ASTExpression::identifier("lib"), "math"), "square");
  let found = evaluate_type(&qualified, &mut ctx);
  assert_eq!(found.definition().map(|d| d.qualified_name()), Some("lib.math.square".to_string()));
}
